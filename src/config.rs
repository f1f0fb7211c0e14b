use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    /// Local directory where batch files are written (created if absent).
    #[serde(default = "default_batch_dir")]
    pub dir: PathBuf,
    /// Maximum data rows per batch file.
    #[serde(default = "default_batch_size")]
    pub size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            dir: default_batch_dir(),
            size: default_batch_size(),
        }
    }
}

fn default_batch_dir() -> PathBuf {
    PathBuf::from("./batches")
}
fn default_batch_size() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Bucket holding uploaded batches, processed outputs, and the error log.
    pub bucket: String,
    /// Key prefix for uploaded batch files. May be empty.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Key prefix under which downstream workers write completed artifacts.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Key of the error log written by downstream workers.
    #[serde(default = "default_errors_key")]
    pub errors_key: String,
    /// Local path the error log is downloaded to by `courier status`.
    #[serde(default = "default_errors_download_to")]
    pub errors_download_to: PathBuf,
    /// Suffix identifying one completed artifact in listings.
    #[serde(default = "default_archive_suffix")]
    pub archive_suffix: String,
}

fn default_prefix() -> String {
    "batches".to_string()
}
fn default_output_prefix() -> String {
    "output/html".to_string()
}
fn default_errors_key() -> String {
    "errors.csv".to_string()
}
fn default_errors_download_to() -> PathBuf {
    PathBuf::from("./errors.csv")
}
fn default_archive_suffix() -> String {
    ".zip".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub name: String,
    /// Work items represented by one queue message, used to convert
    /// queue depth into a pending-item estimate.
    #[serde(default = "default_items_per_message")]
    pub items_per_message: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            items_per_message: default_items_per_message(),
        }
    }
}

fn default_queue_name() -> String {
    "downloader-v2-batches".to_string()
}
fn default_items_per_message() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Window length in minutes for the current-rate estimate.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
        }
    }
}

fn default_window_minutes() -> u32 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.batch.size == 0 {
        anyhow::bail!("batch.size must be > 0");
    }

    if config.storage.bucket.is_empty() {
        anyhow::bail!("storage.bucket must not be empty");
    }

    if config.queue.name.is_empty() {
        anyhow::bail!("queue.name must not be empty");
    }

    if config.queue.items_per_message == 0 {
        anyhow::bail!("queue.items_per_message must be > 0");
    }

    if config.monitor.window_minutes == 0 {
        anyhow::bail!("monitor.window_minutes must be > 0");
    }

    Ok(config)
}
