//! # Seed Courier CLI (`courier`)
//!
//! The `courier` binary drives the batch-ingestion pipeline and its
//! monitoring views.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `courier split-push --file seed.csv` | Split a seed CSV into batches, upload each to S3, announce each on SQS |
//! | `courier status` | Count processed artifacts, fetch the error log, show queue depth |
//! | `courier speed` | Estimate throughput and remaining time from artifact timestamps |
//!
//! ## Examples
//!
//! ```bash
//! # Split into batches of 500 rows and push
//! courier split-push --file seed.csv --config ./config/courier.toml
//!
//! # Split only, no upload or notifications
//! courier split-push --file seed.csv --local-only
//!
//! # Resume numbering explicitly at index 42
//! courier split-push --file seed.csv --start 42
//!
//! # Current progress and backlog
//! courier status
//!
//! # Throughput over the last 30 minutes
//! courier speed --window 30
//! ```
//!
//! AWS credentials come from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//! and optionally `AWS_SESSION_TOKEN`. Everything else is read from the
//! TOML config file; see `config/courier.example.toml`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use seed_courier::{config, publish, speed, status};

/// Seed Courier — split property seed data into batches, push them to
/// S3, and announce each batch on SQS.
#[derive(Parser)]
#[command(
    name = "courier",
    about = "Split property seed data into batches, push them to S3, and announce each batch on SQS",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/courier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Split a seed CSV into batch files and push each to S3 and SQS.
    ///
    /// Batch numbering resumes where the batch directory left off:
    /// existing `seed_batch_NNNN.csv` files are never renumbered or
    /// overwritten. A failed upload or notification for one batch is
    /// reported and never blocks the remaining batches.
    SplitPush {
        /// Path to the seed CSV file (must have a header row).
        #[arg(long)]
        file: PathBuf,

        /// Max data rows per batch (overrides `batch.size` from config).
        #[arg(long)]
        size: Option<usize>,

        /// Starting batch index (default: next available in the batch
        /// directory). Must be positive.
        #[arg(long)]
        start: Option<u32>,

        /// Split only — skip provisioning, uploads, and notifications.
        #[arg(long)]
        local_only: bool,
    },

    /// Show processing status: processed-artifact count, error log, and
    /// queue depth.
    ///
    /// All three measurements are best-effort and independent; a failed
    /// one is reported inline without hiding the others.
    Status,

    /// Estimate processing speed and time to completion.
    ///
    /// Rates come from completed-artifact timestamps in object storage;
    /// remaining work is projected from queue depth times the configured
    /// items-per-message factor.
    Speed {
        /// Window in minutes for the current-rate estimate (overrides
        /// `monitor.window_minutes` from config).
        #[arg(long)]
        window: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::SplitPush {
            file,
            size,
            start,
            local_only,
        } => {
            publish::run_split_push(&cfg, &file, size, start, local_only).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Speed { window } => {
            speed::run_speed(&cfg, window).await?;
        }
    }

    Ok(())
}
