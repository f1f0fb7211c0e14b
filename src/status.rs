//! Progress snapshot from durable side effects.
//!
//! `courier status` reconstructs where the system is without any
//! coordination channel: it counts completed artifacts under the output
//! prefix, pulls down the downstream error log, and polls the queue
//! depth. Each of the three measurements is independent and
//! best-effort — a failed one is reported inline and never blocks the
//! others. Partial success is the normal case, not a failure path.

use anyhow::Result;

use crate::config::Config;
use crate::s3::{listing_prefix, S3Client};
use crate::sqs::{QueueLookup, SqsClient};

pub async fn run_status(config: &Config) -> Result<()> {
    let s3 = S3Client::new(
        &config.storage.bucket,
        &config.aws.region,
        config.aws.endpoint_url.as_deref(),
    )?;
    let sqs = SqsClient::new(&config.aws.region, config.aws.endpoint_url.as_deref())?;

    // Completed artifacts under the output prefix.
    let prefix = listing_prefix(&config.storage.output_prefix);
    match s3.list_objects(&prefix).await {
        Ok(objects) => {
            let archives = objects
                .iter()
                .filter(|o| o.key.ends_with(&config.storage.archive_suffix))
                .count();
            println!(
                "Processed archives under s3://{}/{}: {}",
                config.storage.bucket, config.storage.output_prefix, archives
            );
        }
        Err(e) => {
            println!(
                "Could not list s3://{}/{}: {:#}",
                config.storage.bucket, config.storage.output_prefix, e
            );
        }
    }

    // Error log, fetched best-effort. Absence is a status, not a failure.
    match s3
        .get_object(&config.storage.errors_key, &config.storage.errors_download_to)
        .await
    {
        Ok(()) => {
            let text = error_log_text(&config.storage.errors_download_to);
            println!(
                "Downloaded errors CSV to {} with {} error row(s)",
                config.storage.errors_download_to.display(),
                count_error_rows(&text)
            );
        }
        Err(_) => {
            println!(
                "Error log not found at s3://{}/{}",
                config.storage.bucket, config.storage.errors_key
            );
        }
    }

    // Queue depth, read best-effort.
    match queue_depth(&sqs, &config.queue.name).await {
        Ok(depth) => {
            println!(
                "SQS queue {}: visible={}, in-flight={}, delayed={}, total_pending~={}",
                config.queue.name,
                depth.visible,
                depth.not_visible,
                depth.delayed,
                depth.total()
            );
        }
        Err(e) => {
            println!("Could not read SQS queue {}: {:#}", config.queue.name, e);
        }
    }

    Ok(())
}

async fn queue_depth(sqs: &SqsClient, queue_name: &str) -> Result<crate::models::QueueDepth> {
    match sqs.get_queue_url(queue_name).await? {
        QueueLookup::Found(url) => sqs.queue_attributes(&url).await,
        QueueLookup::Missing => anyhow::bail!("queue does not exist"),
    }
}

/// Data rows in the error log: line count minus one header line when
/// any content exists, zero for an empty log.
pub fn count_error_rows(text: &str) -> usize {
    let lines = text.lines().count();
    lines.saturating_sub(1)
}

/// Read a downloaded error log, replacing invalid UTF-8 rather than
/// discarding the file — a log with encoding noise still has countable
/// lines.
pub fn error_log_text(path: &std::path::Path) -> String {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
