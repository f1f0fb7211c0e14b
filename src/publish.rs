//! Split-push orchestration.
//!
//! Coordinates the full pipeline for one run: resolve the starting
//! batch index, split the seed CSV, provision the bucket and queue,
//! then upload each batch and announce it on the queue.
//!
//! Upload and announce are independent per-batch operations: a failed
//! upload skips that batch's notification and moves on, and a failed
//! notification after a successful upload leaves the batch in an
//! uploaded-but-not-announced state that is reported, not retried or
//! rolled back. Nothing already uploaded is ever deleted or mutated.

use anyhow::{bail, Result};
use std::path::Path;

use crate::allocator::{batch_file_name, resolve_start_index};
use crate::config::Config;
use crate::models::{BatchFile, BatchNotification, BatchOutcome};
use crate::s3::{object_key, S3Client};
use crate::split::split_seed_csv;
use crate::sqs::{QueueLookup, SqsClient};

pub async fn run_split_push(
    config: &Config,
    seed_csv: &Path,
    size_override: Option<usize>,
    start_override: Option<u32>,
    local_only: bool,
) -> Result<()> {
    if !seed_csv.exists() {
        println!("File not found: {}", seed_csv.display());
        return Ok(());
    }

    let batch_size = match size_override {
        Some(0) => bail!("--size must be > 0"),
        Some(size) => size,
        None => config.batch.size,
    };
    let start_index = resolve_start_index(&config.batch.dir, start_override)?;

    println!(
        "Splitting {} into batches of {} rows starting at index {}...",
        seed_csv.display(),
        batch_size,
        start_index
    );
    let created = split_seed_csv(seed_csv, &config.batch.dir, batch_size, start_index)?;
    println!(
        "Created {} batch file(s) under {}",
        created.len(),
        config.batch.dir.display()
    );

    if local_only {
        println!("Local-only run: skipping upload and queue notifications.");
        println!("ok");
        return Ok(());
    }

    let s3 = S3Client::new(
        &config.storage.bucket,
        &config.aws.region,
        config.aws.endpoint_url.as_deref(),
    )?;
    let sqs = SqsClient::new(&config.aws.region, config.aws.endpoint_url.as_deref())?;

    // Provisioning failures are fatal: pushing into a bucket or queue
    // of unknown state would leave batches unaccounted for.
    if s3.bucket_exists().await? {
        println!("S3 bucket exists: {}", config.storage.bucket);
    } else {
        println!("Creating S3 bucket: {}", config.storage.bucket);
        s3.create_bucket().await?;
    }

    let queue_url = match sqs.get_queue_url(&config.queue.name).await? {
        QueueLookup::Found(url) => {
            println!("SQS queue exists: {}", url);
            url
        }
        QueueLookup::Missing => {
            println!("Creating SQS queue: {}", config.queue.name);
            sqs.create_queue(&config.queue.name).await?
        }
    };

    let outcomes = push_batches(&s3, &sqs, &queue_url, &config.storage.prefix, &created).await;

    let announced = outcomes
        .iter()
        .filter(|o| matches!(o, BatchOutcome::Announced { .. }))
        .count();
    println!(
        "Done. Uploaded & queued {}/{} batch file(s).",
        announced,
        created.len()
    );
    for outcome in &outcomes {
        match outcome {
            BatchOutcome::Announced { .. } => {}
            BatchOutcome::UploadFailed { key, error } => {
                println!("Not uploaded: s3://{}/{}: {}", config.storage.bucket, key, error);
            }
            BatchOutcome::AnnounceFailed { key, error } => {
                println!(
                    "Uploaded but not announced (re-announce manually): s3://{}/{}: {}",
                    config.storage.bucket, key, error
                );
            }
        }
    }

    Ok(())
}

/// Upload each batch under `prefix/filename` and send one notification
/// per successful upload, in creation order. Per-batch failures never
/// block later batches.
async fn push_batches(
    s3: &S3Client,
    sqs: &SqsClient,
    queue_url: &str,
    prefix: &str,
    batches: &[BatchFile],
) -> Vec<BatchOutcome> {
    let mut outcomes = Vec::with_capacity(batches.len());

    for batch in batches {
        let file_name = batch_file_name(batch.index);
        let key = object_key(prefix, &file_name);

        if let Err(e) = s3.put_object(&batch.path, &key).await {
            eprintln!("Warning: upload failed for {}: {:#}", file_name, e);
            outcomes.push(BatchOutcome::UploadFailed {
                key,
                error: format!("{:#}", e),
            });
            continue;
        }
        println!("Uploaded {} to s3://{}/{}", file_name, s3.bucket(), key);

        let notification = BatchNotification {
            s3_key: key.clone(),
            bucket: s3.bucket().to_string(),
        };
        let body = match serde_json::to_string(&notification) {
            Ok(body) => body,
            Err(e) => {
                eprintln!("Warning: failed to encode notification for {}: {}", key, e);
                outcomes.push(BatchOutcome::AnnounceFailed {
                    key,
                    error: e.to_string(),
                });
                continue;
            }
        };

        match sqs.send_message(queue_url, &body).await {
            Ok(()) => {
                println!("Sent SQS message for: {}", key);
                outcomes.push(BatchOutcome::Announced { key });
            }
            Err(e) => {
                eprintln!("Warning: failed to send message for {}: {:#}", key, e);
                outcomes.push(BatchOutcome::AnnounceFailed {
                    key,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    outcomes
}
