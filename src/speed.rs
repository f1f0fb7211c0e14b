//! Throughput and ETA estimation.
//!
//! `courier speed` turns the last-modified timestamps of completed
//! artifacts into a short-window rate and a lifetime rate, then
//! projects remaining time from the current queue depth and the
//! configured items-per-message fan-out. The estimate is computed as a
//! pure function over a timestamp set so the rate math is testable
//! without any backend.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::s3::{listing_prefix, S3Client};
use crate::sqs::{QueueLookup, SqsClient};

/// Rates and projection derived from one timestamp snapshot.
#[derive(Debug, Clone)]
pub struct SpeedReport {
    pub total: usize,
    pub window_minutes: u32,
    pub window_count: usize,
    pub rate_per_sec: f64,
    pub rate_per_min: f64,
    pub rate_per_hour: f64,
    pub avg_per_sec: f64,
    pub avg_per_hour: f64,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub pending_items: u64,
    /// `None` when no rate or no backlog — never a misleading zero.
    pub eta_seconds: Option<f64>,
}

/// Estimate throughput from completed-artifact timestamps.
///
/// Returns `None` when no artifacts exist — there is nothing to divide.
/// Duplicate timestamps are allowed; ordering of the input does not
/// matter.
pub fn estimate(
    timestamps: &[DateTime<Utc>],
    now: DateTime<Utc>,
    window_minutes: u32,
    queue_total_messages: u64,
    items_per_message: u64,
) -> Option<SpeedReport> {
    if timestamps.is_empty() {
        return None;
    }

    let mut sorted = timestamps.to_vec();
    sorted.sort();
    let total = sorted.len();
    let first = sorted[0];
    let last = sorted[total - 1];

    let window_start = now - Duration::minutes(i64::from(window_minutes));
    let window_count = sorted.iter().filter(|t| **t >= window_start).count();

    let window_seconds = (u64::from(window_minutes) * 60).max(1) as f64;
    let rate_per_sec = window_count as f64 / window_seconds;

    // Lifetime rate over the observed span, floored at one second so a
    // single artifact (or identical timestamps) cannot divide by zero.
    let elapsed_seconds = ((last - first).num_milliseconds() as f64 / 1000.0).max(1.0);
    let avg_per_sec = total as f64 / elapsed_seconds;

    let pending_items = queue_total_messages * items_per_message.max(1);
    let eta_seconds = if rate_per_sec > 0.0 && pending_items > 0 {
        Some(pending_items as f64 / rate_per_sec)
    } else {
        None
    };

    Some(SpeedReport {
        total,
        window_minutes,
        window_count,
        rate_per_sec,
        rate_per_min: rate_per_sec * 60.0,
        rate_per_hour: rate_per_sec * 3600.0,
        avg_per_sec,
        avg_per_hour: avg_per_sec * 3600.0,
        first,
        last,
        pending_items,
        eta_seconds,
    })
}

pub async fn run_speed(config: &Config, window_override: Option<u32>) -> Result<()> {
    let window_minutes = match window_override {
        Some(0) => anyhow::bail!("--window must be > 0"),
        Some(minutes) => minutes,
        None => config.monitor.window_minutes,
    };

    let s3 = S3Client::new(
        &config.storage.bucket,
        &config.aws.region,
        config.aws.endpoint_url.as_deref(),
    )?;
    let sqs = SqsClient::new(&config.aws.region, config.aws.endpoint_url.as_deref())?;

    let prefix = listing_prefix(&config.storage.output_prefix);
    let timestamps: Vec<DateTime<Utc>> = s3
        .list_objects(&prefix)
        .await?
        .into_iter()
        .filter(|o| o.key.ends_with(&config.storage.archive_suffix))
        .map(|o| o.last_modified)
        .collect();

    // Queue depth is advisory here; a failed read just means no backlog
    // estimate, so it degrades to zero instead of failing the report.
    let queue_total = queue_total_messages(&sqs, &config.queue.name).await;

    let report = match estimate(
        &timestamps,
        Utc::now(),
        window_minutes,
        queue_total,
        config.queue.items_per_message,
    ) {
        Some(report) => report,
        None => {
            println!("No completed artifacts found.");
            return Ok(());
        }
    };

    println!("Total processed items: {}", report.total);
    println!(
        "Current window ({}m): {} items -> {:.4} items/sec, {:.3} items/min, {:.3} items/hour",
        report.window_minutes,
        report.window_count,
        report.rate_per_sec,
        report.rate_per_min,
        report.rate_per_hour
    );
    println!(
        "Average since first item: {:.4} items/sec, {:.3} items/hour (first={} last={})",
        report.avg_per_sec,
        report.avg_per_hour,
        report.first.to_rfc3339(),
        report.last.to_rfc3339()
    );

    match report.eta_seconds {
        Some(eta) => {
            println!(
                "Estimated time to finish remaining {} items (from {} messages): {:.2} hours",
                report.pending_items,
                queue_total,
                eta / 3600.0
            );
        }
        None => {
            println!("Estimated time to finish: N/A (no current processing or no backlog)");
        }
    }

    Ok(())
}

/// Total queue messages in any state, or zero when the queue cannot be
/// read.
async fn queue_total_messages(sqs: &SqsClient, queue_name: &str) -> u64 {
    let url = match sqs.get_queue_url(queue_name).await {
        Ok(QueueLookup::Found(url)) => url,
        Ok(QueueLookup::Missing) | Err(_) => return 0,
    };
    match sqs.queue_attributes(&url).await {
        Ok(depth) => depth.total(),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    #[test]
    fn lifetime_rate_over_observed_span() {
        // 4 items spanning 30 seconds.
        let stamps = vec![ts(0), ts(10), ts(20), ts(30)];
        let now = ts(30);
        let report = estimate(&stamps, now, 60, 0, 10).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.window_count, 4);
        assert!((report.avg_per_sec - 4.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn narrowed_window_excludes_older_timestamps() {
        let stamps = vec![ts(0), ts(10), ts(20), ts(30)];
        // "now" placed so the first timestamp falls outside a one-minute
        // window and the other three stay inside it.
        let now = ts(65);
        let report = estimate(&stamps, now, 1, 0, 10).unwrap();
        assert_eq!(report.window_count, 3);
        assert!((report.rate_per_sec - 3.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let stamps = vec![ts(30), ts(0), ts(20), ts(10)];
        let report = estimate(&stamps, ts(30), 60, 0, 10).unwrap();
        assert_eq!(report.first, ts(0));
        assert_eq!(report.last, ts(30));
    }

    #[test]
    fn no_artifacts_means_no_report() {
        assert!(estimate(&[], ts(0), 60, 100, 10).is_none());
    }

    #[test]
    fn single_timestamp_clamps_elapsed_to_one_second() {
        let report = estimate(&[ts(0)], ts(0), 60, 0, 10).unwrap();
        assert!((report.avg_per_sec - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pending_items_from_queue_depth_and_fanout() {
        // visible=5, in-flight=3, delayed=2 → 10 messages × 10 items.
        let report = estimate(&[ts(0)], ts(0), 60, 10, 10).unwrap();
        assert_eq!(report.pending_items, 100);
    }

    #[test]
    fn zero_rate_with_backlog_has_no_eta() {
        // All timestamps far outside the window: window rate is zero.
        let stamps = vec![ts(0), ts(10)];
        let now = ts(7200);
        let report = estimate(&stamps, now, 1, 50, 10).unwrap();
        assert_eq!(report.window_count, 0);
        assert_eq!(report.rate_per_sec, 0.0);
        assert_eq!(report.pending_items, 500);
        assert!(report.eta_seconds.is_none());
    }

    #[test]
    fn no_backlog_has_no_eta() {
        let stamps = vec![ts(0), ts(10)];
        let report = estimate(&stamps, ts(10), 60, 0, 10).unwrap();
        assert!(report.rate_per_sec > 0.0);
        assert!(report.eta_seconds.is_none());
    }

    #[test]
    fn eta_is_pending_over_rate() {
        let stamps = vec![ts(0), ts(10), ts(20), ts(30)];
        let now = ts(30);
        let report = estimate(&stamps, now, 1, 6, 10).unwrap();
        // 4 items in a 60s window; 60 pending items.
        let expected = 60.0 / (4.0 / 60.0);
        assert!((report.eta_seconds.unwrap() - expected).abs() < 1e-6);
    }
}
