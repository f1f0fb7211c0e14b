//! Core data types used throughout the pipeline.
//!
//! These types represent the batch artifacts, queue notifications, and
//! telemetry snapshots that flow between the splitter, the publisher,
//! and the monitoring commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Queue notification body referencing one uploaded batch.
///
/// Messages carry no batch content, only a pointer. Consumers must
/// tolerate duplicates — delivery is at-least-once.
#[derive(Debug, Clone, Serialize)]
pub struct BatchNotification {
    pub s3_key: String,
    pub bucket: String,
}

/// Point-in-time queue depth, broken into the three SQS counters.
///
/// All three are approximate and eventually consistent; never treat
/// them as exact counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDepth {
    pub visible: u64,
    pub not_visible: u64,
    pub delayed: u64,
}

impl QueueDepth {
    /// Total messages in any state.
    pub fn total(&self) -> u64 {
        self.visible + self.not_visible + self.delayed
    }
}

/// Metadata for a single listed object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Full object key (path within bucket).
    pub key: String,
    /// Last modification timestamp, normalized to UTC.
    pub last_modified: DateTime<Utc>,
}

/// Terminal state of one batch within a single `split-push` run.
///
/// Upload and announce are two independent durable operations with no
/// transaction around them, so a batch can legitimately end up uploaded
/// but not announced. That partial state is reported, not retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Uploaded and its notification sent.
    Announced { key: String },
    /// Put-object failed; no notification was attempted.
    UploadFailed { key: String, error: String },
    /// Uploaded, but the notification send failed. Orphaned until a
    /// human (or a separate reconciliation pass) re-announces it.
    AnnounceFailed { key: String, error: String },
}

/// A batch file created by the splitter, in creation order.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub index: u32,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_depth_total() {
        let depth = QueueDepth {
            visible: 5,
            not_visible: 3,
            delayed: 2,
        };
        assert_eq!(depth.total(), 10);
    }

    #[test]
    fn notification_serializes_to_pointer_only() {
        let n = BatchNotification {
            s3_key: "batches/seed_batch_0001.csv".to_string(),
            bucket: "uploads".to_string(),
        };
        let body = serde_json::to_string(&n).unwrap();
        assert_eq!(
            body,
            r#"{"s3_key":"batches/seed_batch_0001.csv","bucket":"uploads"}"#
        );
    }
}
