//! # Seed Courier
//!
//! Splits a property seed dataset into bounded batches, pushes each
//! batch to S3, and announces it on SQS so independent downstream
//! workers can claim and process it. Companion monitoring commands
//! reconstruct system-wide progress purely from the durable side
//! effects the pipeline and the workers leave behind — stored
//! artifacts, an error log, and queue depth — with no coordination
//! channel of any kind.
//!
//! ## Architecture
//!
//! ```text
//! seed.csv ──▶ splitter ──▶ batches/seed_batch_NNNN.csv
//!                               │
//!                     upload ───┼─── announce
//!                        ▼      │       ▼
//!                   S3 bucket   │   SQS queue ──▶ downstream workers
//!                        ▲              ▲              │
//!                        │              │              ▼
//!                 status/speed ◀── listings, error log, queue depth
//! ```
//!
//! Batch numbering is resumable: the next index is derived by scanning
//! the batch directory, so repeated runs extend the sequence instead of
//! renumbering or overwriting. Upload and announce are deliberately
//! untransacted; a batch can end up uploaded but unannounced, and that
//! partial state is reported rather than retried.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`allocator`] | Resumable batch index allocation |
//! | [`split`] | Seed CSV splitting and field normalization |
//! | [`sigv4`] | AWS Signature V4 request signing |
//! | [`xml`] | Minimal XML extraction for AWS responses |
//! | [`s3`] | Object-storage client |
//! | [`sqs`] | Message-queue client |
//! | [`publish`] | Split-push orchestration |
//! | [`status`] | Progress snapshot |
//! | [`speed`] | Throughput and ETA estimation |

pub mod allocator;
pub mod config;
pub mod models;
pub mod publish;
pub mod s3;
pub mod sigv4;
pub mod speed;
pub mod split;
pub mod sqs;
pub mod status;
pub mod xml;
