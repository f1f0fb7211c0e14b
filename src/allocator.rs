//! Resumable batch index allocation.
//!
//! The next batch index is derived from the batch directory itself: scan
//! for files matching `seed_batch_<NNNN>.csv`, parse the embedded
//! integer, and return one past the largest found. No counter file, no
//! database — the committed batch files *are* the sequence state, which
//! makes repeated runs resume numbering without renumbering or
//! overwriting earlier batches (including ones left behind by failed
//! runs).
//!
//! The scan-then-allocate step is not atomic against a second process
//! scanning the same directory. Single-writer operation per batch
//! directory is the caller's responsibility.

use anyhow::Result;
use std::path::Path;

const BATCH_PREFIX: &str = "seed_batch_";
const BATCH_SUFFIX: &str = ".csv";

/// Parse the batch index out of a filename, or `None` if the name does
/// not match `seed_batch_<digits>.csv`.
pub fn parse_batch_index(file_name: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(BATCH_PREFIX)?
        .strip_suffix(BATCH_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Format a batch filename for an index: `seed_batch_0042.csv`.
pub fn batch_file_name(index: u32) -> String {
    format!("{}{:04}{}", BATCH_PREFIX, index, BATCH_SUFFIX)
}

/// Next unused batch index for a directory: `max(existing) + 1`, or 1
/// when no batch file exists (including when the directory itself does
/// not exist yet). Unrelated files are ignored, never an error.
pub fn next_batch_index(batch_dir: &Path) -> Result<u32> {
    let entries = match std::fs::read_dir(batch_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(1),
        Err(e) => {
            return Err(anyhow::Error::from(e)
                .context(format!("Failed to scan batch dir: {}", batch_dir.display())))
        }
    };

    let mut max_index: Option<u32> = None;
    for entry in entries {
        let entry = entry?;
        if let Some(idx) = entry.file_name().to_str().and_then(parse_batch_index) {
            max_index = Some(max_index.map_or(idx, |m| m.max(idx)));
        }
    }

    Ok(max_index.map_or(1, |m| m + 1))
}

/// Resolve the starting index for a run: an explicit override wins when
/// present (validated to be positive), otherwise scan the directory.
pub fn resolve_start_index(batch_dir: &Path, override_start: Option<u32>) -> Result<u32> {
    match override_start {
        Some(0) => anyhow::bail!("--start must be a positive batch index"),
        Some(start) => Ok(start),
        None => next_batch_index(batch_dir),
    }
}
