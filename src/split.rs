//! Seed CSV splitter.
//!
//! Streams a seed CSV into batch files of at most `batch_size` data rows
//! each, named with the next allocated indices. Batch files are opened
//! lazily on the first row they receive, so an input with a header and
//! no data rows produces zero batch files rather than an empty one, and
//! every batch that was opened is closed complete (header plus whole
//! rows) before the next one starts. A failure partway through a later
//! batch never invalidates earlier, already-closed batches.
//!
//! ## Field normalization
//!
//! Downstream workers expect three canonical columns: `parcel_id`,
//! `url`, and `multiValueQueryString`. When the input header lacks one,
//! it is appended to the batch header and filled per row from the first
//! present legacy alias, else left empty:
//!
//! | Canonical | Aliases (in order) |
//! |-----------|--------------------|
//! | `parcel_id` | `parcelId`, `id` |
//! | `url` | `base_url`, `link` |
//! | `multiValueQueryString` | `query`, `params` |
//!
//! An input that uses some other alias gets a silently empty canonical
//! field. That is long-standing pipeline behavior, preserved as-is.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::Path;

use crate::allocator::batch_file_name;
use crate::models::BatchFile;

/// Canonical columns and their legacy aliases, tried in order.
const CANONICAL_FIELDS: &[(&str, &[&str])] = &[
    ("parcel_id", &["parcelId", "id"]),
    ("url", &["base_url", "link"]),
    ("multiValueQueryString", &["query", "params"]),
];

/// Split `seed_csv` into batch files under `batch_dir`, numbering from
/// `start_index`. Returns the created batch files in creation order.
pub fn split_seed_csv(
    seed_csv: &Path,
    batch_dir: &Path,
    batch_size: usize,
    start_index: u32,
) -> Result<Vec<BatchFile>> {
    std::fs::create_dir_all(batch_dir)
        .with_context(|| format!("Failed to create batch dir: {}", batch_dir.display()))?;

    let mut reader = csv::Reader::from_path(seed_csv)
        .with_context(|| format!("Failed to open seed CSV: {}", seed_csv.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| "Failed to read CSV header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        bail!("No headers found in seed CSV: {}", seed_csv.display());
    }

    // Column positions for canonical fields missing from the input
    // header: each resolves per row to the first present alias.
    let mut out_headers = headers.clone();
    let mut appended: Vec<Option<usize>> = Vec::new();
    for (canonical, aliases) in CANONICAL_FIELDS {
        if headers.iter().any(|h| h == canonical) {
            continue;
        }
        out_headers.push(canonical.to_string());
        appended.push(
            aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h == alias)),
        );
    }

    let mut created: Vec<BatchFile> = Vec::new();
    let mut batch_idx = start_index;
    let mut rows_in_batch = 0usize;
    let mut writer: Option<csv::Writer<File>> = None;

    for record in reader.records() {
        let record = record.with_context(|| "Failed to read seed CSV row")?;

        if writer.is_none() || rows_in_batch >= batch_size {
            // Close the previous batch (if open) before the next opens,
            // so it is complete on disk regardless of what happens later.
            if let Some(mut w) = writer.take() {
                w.flush().with_context(|| "Failed to flush batch file")?;
            }
            let path = batch_dir.join(batch_file_name(batch_idx));
            let mut w = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to create batch file: {}", path.display()))?;
            w.write_record(&out_headers)
                .with_context(|| format!("Failed to write header: {}", path.display()))?;
            created.push(BatchFile {
                index: batch_idx,
                path,
            });
            batch_idx += 1;
            rows_in_batch = 0;
            writer = Some(w);
        }

        let mut row: Vec<&str> = record.iter().collect();
        for alias_pos in &appended {
            row.push(alias_pos.and_then(|i| record.get(i)).unwrap_or(""));
        }

        let w = writer.as_mut().unwrap();
        w.write_record(&row)
            .with_context(|| "Failed to write batch row")?;
        rows_in_batch += 1;
    }

    if let Some(mut w) = writer.take() {
        w.flush().with_context(|| "Failed to flush batch file")?;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::next_batch_index;
    use std::fs;
    use tempfile::TempDir;

    fn write_seed(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("seed.csv");
        fs::write(&path, content).unwrap();
        path
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let mut rows = vec![reader
            .headers()
            .unwrap()
            .iter()
            .map(String::from)
            .collect::<Vec<_>>()];
        for rec in reader.records() {
            rows.push(rec.unwrap().iter().map(String::from).collect());
        }
        rows
    }

    #[test]
    fn splits_into_ceil_n_over_s_batches() {
        let tmp = TempDir::new().unwrap();
        let mut content = String::from("parcel_id,url,multiValueQueryString\n");
        for i in 0..7 {
            content.push_str(&format!("p{},https://x/{},q{}\n", i, i, i));
        }
        let seed = write_seed(tmp.path(), &content);
        let batch_dir = tmp.path().join("batches");

        let created = split_seed_csv(&seed, &batch_dir, 3, 1).unwrap();
        assert_eq!(created.len(), 3); // ceil(7/3)

        let sizes: Vec<usize> = created
            .iter()
            .map(|b| read_rows(&b.path).len() - 1)
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        // Order preserved across batches: batch order, then row order.
        let mut seen = Vec::new();
        for b in &created {
            for row in read_rows(&b.path).into_iter().skip(1) {
                seen.push(row[0].clone());
            }
        }
        let expected: Vec<String> = (0..7).map(|i| format!("p{}", i)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn canonical_header_passes_through_unchanged() {
        let tmp = TempDir::new().unwrap();
        let seed = write_seed(
            tmp.path(),
            "parcel_id,url,multiValueQueryString\na,https://x,b\n",
        );
        let created = split_seed_csv(&seed, &tmp.path().join("b"), 10, 1).unwrap();
        let rows = read_rows(&created[0].path);
        assert_eq!(rows[0], vec!["parcel_id", "url", "multiValueQueryString"]);
        assert_eq!(rows[1], vec!["a", "https://x", "b"]);
    }

    #[test]
    fn legacy_aliases_fill_appended_canonical_columns() {
        let tmp = TempDir::new().unwrap();
        let seed = write_seed(
            tmp.path(),
            "parcelId,link,params\nP-9,https://example/9,size=large\n",
        );
        let created = split_seed_csv(&seed, &tmp.path().join("b"), 10, 1).unwrap();
        let rows = read_rows(&created[0].path);
        assert_eq!(
            rows[0],
            vec![
                "parcelId",
                "link",
                "params",
                "parcel_id",
                "url",
                "multiValueQueryString"
            ]
        );
        assert_eq!(
            rows[1],
            vec![
                "P-9",
                "https://example/9",
                "size=large",
                "P-9",
                "https://example/9",
                "size=large"
            ]
        );
    }

    #[test]
    fn alias_order_prefers_first_listed() {
        // Both parcelId and id present: parcelId wins.
        let tmp = TempDir::new().unwrap();
        let seed = write_seed(tmp.path(), "parcelId,id\nfrom-parcelId,from-id\n");
        let created = split_seed_csv(&seed, &tmp.path().join("b"), 10, 1).unwrap();
        let rows = read_rows(&created[0].path);
        assert_eq!(rows[1][2], "from-parcelId");
        // No alias for url at all: silently empty.
        assert_eq!(rows[1][3], "");
    }

    #[test]
    fn header_only_input_creates_no_batch_files() {
        let tmp = TempDir::new().unwrap();
        let seed = write_seed(tmp.path(), "parcel_id,url,multiValueQueryString\n");
        let batch_dir = tmp.path().join("b");
        let created = split_seed_csv(&seed, &batch_dir, 10, 1).unwrap();
        assert!(created.is_empty());
        assert_eq!(fs::read_dir(&batch_dir).unwrap().count(), 0);
    }

    #[test]
    fn empty_file_is_a_header_error_with_no_files() {
        let tmp = TempDir::new().unwrap();
        let seed = write_seed(tmp.path(), "");
        let batch_dir = tmp.path().join("b");
        assert!(split_seed_csv(&seed, &batch_dir, 10, 1).is_err());
        assert_eq!(fs::read_dir(&batch_dir).unwrap().count(), 0);
    }

    #[test]
    fn missing_seed_file_errors() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.csv");
        assert!(split_seed_csv(&missing, &tmp.path().join("b"), 10, 1).is_err());
    }

    #[test]
    fn rerun_never_reuses_batch_filenames() {
        let tmp = TempDir::new().unwrap();
        let seed = write_seed(tmp.path(), "parcel_id,url,multiValueQueryString\na,u,q\nb,u,q\n");
        let batch_dir = tmp.path().join("b");

        let first = split_seed_csv(&seed, &batch_dir, 1, 1).unwrap();
        let start = next_batch_index(&batch_dir).unwrap();
        let second = split_seed_csv(&seed, &batch_dir, 1, start).unwrap();

        let first_names: Vec<_> = first.iter().map(|b| b.path.clone()).collect();
        for b in &second {
            assert!(!first_names.contains(&b.path));
        }
        assert_eq!(fs::read_dir(&batch_dir).unwrap().count(), 4);
    }

    #[test]
    fn quoted_fields_survive_the_split() {
        let tmp = TempDir::new().unwrap();
        let seed = write_seed(
            tmp.path(),
            "parcel_id,url,multiValueQueryString\n\"a,b\",https://x,\"k=1,k=2\"\n",
        );
        let created = split_seed_csv(&seed, &tmp.path().join("b"), 10, 1).unwrap();
        let rows = read_rows(&created[0].path);
        assert_eq!(rows[1], vec!["a,b", "https://x", "k=1,k=2"]);
    }
}
