//! Batch files: one `product_name,interface_name` pair per line.

use crate::error::{Result, SnapshotError};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub product_name: String,
    pub interface_name: String,
    /// 1-based line number in the batch file.
    pub line: usize,
}

/// Parse batch file text. Blank lines and `#` comments are ignored; lines without a comma or
/// with an empty side are skipped with a warning.
#[must_use]
pub fn parse_batch(text: &str) -> Vec<BatchEntry> {
    let mut entries = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((product, interface)) = trimmed.split_once(',') else {
            tracing::warn!(line, content = %trimmed, "missing ',' separator; skipping");
            continue;
        };
        let (product, interface) = (product.trim(), interface.trim());
        if product.is_empty() || interface.is_empty() {
            tracing::warn!(line, content = %trimmed, "empty product or interface; skipping");
            continue;
        }

        entries.push(BatchEntry {
            product_name: product.to_string(),
            interface_name: interface.to_string(),
            line,
        });
    }
    entries
}

/// Read and parse a batch file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no valid entries.
pub fn read_batch_file(path: &Path) -> Result<Vec<BatchEntry>> {
    let text = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
    let entries = parse_batch(&text);
    if entries.is_empty() {
        return Err(SnapshotError::EmptyBatch {
            path: path.to_path_buf(),
        });
    }
    Ok(entries)
}
