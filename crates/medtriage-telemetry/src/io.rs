//! JSONL I/O and atomic file operations

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::warn;

/// Append one record as a line, creating the file and its parent directory
pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Read every well-formed record. A missing file is empty; malformed lines
/// are skipped with a warning.
pub fn read_jsonl<T: for<'de> Deserialize<'de>>(path: &Path) -> std::io::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), line = lineno + 1, "skipping malformed record: {}", e),
        }
    }

    Ok(records)
}

/// Rewrite a JSONL file line by line. `edit` returns the replacement for a
/// line it changes; every other line is kept byte for byte, including lines
/// that do not parse. The file is only rewritten when something changed.
pub fn edit_jsonl<F>(path: &Path, mut edit: F) -> std::io::Result<usize>
where
    F: FnMut(&str) -> Option<String>,
{
    if !path.exists() {
        return Ok(0);
    }

    let content = std::fs::read_to_string(path)?;
    let mut buf = String::with_capacity(content.len());
    let mut changed = 0;

    for line in content.lines() {
        match edit(line) {
            Some(replacement) => {
                buf.push_str(&replacement);
                changed += 1;
            }
            None => buf.push_str(line),
        }
        buf.push('\n');
    }

    if changed > 0 {
        atomic_write(path, buf.as_bytes())?;
    }
    Ok(changed)
}

/// Write data atomically using temp file + rename
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(temp_path, path)?;
    Ok(())
}
