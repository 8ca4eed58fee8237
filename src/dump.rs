//! Readers for exported post dumps: JSON arrays, single JSON documents, NDJSON, and
//! zstd-compressed NDJSON. Every document found is handed to `on_value`.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zstd::stream::read::Decoder;

use crate::ndjson::NdjsonReader;
use crate::util::open_with_backoff;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpFormat {
    /// `.json`: one array of documents, or a single document.
    Json,
    /// `.jsonl` / `.ndjson` and anything unrecognised: one document per line.
    Ndjson,
    /// `.zst`: zstd-compressed NDJSON.
    ZstNdjson,
}

impl DumpFormat {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
            Some("zst") => DumpFormat::ZstNdjson,
            Some("json") => DumpFormat::Json,
            _ => DumpFormat::Ndjson,
        }
    }
}

/// Dump files under `path`: the file itself, or every regular file below a directory
/// (sorted, hidden files skipped).
pub fn dump_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", path.display()))?;
        let hidden = entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Read one dump file. Lines that are not valid JSON are skipped with a warning; the
/// number skipped is returned.
pub fn read_dump(path: &Path, read_buf_bytes: usize, mut on_value: impl FnMut(Value) -> Result<()>) -> Result<u64> {
    let mut skipped = 0u64;
    match DumpFormat::detect(path) {
        DumpFormat::Json => {
            let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(items)) => {
                    for v in items {
                        on_value(v)?;
                    }
                }
                Ok(v) => on_value(v)?,
                // some `.json` exports are really line-delimited
                Err(_) => {
                    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
                        match serde_json::from_str::<Value>(line) {
                            Ok(v) => on_value(v)?,
                            Err(_) => skipped += 1,
                        }
                    }
                }
            }
        }
        DumpFormat::Ndjson => {
            let mut rdr = NdjsonReader::open(path, read_buf_bytes).with_context(|| format!("open {}", path.display()))?;
            rdr.for_each_line(|line| {
                match serde_json::from_str::<Value>(line) {
                    Ok(v) => on_value(v)?,
                    Err(_) => skipped += 1,
                }
                Ok(())
            })?;
        }
        DumpFormat::ZstNdjson => {
            let file = open_with_backoff(path).with_context(|| format!("open {}", path.display()))?;
            let mut decoder = Decoder::new(file)?;
            decoder.window_log_max(31)?;
            let mut rdr = NdjsonReader::new(decoder, read_buf_bytes);
            rdr.for_each_line(|line| {
                match serde_json::from_str::<Value>(line) {
                    Ok(v) => on_value(v)?,
                    Err(_) => skipped += 1,
                }
                Ok(())
            })
            .with_context(|| format!("decode {}", path.display()))?;
        }
    }
    if skipped > 0 {
        tracing::warn!("{}: skipped {} malformed lines", path.display(), skipped);
    }
    Ok(skipped)
}
