//! Export-file ingest
//!
//! An export file is either a JSON array of play records or an object whose
//! array-valued fields each hold records (some exporters wrap the history in
//! a `{"history": [...]}` envelope). Multiple files and directories can be
//! ingested in one pass; directories are walked for `*.json`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::RawPlay;

/// Parse a single export document into raw play records.
pub fn parse_export(text: &str) -> Result<Vec<RawPlay>> {
    let value: Value = serde_json::from_str(text)?;

    let mut records = Vec::new();
    match value {
        Value::Array(items) => collect_records(items, &mut records),
        Value::Object(map) => {
            for (_, field) in map {
                if let Value::Array(items) = field {
                    collect_records(items, &mut records);
                }
            }
        }
        other => {
            return Err(Error::NotAnExport(format!(
                "expected a JSON array or object, got {}",
                json_kind(&other)
            )));
        }
    }

    Ok(records)
}

fn collect_records(items: Vec<Value>, out: &mut Vec<RawPlay>) {
    for item in items {
        // Non-object entries still count as plays with every field absent
        out.push(serde_json::from_value(item).unwrap_or_default());
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Load records from files and directories. Directories are walked
/// recursively for `.json` files. Errors if no records are found at all.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RawPlay>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| {
                    e.path()
                        .extension()
                        .map(|ext| ext == "json")
                        .unwrap_or(false)
                })
            {
                files.push(entry.into_path());
            }
        } else {
            files.push(path.to_path_buf());
        }
    }

    let mut records = Vec::new();
    for file in &files {
        let text = std::fs::read_to_string(file)?;
        match parse_export(&text) {
            Ok(mut found) => {
                debug!("Loaded {} record(s) from {}", found.len(), file.display());
                records.append(&mut found);
            }
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
            }
        }
    }

    if records.is_empty() {
        return Err(Error::NoRecords);
    }

    Ok(records)
}
