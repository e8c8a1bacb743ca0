//! Lesson metadata — records and JSON ingestion.
//!
//! Lesson files are produced by the (external) spreadsheet conversion step.
//! Each `.json` file is either a map of chapter name to a list of records, or
//! a flat list of records. Records with unknown fields are accepted; missing
//! fields default to empty strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One lesson row from the source spreadsheet. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonRecord {
    pub chapter: String,
    pub lesson_title: String,
    pub content_summary: String,
    pub experiment_description: String,
}

/// Load lesson records from a `.json` file or a directory of them.
///
/// Directory entries are read in name order so batch runs are deterministic.
/// Unreadable or non-JSON files inside a directory are skipped with a warning;
/// a path that yields no records at all is an error.
pub fn load_lessons(path: &Path) -> Result<Vec<LessonRecord>, String> {
    let mut lessons = Vec::new();
    if path.is_dir() {
        let mut files: Vec<_> = std::fs::read_dir(path)
            .map_err(|e| format!("Failed to read lesson dir {}: {}", path.display(), e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        files.sort();
        for file in files {
            match load_lesson_file(&file) {
                Ok(mut records) => {
                    log::info!(
                        "[LESSON] {}: {} records",
                        file.display(),
                        records.len()
                    );
                    lessons.append(&mut records);
                }
                Err(e) => log::warn!("[LESSON] Skipping {}: {}", file.display(), e),
            }
        }
    } else {
        lessons = load_lesson_file(path)?;
    }

    if lessons.is_empty() {
        return Err(format!("No lesson records found in {}", path.display()));
    }
    Ok(lessons)
}

/// Parse one lesson file: `{chapter -> [records]}` or `[records]`.
pub fn load_lesson_file(path: &Path) -> Result<Vec<LessonRecord>, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))?;

    let groups: Vec<Value> = match value {
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        list @ Value::Array(_) => vec![list],
        _ => return Err(format!("{}: expected an object or array", path.display())),
    };

    let mut records = Vec::new();
    for group in groups {
        let Value::Array(items) = group else {
            continue;
        };
        for item in items {
            match serde_json::from_value::<LessonRecord>(item) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("[LESSON] Skipping malformed record: {}", e),
            }
        }
    }
    Ok(records)
}
