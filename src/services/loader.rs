//! Source loading.
//!
//! Two source shapes feed the indexes: JSON-Lines files of tabular checkup
//! rows, and plain-text knowledge documents split into blank-line-separated
//! pages. Anything richer (CSV, spreadsheets, PDF extraction) is an external
//! loader's concern; it only has to produce one of these two shapes.

use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::record::{merge_fields, Record};

/// Load tabular checkup records from a JSON-Lines file.
///
/// Each line is one JSON object. The `patient_id` field becomes the record
/// identifier and the whole object is merged into the canonical
/// `key:value` content layout. Blank lines are skipped.
pub fn load_records(path: impl AsRef<Path>) -> DomainResult<Vec<Record>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            DomainError::NotFound(format!("record source {} does not exist", path.display()))
        }
        _ => DomainError::Storage(format!("failed to read {}: {e}", path.display())),
    })?;

    let mut records = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(line)
            .map_err(|e| {
                DomainError::Storage(format!(
                    "{}:{}: invalid record line: {e}",
                    path.display(),
                    line_no + 1
                ))
            })?;

        let id = fields
            .get("patient_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DomainError::Storage(format!(
                    "{}:{}: record line has no string 'patient_id' field",
                    path.display(),
                    line_no + 1
                ))
            })?
            .to_string();

        records.push(Record::new(id, merge_fields(&fields)));
    }

    tracing::info!(path = %path.display(), count = records.len(), "records loaded");
    Ok(records)
}

/// Load a plain-text knowledge document as one record per page.
///
/// Pages are blank-line-separated; page identifiers derive from the file
/// stem so re-ingestion of the same file produces the same ids.
pub fn load_document(path: impl AsRef<Path>) -> DomainResult<Vec<Record>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            DomainError::NotFound(format!("document source {} does not exist", path.display()))
        }
        _ => DomainError::Storage(format!("failed to read {}: {e}", path.display())),
    })?;

    let stem = path
        .file_stem()
        .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().to_string());

    let records: Vec<Record> = raw
        .split("\n\n")
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .enumerate()
        .map(|(i, page)| Record::new(format!("{stem}:page:{i}"), page.to_string()))
        .collect();

    tracing::info!(path = %path.display(), pages = records.len(), "document loaded");
    Ok(records)
}
