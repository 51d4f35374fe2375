//! Source records and user profiles.
//!
//! A [`Record`] is one row of the checkup history or one page of the disease
//! knowledge corpus, reduced to an identifier plus its merged free-text
//! content. Records are immutable once loaded; everything downstream
//! (chunking, embedding, retrieval) works on the merged content.

use serde::{Deserialize, Serialize};

/// Prefix every canonical record content starts with.
pub const ID_FIELD_PREFIX: &str = "patient_id:";

/// Width of the patient identifier in the canonical layout.
pub const ID_WIDTH: usize = 6;

/// Byte range of the identifier inside canonical merged content.
///
/// `lookup_by_id` verifies a retrieved neighbor by comparing this exact
/// substring against the requested identifier. The range is defined here,
/// next to [`merge_fields`], so the layout and the check cannot drift
/// independently.
pub const ID_RANGE: std::ops::Range<usize> = ID_FIELD_PREFIX.len()..ID_FIELD_PREFIX.len() + ID_WIDTH;

/// Canonical field order for checkup records.
///
/// Fields appear in this order in the merged content; unknown fields are
/// appended after them in sorted order.
pub const CANONICAL_FIELDS: [&str; 7] = [
    "patient_id",
    "gender",
    "age",
    "height",
    "weight",
    "medical_history",
    "symptoms",
];

/// A raw source row or document page, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier of the source row or page.
    pub id: String,

    /// Merged free-text content of the record.
    pub content: String,
}

impl Record {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Merge the fields of a tabular row into the canonical content layout.
///
/// Known fields come first in [`CANONICAL_FIELDS`] order, remaining fields
/// follow sorted by name. Every value is rendered as `key:value`, joined by
/// commas, so a record for patient `426815` always starts
/// `patient_id:426815,` and the identifier occupies [`ID_RANGE`].
pub fn merge_fields(fields: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(fields.len());

    for key in CANONICAL_FIELDS {
        if let Some(value) = fields.get(key) {
            parts.push(format!("{key}:{}", render_value(value)));
        }
    }

    let mut extra: Vec<&String> = fields
        .keys()
        .filter(|k| !CANONICAL_FIELDS.contains(&k.as_str()))
        .collect();
    extra.sort();
    for key in extra {
        parts.push(format!("{key}:{}", render_value(&fields[key])));
    }

    parts.join(",")
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// User profile submitted for a recommendation session.
///
/// Field validation (non-empty, non-zero) is the caller's responsibility;
/// the agent formats whatever it is given into the request prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub gender: String,
    pub age: u32,
    pub height: String,
    pub weight: String,
    pub medical_history: String,
    pub symptoms: String,
}

impl UserProfile {
    /// Render the profile fields (excluding the id) in the same
    /// comma-separated shape the records index stores, so profile probes
    /// and stored content live in the same text space.
    pub fn merged_description(&self) -> String {
        format!(
            "gender:{},age:{},height:{},weight:{},medical_history:{},symptoms:{}",
            self.gender, self.age, self.height, self.weight, self.medical_history, self.symptoms
        )
    }
}
