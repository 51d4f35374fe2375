//! Chunking domain models.
//!
//! A chunk is the atomic retrievable unit stored in a vector index. Chunks
//! are derived from records at ingestion time and never mutated; a rebuild
//! of the index is the only way to replace them.

use serde::{Deserialize, Serialize};

/// Configuration for splitting a record set into chunks.
///
/// `unit_size` is a row (or page) count. The default of one record per chunk
/// with no overlap keeps identifier matching exact downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Number of records merged into one chunk.
    pub unit_size: usize,

    /// Number of records shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            unit_size: 1,
            overlap: 0,
        }
    }
}

impl ChunkerConfig {
    /// Validate the configuration.
    ///
    /// `unit_size` must be positive and `overlap` strictly smaller, or the
    /// window would never advance.
    pub fn validate(&self) -> Result<(), String> {
        if self.unit_size == 0 {
            return Err("unit_size must be greater than 0".to_string());
        }
        if self.overlap >= self.unit_size {
            return Err(format!(
                "overlap ({}) must be less than unit_size ({})",
                self.overlap, self.unit_size
            ));
        }
        Ok(())
    }
}

/// An atomic retrievable unit derived from one or more records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable deduplication key, `origin_id:position`.
    pub key: String,

    /// Text content of the chunk.
    pub content: String,

    /// Identifier of the first record in the chunk.
    pub origin_id: String,

    /// Zero-based window position within the source record set.
    pub position: usize,
}

impl Chunk {
    /// Create a chunk with its deterministic key.
    ///
    /// Re-ingesting identical input yields identical keys, which is what
    /// lets callers deduplicate with a key check before adding.
    pub fn new(origin_id: impl Into<String>, content: impl Into<String>, position: usize) -> Self {
        let origin_id = origin_id.into();
        let key = format!("{origin_id}:{position}");
        Self {
            key,
            content: content.into(),
            origin_id,
            position,
        }
    }
}
