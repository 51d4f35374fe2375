//! Record-set chunking.
//!
//! Splits a loaded record set into retrievable chunks: `unit_size` records
//! per chunk, consecutive chunks sharing `overlap` records. The default
//! (one record per chunk, no overlap) keeps chunk content identical to
//! record content, which downstream identifier verification depends on.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, ChunkerConfig, Record};

/// Splits record sets into chunks according to a validated configuration.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> DomainResult<Self> {
        config.validate().map_err(DomainError::Configuration)?;
        Ok(Self { config })
    }

    /// Lazily yield chunks over `records`.
    ///
    /// The returned iterator borrows the record slice; calling `split` again
    /// restarts the sequence. An empty record set yields nothing.
    pub fn split<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = Chunk> + 'a {
        let step = self.config.unit_size - self.config.overlap;

        (0..)
            .map(move |window| (window, window * step))
            .take_while(move |(_, start)| *start < records.len())
            .map(move |(window, start)| {
                let end = (start + self.config.unit_size).min(records.len());
                let slice = &records[start..end];

                let content = slice
                    .iter()
                    .map(|r| r.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");

                Chunk::new(slice[0].id.clone(), content, window)
            })
    }
}
