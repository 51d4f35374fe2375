//! Offline index construction.
//!
//! Ingestion is a batch job that never runs on the request path: load the
//! source, chunk it, skip chunks whose keys are already stored, embed and
//! append the rest. Re-running over identical input is therefore a no-op.

use std::path::Path;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Chunk, ChunkerConfig, Record};
use crate::domain::ports::EmbeddingService;
use crate::infrastructure::index::VectorIndex;
use crate::services::chunker::Chunker;
use crate::services::loader;

/// Builds and populates the two vector indexes.
pub struct IngestService {
    embedder: Arc<dyn EmbeddingService>,
    chunker: Chunker,
}

impl IngestService {
    pub fn new(embedder: Arc<dyn EmbeddingService>, chunking: ChunkerConfig) -> DomainResult<Self> {
        Ok(Self {
            embedder,
            chunker: Chunker::new(chunking)?,
        })
    }

    /// Build (or extend) the checkup-records index from a JSON-Lines source.
    pub async fn build_records_index(
        &self,
        source: impl AsRef<Path>,
        persist: impl AsRef<Path>,
    ) -> DomainResult<VectorIndex> {
        let records = loader::load_records(source)?;
        self.build(persist, &records).await
    }

    /// Build (or extend) the disease-knowledge index from a text document.
    pub async fn build_knowledge_index(
        &self,
        source: impl AsRef<Path>,
        persist: impl AsRef<Path>,
    ) -> DomainResult<VectorIndex> {
        let records = loader::load_document(source)?;
        self.build(persist, &records).await
    }

    async fn build(&self, persist: impl AsRef<Path>, records: &[Record]) -> DomainResult<VectorIndex> {
        let index = VectorIndex::create(persist.as_ref(), Arc::clone(&self.embedder)).await?;

        let mut fresh: Vec<Chunk> = Vec::new();
        let mut skipped = 0usize;
        for chunk in self.chunker.split(records) {
            if index.contains_key(&chunk.key).await? {
                skipped += 1;
            } else {
                fresh.push(chunk);
            }
        }

        let added = index.add(&fresh).await?;
        tracing::info!(
            path = %persist.as_ref().display(),
            added,
            skipped,
            total = index.len().await?,
            "index build complete"
        );

        Ok(index)
    }
}
