//! Embedding backends.

mod bert;
mod hashed;

pub use bert::BertEmbedder;
pub use hashed::HashedEmbedder;

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::EmbeddingModel;
use crate::domain::ports::EmbeddingService;

/// Construct the embedding service for the configured model.
///
/// The returned handle is shared process-wide; both ingestion and query
/// embedding must go through the same instance.
pub fn build_embedder(
    model: EmbeddingModel,
    cache_dir: Option<PathBuf>,
) -> DomainResult<Arc<dyn EmbeddingService>> {
    match model {
        EmbeddingModel::Hashed => Ok(Arc::new(HashedEmbedder::new())),
        EmbeddingModel::MiniLm | EmbeddingModel::MpNet => {
            Ok(Arc::new(BertEmbedder::new(model, cache_dir)?))
        }
    }
}
