//! Embedding model identity and search results.

use serde::{Deserialize, Serialize};

use super::chunking::Chunk;
use crate::domain::errors::{DomainError, DomainResult};

/// Embedding models supported by the recommender.
///
/// The model identity is part of a vector index's persisted schema: vectors
/// produced by different models are not comparable, so an index created with
/// one model refuses to load under another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingModel {
    /// all-MiniLM-L6-v2, 384 dimensions. Good default.
    MiniLm,

    /// all-mpnet-base-v2, 768 dimensions. Slower, higher quality.
    MpNet,

    /// Deterministic hash-based vectors, 256 dimensions. No model download,
    /// no network; used for offline development and the test suite.
    Hashed,
}

impl EmbeddingModel {
    /// Vector dimensions produced by this model.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::MiniLm => 384,
            Self::MpNet => 768,
            Self::Hashed => 256,
        }
    }

    /// Identity string persisted in the index schema.
    pub fn identity(&self) -> &'static str {
        match self {
            Self::MiniLm => "sentence-transformers/all-MiniLM-L6-v2",
            Self::MpNet => "sentence-transformers/all-mpnet-base-v2",
            Self::Hashed => "medirec/hashed-v1",
        }
    }

    /// Returns true when the model needs weights from HuggingFace Hub.
    pub fn requires_download(&self) -> bool {
        matches!(self, Self::MiniLm | Self::MpNet)
    }

    /// Parse a configuration value.
    pub fn parse(name: &str) -> DomainResult<Self> {
        match name {
            "minilm" => Ok(Self::MiniLm),
            "mpnet" => Ok(Self::MpNet),
            "hashed" => Ok(Self::Hashed),
            other => Err(DomainError::Configuration(format!(
                "unknown embedding model '{other}', expected one of: minilm, mpnet, hashed"
            ))),
        }
    }
}

impl std::fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identity())
    }
}

/// One ranked result from a vector index query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The retrieved chunk.
    pub chunk: Chunk,

    /// Cosine distance to the query (lower is closer, 0 = identical).
    pub distance: f32,

    /// Normalized similarity score in (0, 1], higher is better.
    pub score: f32,
}

impl SearchHit {
    pub fn new(chunk: Chunk, distance: f32) -> Self {
        // score = 1 / (1 + distance), monotone inverse of the distance
        let score = 1.0 / (1.0 + distance);
        Self {
            chunk,
            distance,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        assert_eq!(EmbeddingModel::MiniLm.dimensions(), 384);
        assert_eq!(EmbeddingModel::MpNet.dimensions(), 768);
        assert_eq!(EmbeddingModel::Hashed.dimensions(), 256);
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!(EmbeddingModel::parse("minilm").unwrap(), EmbeddingModel::MiniLm);
        assert_eq!(EmbeddingModel::parse("mpnet").unwrap(), EmbeddingModel::MpNet);
        assert_eq!(EmbeddingModel::parse("hashed").unwrap(), EmbeddingModel::Hashed);
        assert!(EmbeddingModel::parse("word2vec").is_err());
    }

    #[test]
    fn test_only_hashed_is_offline() {
        assert!(EmbeddingModel::MiniLm.requires_download());
        assert!(EmbeddingModel::MpNet.requires_download());
        assert!(!EmbeddingModel::Hashed.requires_download());
    }

    #[test]
    fn test_hit_score_from_distance() {
        let chunk = Chunk::new("a", "content", 0);
        let exact = SearchHit::new(chunk.clone(), 0.0);
        assert!((exact.score - 1.0).abs() < 1e-6);

        let far = SearchHit::new(chunk, 1.0);
        assert!((far.score - 0.5).abs() < 1e-6);
    }
}
