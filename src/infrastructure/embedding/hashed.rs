//! Deterministic hash-based embedding backend.
//!
//! Produces L2-normalized vectors derived from the byte content of the
//! input. Same text, same vector — which is all the offline development
//! workflow and the test suite need from an embedder. Not suitable for
//! semantic similarity across paraphrases.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::EmbeddingModel;
use crate::domain::ports::EmbeddingService;

/// Embedding service backed by a byte-mixing hash, no model weights.
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: EmbeddingModel::Hashed.dimensions(),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let bytes = text.as_bytes();
        let mut embedding = vec![0.0f32; self.dimensions];

        for (i, val) in embedding.iter_mut().enumerate() {
            let byte_idx = i % bytes.len().max(1);
            let byte_val = if bytes.is_empty() { 0 } else { bytes[byte_idx] };
            // Deterministic pseudo-random mix of byte value and position.
            *val = ((byte_val as usize * 31 + i * 17) % 256) as f32 / 255.0 - 0.5;
        }

        // f64 accumulation avoids magnitude drift over many dimensions.
        let magnitude = embedding
            .iter()
            .map(|x| f64::from(*x) * f64::from(*x))
            .sum::<f64>()
            .sqrt() as f32;

        if magnitude > 1e-10 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        } else {
            let uniform = 1.0 / (self.dimensions as f32).sqrt();
            embedding.fill(uniform);
        }

        embedding
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for HashedEmbedder {
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> DomainResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> EmbeddingModel {
        EmbeddingModel::Hashed
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn text_strategy() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9 .,:;_-]{1,500}").expect("valid regex")
    }

    proptest! {
        #[test]
        fn proptest_determinism(text in text_strategy()) {
            let embedder = HashedEmbedder::new();
            prop_assert_eq!(embedder.embed_sync(&text), embedder.embed_sync(&text));
        }

        #[test]
        fn proptest_l2_normalized(text in text_strategy()) {
            let embedder = HashedEmbedder::new();
            let embedding = embedder.embed_sync(&text);

            let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            prop_assert!(
                (magnitude - 1.0).abs() < 1e-4,
                "L2 norm should be 1.0, got {}",
                magnitude
            );

            for val in &embedding {
                prop_assert!(val.is_finite());
            }
        }

        #[test]
        fn proptest_dimensions_stable(text in text_strategy()) {
            let embedder = HashedEmbedder::new();
            prop_assert_eq!(embedder.embed_sync(&text).len(), embedder.dimensions());
        }
    }
}
