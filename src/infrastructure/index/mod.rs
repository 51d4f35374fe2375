//! Vector index storage.

mod store;

pub use store::{cosine_distance, lexical_overlap, VectorIndex, RERANK_OVERSAMPLE};
