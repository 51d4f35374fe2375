//! Medirec - health-check package recommender.
//!
//! Combines retrieval over historical checkup records with a tool-calling
//! language-model agent. Ingestion (offline) chunks and embeds source
//! records into persisted vector indexes; a recommendation session (online)
//! lets the model query those indexes through typed tools until it converges
//! on a final recommendation.
//!
//! # Architecture
//!
//! - **Domain** (`domain`): models, ports, and the error taxonomy
//! - **Services** (`services`): chunking, ingestion, tools, the agent loop
//! - **Infrastructure** (`infrastructure`): embedding backends, the SQLite
//!   vector index, the messages-API client, configuration
//! - **CLI** (`cli`): `ingest` and `recommend` commands

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Chunk, ChunkerConfig, Conversation, EmbeddingModel, Message, MessageContent, Record, Role,
    SearchHit, ToolDescriptor, UserProfile,
};
pub use domain::ports::{CompletionClient, CompletionRequest, EmbeddingService, ModelTurn, RetrievalTool, StopReason};
pub use infrastructure::config::Config;
pub use infrastructure::embedding::{build_embedder, HashedEmbedder};
pub use infrastructure::index::VectorIndex;
pub use services::{AgentConfig, IngestService, RecommendationAgent, RecommendationOutcome, ToolRegistry};
