//! Ports implemented by the infrastructure layer.
//!
//! Services depend on these traits, never on concrete adapters, which keeps
//! ingestion and serving independently testable: the test suites swap in a
//! deterministic embedder and a scripted completion client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{EmbeddingModel, Message, MessageContent, ToolDescriptor};

/// Text-to-vector embedding service.
///
/// One implementation is constructed per process and shared (`Arc`) between
/// ingestion and query paths; using different models for the two would make
/// similarity scores incomparable.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[&str]) -> DomainResult<Vec<Vec<f32>>>;

    /// Vector dimensions this service produces.
    fn dimensions(&self) -> usize;

    /// Identity of the underlying model.
    fn model(&self) -> EmbeddingModel;
}

/// Why the model stopped generating a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

/// A completion request: full ordered message history plus the tools the
/// model may call this turn.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// One model turn: ordered content blocks and the stop reason.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    pub content: Vec<MessageContent>,
    pub stop_reason: StopReason,
}

impl ModelTurn {
    /// Concatenated text blocks of this turn.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                MessageContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool invocations requested in this turn, in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                MessageContent::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

/// Opaque language-model completion: messages in, one turn out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> DomainResult<ModelTurn>;
}

/// A typed, named retrieval capability exposed to the model.
#[async_trait]
pub trait RetrievalTool: Send + Sync {
    /// Immutable descriptor (name, description, argument schema).
    fn descriptor(&self) -> &ToolDescriptor;

    /// Execute with JSON arguments, returning one flattened text blob.
    ///
    /// Argument errors surface as `DomainError::ToolResolution`; the agent
    /// loop converts them into error-flagged tool results instead of
    /// aborting the session.
    async fn run(&self, args: serde_json::Value) -> DomainResult<String>;
}
