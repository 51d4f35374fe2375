//! Shared fixtures for the integration suites.
//!
//! Everything here runs offline: indexes are built with the hashed
//! embedder, and model turns come from scripted in-process clients.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use medirec::domain::errors::{DomainError, DomainResult};
use medirec::domain::models::{Chunk, EmbeddingModel, MessageContent};
use medirec::domain::ports::{
    CompletionClient, CompletionRequest, EmbeddingService, ModelTurn, StopReason,
};
use medirec::{HashedEmbedder, VectorIndex};

/// Canonical-layout checkup records used across the suites.
pub fn sample_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new(
            "426815",
            "patient_id:426815,gender:male,age:50,height:172cm,weight:80kg,\
             medical_history:hypertension,symptoms:dizziness",
            0,
        ),
        Chunk::new(
            "183054",
            "patient_id:183054,gender:female,age:44,height:160cm,weight:55kg,\
             medical_history:diabetes,symptoms:thirst",
            1,
        ),
        Chunk::new(
            "550021",
            "patient_id:550021,gender:male,age:63,height:168cm,weight:77kg,\
             medical_history:gout,symptoms:joint pain",
            2,
        ),
    ]
}

/// Build a populated hashed-embedder index at `path`.
pub async fn populated_index(path: &Path) -> VectorIndex {
    let embedder = Arc::new(HashedEmbedder::new());
    let index = VectorIndex::create(path, embedder)
        .await
        .expect("index creation should succeed");
    index
        .add(&sample_chunks())
        .await
        .expect("adding sample chunks should succeed");
    index
}

/// An embedder that reports a different model identity than the hashed one,
/// for exercising the load-time schema validation.
pub struct MislabeledEmbedder;

#[async_trait]
impl EmbeddingService for MislabeledEmbedder {
    async fn embed(&self, _text: &str) -> DomainResult<Vec<f32>> {
        Ok(vec![0.0; self.dimensions()])
    }

    async fn embed_batch(&self, texts: &[&str]) -> DomainResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimensions()]).collect())
    }

    fn dimensions(&self) -> usize {
        EmbeddingModel::MiniLm.dimensions()
    }

    fn model(&self) -> EmbeddingModel {
        EmbeddingModel::MiniLm
    }
}

/// A completion client that replays a fixed sequence of turns.
pub struct ScriptedClient {
    turns: Mutex<VecDeque<DomainResult<ModelTurn>>>,
    pub calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(turns: Vec<DomainResult<ModelTurn>>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _request: CompletionRequest) -> DomainResult<ModelTurn> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.turns
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(DomainError::Completion("script exhausted".to_string())))
    }
}

/// A model that requests a tool on every turn it is offered tools, and
/// answers directly only when tool access is withheld.
pub struct GreedyToolClient {
    pub calls: AtomicUsize,
    final_answer: String,
}

impl GreedyToolClient {
    pub fn new(final_answer: impl Into<String>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            final_answer: final_answer.into(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for GreedyToolClient {
    async fn complete(&self, request: CompletionRequest) -> DomainResult<ModelTurn> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if request.tools.is_empty() {
            return Ok(ModelTurn {
                content: vec![MessageContent::Text {
                    text: self.final_answer.clone(),
                }],
                stop_reason: StopReason::EndTurn,
            });
        }

        Ok(ModelTurn {
            content: vec![MessageContent::ToolUse {
                id: format!("toolu_{call}"),
                name: "lookup_by_profile".to_string(),
                input: json!({"count": 2, "profile": "male, 50, hypertension, dizziness"}),
            }],
            stop_reason: StopReason::ToolUse,
        })
    }
}

/// Convenience constructors for scripted turns.
pub fn text_turn(text: &str) -> DomainResult<ModelTurn> {
    Ok(ModelTurn {
        content: vec![MessageContent::Text {
            text: text.to_string(),
        }],
        stop_reason: StopReason::EndTurn,
    })
}

pub fn tool_turn(id: &str, name: &str, input: serde_json::Value) -> DomainResult<ModelTurn> {
    Ok(ModelTurn {
        content: vec![MessageContent::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        stop_reason: StopReason::ToolUse,
    })
}
