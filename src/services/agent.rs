//! The retrieval-augmented agent loop.
//!
//! One `RecommendationAgent` drives one session to completion:
//!
//! ```text
//! AwaitingModel → (ToolRequested → tools executed)* → Finalizing → Done
//! ```
//!
//! The iteration bound is a first-class invariant: a model that keeps
//! requesting tools is cut off after `max_iterations` turns and forced to
//! answer directly, with tool access withheld from the final call. Tool
//! failures never abort the session; they are appended to memory as
//! error-flagged tool results so the model can self-correct.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Conversation, Message, MessageContent, Role, UserProfile};
use crate::domain::ports::{CompletionClient, CompletionRequest};
use crate::services::prompts;
use crate::services::tools::ToolRegistry;

/// Tuning knobs for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum model turns that may request tools before finalization is
    /// forced.
    pub max_iterations: usize,

    /// Token budget per model turn.
    pub max_tokens: u32,

    /// Sampling temperature, if overridden.
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 6,
            max_tokens: 1024,
            temperature: None,
        }
    }
}

/// Result of a recommendation session: the final answer plus the complete
/// ordered transcript for auditing.
#[derive(Debug, Clone)]
pub struct RecommendationOutcome {
    pub answer: String,
    pub transcript: Conversation,
}

/// One pending tool invocation parsed from a model turn.
#[derive(Debug, Clone)]
struct ToolRequest {
    id: String,
    name: String,
    input: Value,
}

/// States of the tool-orchestration loop.
enum LoopState {
    AwaitingModel { iteration: usize },
    ToolRequested { iteration: usize, requests: Vec<ToolRequest> },
    Finalizing,
    Done(String),
}

/// Drives a language model over the retrieval tools to a final
/// recommendation.
pub struct RecommendationAgent {
    client: Arc<dyn CompletionClient>,
    registry: ToolRegistry,
    config: AgentConfig,
}

impl RecommendationAgent {
    pub fn new(client: Arc<dyn CompletionClient>, registry: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    /// Run one recommendation session to completion.
    ///
    /// Always returns a final string: on total model failure the last
    /// assistant text seen (or a fixed fallback) stands in, because the
    /// presentation layer has no structured error channel.
    pub async fn run(&self, profile: &UserProfile) -> RecommendationOutcome {
        let session = uuid::Uuid::new_v4();
        tracing::info!(%session, patient_id = %profile.id, "recommendation session started");

        let mut memory = Conversation::new();
        memory.push(Message::text(Role::User, prompts::build_request(profile)));

        let answer = match self.drive(&mut memory).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                tracing::warn!(%session, "model produced an empty final answer");
                memory
                    .last_assistant_text()
                    .unwrap_or(prompts::FALLBACK_ANSWER)
                    .to_string()
            }
            Err(err) => {
                tracing::error!(%session, error = %err, "session failed, returning best effort");
                memory
                    .last_assistant_text()
                    .unwrap_or(prompts::FALLBACK_ANSWER)
                    .to_string()
            }
        };

        tracing::info!(%session, turns = memory.len(), "recommendation session finished");

        RecommendationOutcome {
            answer,
            transcript: memory,
        }
    }

    async fn drive(&self, memory: &mut Conversation) -> DomainResult<String> {
        let mut state = LoopState::AwaitingModel { iteration: 0 };

        loop {
            state = match state {
                LoopState::AwaitingModel { iteration } if iteration >= self.config.max_iterations => {
                    tracing::warn!(
                        iterations = iteration,
                        "iteration bound exhausted, forcing finalization"
                    );
                    LoopState::Finalizing
                }

                LoopState::AwaitingModel { iteration } => {
                    let turn = self.client.complete(self.request(memory, true)).await?;

                    let mut requests = Vec::new();
                    for block in turn.content {
                        match block {
                            MessageContent::Text { text } => {
                                memory.push(Message::text(Role::Assistant, text));
                            }
                            MessageContent::ToolUse { id, name, input } => {
                                memory.push(Message::tool_use(id.clone(), name.clone(), input.clone()));
                                requests.push(ToolRequest { id, name, input });
                            }
                            // Models do not emit tool results; drop rather
                            // than corrupt the transcript.
                            MessageContent::ToolResult { .. } => {}
                        }
                    }

                    if requests.is_empty() {
                        let answer = memory.last_assistant_text().unwrap_or_default().to_string();
                        LoopState::Done(answer)
                    } else {
                        LoopState::ToolRequested { iteration, requests }
                    }
                }

                LoopState::ToolRequested { iteration, requests } => {
                    for request in requests {
                        self.execute_tool(memory, request).await;
                    }
                    LoopState::AwaitingModel {
                        iteration: iteration + 1,
                    }
                }

                LoopState::Finalizing => {
                    memory.push(Message::text(Role::System, prompts::OUTPUT_DIRECTIVE));

                    // One last call without tool access.
                    let turn = self.client.complete(self.request(memory, false)).await?;
                    let answer = turn.text();
                    memory.push(Message::text(Role::Assistant, answer.clone()));
                    LoopState::Done(answer)
                }

                LoopState::Done(answer) => return Ok(answer),
            };
        }
    }

    /// Execute one requested tool, appending its result (or its failure) to
    /// memory. Resolution and execution errors are recoverable by design:
    /// the model sees them and may correct itself on the next turn.
    async fn execute_tool(&self, memory: &mut Conversation, request: ToolRequest) {
        let outcome = match self.registry.resolve(&request.name) {
            Ok(tool) => tool.run(request.input).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(text) => {
                tracing::debug!(tool = %request.name, "tool executed");
                memory.push(Message::tool_result(request.id, text, false));
            }
            Err(err) => {
                tracing::warn!(tool = %request.name, error = %err, "tool call failed");
                memory.push(Message::tool_result(request.id, err.to_string(), true));
            }
        }
    }

    fn request(&self, memory: &Conversation, with_tools: bool) -> CompletionRequest {
        CompletionRequest {
            system: Some(prompts::SYSTEM_PROMPT.to_string()),
            messages: memory.messages().to_vec(),
            tools: if with_tools {
                self.registry.descriptors()
            } else {
                Vec::new()
            },
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}
