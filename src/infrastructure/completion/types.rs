//! Wire types for the messages API.

use serde::{Deserialize, Serialize};

use crate::domain::models::{Message, MessageContent, Role};
use crate::domain::ports::StopReason;

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
}

/// A single wire message; content is either plain text or content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: WireContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Blocks(Vec<WireBlock>),
}

/// Content block inside a message or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Tool definition for function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Response body from `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    pub id: String,

    #[serde(rename = "type")]
    pub response_type: String,

    pub role: String,
    pub content: Vec<WireBlock>,
    pub model: String,
    pub stop_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,

    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Convert the domain message history into wire messages.
///
/// System-role text is hoisted into the request-level system prompt (the
/// API has no system role in the messages array), tool results travel as
/// user-role tool_result blocks, and consecutive same-role messages are
/// merged into one block list.
pub fn to_wire_messages(messages: &[Message]) -> (Option<String>, Vec<WireMessage>) {
    let mut system_parts: Vec<String> = Vec::new();
    let mut wire: Vec<WireMessage> = Vec::new();

    for message in messages {
        let (role, block) = match (&message.role, &message.content) {
            (Role::System, MessageContent::Text { text }) => {
                system_parts.push(text.clone());
                continue;
            }
            (Role::User, MessageContent::Text { text }) => (
                "user",
                WireBlock::Text {
                    text: text.clone(),
                },
            ),
            (Role::Assistant, MessageContent::Text { text }) => (
                "assistant",
                WireBlock::Text {
                    text: text.clone(),
                },
            ),
            (_, MessageContent::ToolUse { id, name, input }) => (
                "assistant",
                WireBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
            ),
            (
                _,
                MessageContent::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                },
            ) => (
                "user",
                WireBlock::ToolResult {
                    tool_use_id: tool_use_id.clone(),
                    content: content.clone(),
                    is_error: if *is_error { Some(true) } else { None },
                },
            ),
            // A non-text payload under System or text under Tool has no wire
            // shape; treat the text as user content rather than dropping it.
            (_, MessageContent::Text { text }) => (
                "user",
                WireBlock::Text {
                    text: text.clone(),
                },
            ),
        };

        match wire.last_mut() {
            Some(last) if last.role == role => {
                if let WireContent::Blocks(blocks) = &mut last.content {
                    blocks.push(block);
                }
            }
            _ => wire.push(WireMessage {
                role: role.to_string(),
                content: WireContent::Blocks(vec![block]),
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    (system, wire)
}

/// Convert a wire response into domain content blocks.
pub fn to_domain_content(blocks: &[WireBlock]) -> Vec<MessageContent> {
    blocks
        .iter()
        .map(|block| match block {
            WireBlock::Text { text } => MessageContent::Text { text: text.clone() },
            WireBlock::ToolUse { id, name, input } => MessageContent::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            WireBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => MessageContent::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
                is_error: is_error.unwrap_or(false),
            },
        })
        .collect()
}

/// Map the wire stop reason onto the domain enum. Unknown values degrade to
/// `EndTurn` so a new API value cannot wedge the loop.
pub fn to_stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}
