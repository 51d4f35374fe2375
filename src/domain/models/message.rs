//! Conversation messages and the append-only session memory.

use serde::{Deserialize, Serialize};

/// Role of a message sender within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Content of a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text.
    Text { text: String },

    /// A tool invocation requested by the model.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// The outcome of a tool invocation, fed back to the model.
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// A role-tagged message. Ordering within a [`Conversation`] is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text { text: text.into() },
        }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            },
        }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
                is_error,
            },
        }
    }

    /// Text of the message when it carries plain text.
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Append-only ordered log of one recommendation session.
///
/// No message is ever removed or reordered: the transcript is a faithful,
/// replayable history of the session, which the forced-finalization step
/// and post-hoc debugging both rely on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Always succeeds.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Full ordered sequence for transmission to the model.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent plain-text assistant message, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .find_map(Message::as_text)
    }
}
