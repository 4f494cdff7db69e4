use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::Params;

/// The role of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
/// Role-tagged payload of a transcript message. Matching is exhaustive, so a
/// new role cannot be silently unhandled by a renderer or consumer.
pub enum MessageBody {
    User {
        content: String,
    },
    Assistant {
        content: String,
    },
    Tool {
        id: String,
        name: String,
        #[serde(default)]
        args: Value,
        #[serde(default)]
        params: Params,
    },
    Error {
        content: String,
    },
}

/// A message in the conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub created: i64,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    fn now(body: MessageBody) -> Self {
        Message {
            created: Utc::now().timestamp(),
            body,
        }
    }

    /// Create a new user message with the current timestamp
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::now(MessageBody::User {
            content: content.into(),
        })
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::now(MessageBody::Assistant {
            content: content.into(),
        })
    }

    /// Create a new tool message with no result parameters yet
    pub fn tool<S: Into<String>, T: Into<String>>(id: S, name: T, args: Value) -> Self {
        Self::now(MessageBody::Tool {
            id: id.into(),
            name: name.into(),
            args,
            params: Params::new(),
        })
    }

    /// Create a new error message with the current timestamp
    pub fn error<S: Into<String>>(content: S) -> Self {
        Self::now(MessageBody::Error {
            content: content.into(),
        })
    }

    pub fn role(&self) -> Role {
        match &self.body {
            MessageBody::User { .. } => Role::User,
            MessageBody::Assistant { .. } => Role::Assistant,
            MessageBody::Tool { .. } => Role::Tool,
            MessageBody::Error { .. } => Role::Error,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role() == Role::Assistant
    }

    /// True if this is a tool message carrying the given tool call id.
    pub fn is_tool_with_id(&self, tool_id: &str) -> bool {
        matches!(&self.body, MessageBody::Tool { id, .. } if id == tool_id)
    }

    /// Get the text content for user, assistant and error messages
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            MessageBody::User { content }
            | MessageBody::Assistant { content }
            | MessageBody::Error { content } => Some(content),
            MessageBody::Tool { .. } => None,
        }
    }

    /// Append a streamed delta to an assistant message. No-op for other roles.
    pub fn push_text(&mut self, delta: &str) {
        if let MessageBody::Assistant { content } = &mut self.body {
            content.push_str(delta);
        }
    }

    /// Upsert result parameters into a tool message. No-op for other roles.
    pub fn merge_params(&mut self, update: Params) {
        if let MessageBody::Tool { params, .. } = &mut self.body {
            params.merge(update);
        }
    }
}
