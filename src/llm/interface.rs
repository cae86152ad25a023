use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A stateless chat model: the caller owns the whole conversation and sends it
/// every time.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the assistant reply for the given conversation.
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    fn name(&self) -> &str;
}
