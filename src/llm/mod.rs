mod openai;
mod sse;

pub use openai::OpenAiChat;

use crate::error::LlmError;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Incremental completion text; each item is one fragment as it arrives
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Chat completion service
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Whole completion in one response
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Completion delivered fragment by fragment
    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError>;

    fn name(&self) -> &'static str;
}
