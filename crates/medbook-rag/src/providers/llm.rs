//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;
use crate::types::ChatMessage;

/// Trait for chat-style answer generation
///
/// Implementations:
/// - `RemoteLlmClient`: GPU server exposing `/generate`
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation and return the model's reply text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Where requests are sent, for logging
    fn endpoint(&self) -> &str;
}
