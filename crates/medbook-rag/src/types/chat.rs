//! Chat request/response types and LLM messages

use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /chat`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    /// User question; absent or null is treated as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reply to `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model answer, or a human-readable error
    pub response: String,
    /// Retrieved passages backing the answer
    pub context: Vec<String>,
}

impl ChatResponse {
    /// Successful answer with its supporting context
    pub fn answer(response: String, context: Vec<String>) -> Self {
        Self { response, context }
    }

    /// Failure reported as a message with no context
    pub fn message(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            context: Vec::new(),
        }
    }
}

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the `messages` array sent to the completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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
