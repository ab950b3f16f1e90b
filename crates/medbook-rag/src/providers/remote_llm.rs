//! Client for the remote GPU server's `/generate` endpoint
//!
//! The server speaks an OpenAI-style shape: it takes
//! `{messages, temperature, max_tokens}` and answers with
//! `{choices: [{message: {content}}]}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::llm::LlmProvider;
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::ChatMessage;

/// HTTP client for the completion endpoint (no retries)
pub struct RemoteLlmClient {
    client: Client,
    url: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl RemoteLlmClient {
    /// Build a client for the configured endpoint.
    ///
    /// Fails with a config error when the endpoint is unset or a
    /// placeholder.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let url = config.generate_url()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build LLM HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for RemoteLlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = GenerateRequest {
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!("POST {} ({} messages)", self.url, messages.len());

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::llm("GPU server reply contained no choices"))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
