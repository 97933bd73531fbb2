//! Chat completion collaborator
//!
//! The simulated customer is an Azure OpenAI chat deployment. Each request
//! carries the full conversation (persona preamble first) and a reply token
//! budget; the reply is a single message.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::conversation::{ConversationTurn, Role};
use crate::{Error, Result};

/// Produces the next assistant reply for a conversation
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Complete the conversation with a single reply of at most `max_tokens`
    async fn complete(&self, turns: &[ConversationTurn], max_tokens: u32) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Azure OpenAI chat completions client
pub struct AzureOpenAiChat {
    client: reqwest::Client,
    key: SecretString,
    url: String,
}

impl AzureOpenAiChat {
    /// Create a client for the configured deployment
    #[must_use]
    pub fn new(config: &ChatConfig) -> Self {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&config.deployment),
            urlencoding::encode(&config.api_version),
        );

        Self {
            client: reqwest::Client::new(),
            key: SecretString::from(config.key.expose_secret().to_string()),
            url,
        }
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAiChat {
    async fn complete(&self, turns: &[ConversationTurn], max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            messages: turns
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role,
                    content: &turn.content,
                })
                .collect(),
            max_tokens,
        };

        tracing::debug!(turns = turns.len(), max_tokens, "requesting chat completion");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", self.key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ChatService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::ChatService(format!("chat API error {status}: {body}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::ChatService(format!("invalid chat response: {e}")))?;

        extract_reply(body)
    }
}

fn extract_reply(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default().trim().to_string())
        .ok_or_else(|| Error::ChatService("chat response contained no choices".to_string()))
}
