//! Chat Completions Adapter
//!
//! Handles the OpenAI `/chat/completions` wire format, which Perplexity also
//! speaks.

use crate::adapters::{decode, non_empty, GenerationParams, ProviderAdapter};
use crate::client::{headers_from, HttpClient};
use crate::error::Result;
use crate::router::ProviderId;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// A message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user" or "assistant"
    pub role: String,

    /// Message text
    pub content: String,
}

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    /// Build a request with an optional system message ahead of the prompt
    pub fn new(params: &GenerationParams, prompt: &str, system: Option<&str>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        Self {
            model: params.model.clone(),
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

/// Message content - a plain string or an array of typed parts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A content part in a response message
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,
}

impl MessageContent {
    /// Convert to string (concatenating text parts if needed)
    pub fn to_string_content(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.kind == "text")
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Chat completion response (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl ChatResponse {
    /// Get the first message content
    pub fn content(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(MessageContent::to_string_content)
    }
}

/// Adapter for any bearer-authenticated chat completions endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionsAdapter {
    provider: ProviderId,
    http: HttpClient,
    url: String,
    params: GenerationParams,
}

impl ChatCompletionsAdapter {
    /// Adapter posting to `{base_url}{path}`
    pub fn new(provider: ProviderId, http: HttpClient, params: GenerationParams, path: &str) -> Self {
        Self {
            provider,
            url: format!("{}{}", params.base_url, path),
            http,
            params,
        }
    }

    /// OpenAI's `/v1/chat/completions`
    pub fn openai(http: HttpClient, params: GenerationParams) -> Self {
        Self::new(ProviderId::OpenAi, http, params, "/v1/chat/completions")
    }

    /// Endpoint this adapter posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, key: &str, prompt: &str, system: Option<&str>) -> Result<String> {
        let request = ChatRequest::new(&self.params, prompt, system);
        let bearer = format!("Bearer {}", key);
        let headers = headers_from(self.provider, &[("authorization", bearer.as_str())])?;

        tracing::debug!(provider = %self.provider, model = %self.params.model, "sending chat completion");
        let value = self
            .http
            .post_json(self.provider, &self.url, headers, &request)
            .await?;

        let response: ChatResponse = decode(self.provider, value)?;
        non_empty(self.provider, response.content(), "choices[0].message.content")
    }
}

impl ProviderAdapter for ChatCompletionsAdapter {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn complete<'a>(
        &'a self,
        key: &'a str,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String>> {
        self.send(key, prompt, system).boxed()
    }
}
