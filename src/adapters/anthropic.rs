//! Anthropic Adapter
//!
//! Messages API with `x-api-key` authentication.

use crate::adapters::{decode, non_empty, GenerationParams, ProviderAdapter};
use crate::client::{headers_from, HttpClient};
use crate::error::Result;
use crate::router::ProviderId;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// Value sent in the `anthropic-version` header
pub const API_VERSION: &str = "2023-06-01";

/// Messages API request body
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    pub messages: Vec<InputMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMessage {
    pub role: String,
    pub content: String,
}

impl MessagesRequest {
    pub fn new(params: &GenerationParams, prompt: &str, system: Option<&str>) -> Self {
        Self {
            model: params.model.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: system.map(str::to_string),
            messages: vec![InputMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

/// Messages API response (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,
}

impl MessagesResponse {
    /// Text of the first `text` block
    pub fn text(&self) -> Option<String> {
        self.content
            .iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text.clone())
    }
}

/// Adapter for the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    http: HttpClient,
    url: String,
    params: GenerationParams,
}

impl AnthropicAdapter {
    pub fn new(http: HttpClient, params: GenerationParams) -> Self {
        Self {
            url: format!("{}/v1/messages", params.base_url),
            http,
            params,
        }
    }

    async fn send(&self, key: &str, prompt: &str, system: Option<&str>) -> Result<String> {
        let provider = ProviderId::Anthropic;
        let headers = headers_from(
            provider,
            &[("x-api-key", key), ("anthropic-version", API_VERSION)],
        )?;
        let request = MessagesRequest::new(&self.params, prompt, system);

        tracing::debug!(%provider, model = %self.params.model, "sending messages request");
        let value = self.http.post_json(provider, &self.url, headers, &request).await?;

        let response: MessagesResponse = decode(provider, value)?;
        non_empty(provider, response.text(), "content[type=text].text")
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
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
