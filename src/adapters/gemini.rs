//! Gemini Adapter
//!
//! `generateContent` with the key passed as the `key` query parameter.

use crate::adapters::{decode, non_empty, GenerationParams, ProviderAdapter};
use crate::client::HttpClient;
use crate::error::{DispatchError, Result};
use crate::router::ProviderId;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::HeaderMap;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// `generateContent` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerateContentRequest {
    pub fn new(params: &GenerationParams, prompt: &str, system: Option<&str>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part {
                    text: s.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: params.max_tokens,
                temperature: params.temperature,
            },
        }
    }
}

/// `generateContent` response (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// First non-empty text part of the first candidate
    pub fn text(&self) -> Option<String> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.trim().is_empty())
            .map(str::to_string)
    }
}

/// Adapter for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    http: HttpClient,
    params: GenerationParams,
}

impl GeminiAdapter {
    pub fn new(http: HttpClient, params: GenerationParams) -> Self {
        Self { http, params }
    }

    /// Endpoint for the configured model, with the key attached
    fn endpoint(&self, key: &str) -> Result<Url> {
        let base = format!(
            "{}/v1beta/models/{}:generateContent",
            self.params.base_url, self.params.model
        );
        Url::parse_with_params(&base, &[("key", key)]).map_err(|e| {
            DispatchError::ProviderRequestFailed {
                provider: ProviderId::Gemini,
                status: None,
                message: format!("invalid endpoint {}: {}", base, e),
            }
        })
    }

    async fn send(&self, key: &str, prompt: &str, system: Option<&str>) -> Result<String> {
        let provider = ProviderId::Gemini;
        let url = self.endpoint(key)?;
        let request = GenerateContentRequest::new(&self.params, prompt, system);

        tracing::debug!(%provider, model = %self.params.model, "sending generateContent");
        let value = self
            .http
            .post_json(provider, url.as_str(), HeaderMap::new(), &request)
            .await?;

        let response: GenerateContentResponse = decode(provider, value)?;

        if response.candidates.is_empty() {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("no candidates (blocked: {})", r))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(DispatchError::malformed(provider, reason));
        }

        let field = match &response.candidates[0].finish_reason {
            Some(reason) => format!("candidates[0] text (finishReason: {})", reason),
            None => "candidates[0] text".to_string(),
        };
        non_empty(provider, response.text(), &field)
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Gemini
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
