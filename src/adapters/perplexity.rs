//! Perplexity speaks the chat completions format at `/chat/completions`
//! (no `/v1` segment).

use crate::adapters::{ChatCompletionsAdapter, GenerationParams};
use crate::client::HttpClient;
use crate::router::ProviderId;

pub const PATH: &str = "/chat/completions";

pub fn adapter(http: HttpClient, params: GenerationParams) -> ChatCompletionsAdapter {
    ChatCompletionsAdapter::new(ProviderId::Perplexity, http, params, PATH)
}
