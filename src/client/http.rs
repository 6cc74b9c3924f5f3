//! HTTP Client
//!
//! Shared async HTTP client for provider requests. One call is one attempt:
//! there is no retry here, fallback across providers is the dispatcher's job.

use crate::error::{DispatchError, Result};
use crate::router::ProviderId;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Longest slice of a response body copied into an error message
const ERROR_BODY_LIMIT: usize = 500;

/// HTTP client shared by every provider adapter
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Inner reqwest client (connection-pooled, cheap to clone)
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with the given timeouts
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| DispatchError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// POST a JSON body and return the parsed JSON response.
    ///
    /// Non-success statuses and transport failures become
    /// `ProviderRequestFailed`; a success status with a body that is not JSON
    /// becomes `ProviderResponseMalformed`.
    pub async fn post_json<T>(
        &self,
        provider: ProviderId,
        url: &str,
        extra_headers: HeaderMap,
        body: &T,
    ) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        let mut headers = extra_headers;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| DispatchError::transport(provider, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DispatchError::transport(provider, &e))?;

        if !status.is_success() {
            return Err(DispatchError::ProviderRequestFailed {
                provider,
                status: Some(status.as_u16()),
                message: error_detail(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            DispatchError::malformed(
                provider,
                format!("body is not JSON ({}): {}", e, truncate(&text)),
            )
        })
    }
}

/// Prefer the vendor's `error.message` field, fall back to the raw body
fn error_detail(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["/error/message", "/error", "/message"]
            .iter()
            .find_map(|p| v.pointer(p).and_then(Value::as_str))
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => truncate(body),
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Build a header map from static-name pairs, rejecting values that are not
/// valid header text (e.g. a key containing a newline).
pub fn headers_from(
    provider: ProviderId,
    pairs: &[(&'static str, &str)],
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value).map_err(|_| DispatchError::ProviderRequestFailed {
            provider,
            status: None,
            message: format!("invalid characters in {} header", name),
        })?;
        headers.insert(*name, value);
    }
    Ok(headers)
}
