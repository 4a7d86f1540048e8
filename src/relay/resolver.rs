//! Sequential credential fallback against the upstream completions API.
//!
//! [`CompletionResolver`] holds an ordered invariant: keys are tried one at
//! a time, each attempt fully awaited, and the first response that is both
//! 2xx and carries a non-empty completion wins. Later keys are never
//! touched after a success. When every key fails, the last observed HTTP
//! status picks the error class: 401 means every credential was rejected,
//! 429 means every credential was throttled, anything else is a transport
//! failure.
//!
//! Attempts are logged by ordinal only; credential values never reach the
//! log stream or an error payload.

use crate::error::{AssistError, Result};
use crate::relay::api::{ChatMessage, completion_content};
use std::time::Duration;
use tracing::{info, warn};

/// `X-Title` header value sent with every upstream request.
const APP_TITLE: &str = "P.O.O.J.A Mental Health Assistant";

/// Status assumed when no attempt produced an HTTP response at all.
const DEFAULT_FAILURE_STATUS: u16 = 500;

/// Ordered bearer-key fallback client for one upstream endpoint.
pub struct CompletionResolver {
    client: reqwest::Client,
    upstream_url: String,
    temperature: f64,
}

impl CompletionResolver {
    /// Create a resolver for the given upstream chat-completions URL.
    ///
    /// `timeout` bounds each individual key attempt; the worst case for one
    /// [`resolve`](Self::resolve) call is `keys.len() * timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        upstream_url: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistError::Transport(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            client,
            upstream_url: upstream_url.into(),
            temperature,
        })
    }

    /// Returns the upstream URL this resolver targets.
    #[must_use]
    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Try each key in order and return the first usable completion payload.
    ///
    /// A usable response is HTTP 2xx with non-empty
    /// `choices[0].message.content`. Anything else records the attempt's
    /// status and moves on to the next key.
    ///
    /// # Errors
    ///
    /// - [`AssistError::NoKeysConfigured`] when `keys` is empty (no network
    ///   call is made).
    /// - [`AssistError::Unauthorized`] when the last failure status was 401.
    /// - [`AssistError::RateLimited`] when the last failure status was 429.
    /// - [`AssistError::Transport`] for every other exhaustion.
    pub async fn resolve(
        &self,
        model: &str,
        messages: &[ChatMessage],
        keys: &[String],
    ) -> Result<serde_json::Value> {
        if keys.is_empty() {
            return Err(AssistError::NoKeysConfigured);
        }

        let body = request_body(model, messages, self.temperature);
        let total = keys.len();
        let mut last_status: Option<u16> = None;

        for (index, key) in keys.iter().enumerate() {
            let attempt = index + 1;
            info!(attempt, total, model, "trying upstream API key");

            let response = self
                .client
                .post(&self.upstream_url)
                .bearer_auth(key)
                .header("X-Title", APP_TITLE)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt, error = %e, "upstream request failed");
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                match response.json::<serde_json::Value>().await {
                    Ok(payload) => {
                        if completion_content(&payload).is_some() {
                            info!(attempt, model, "upstream API key accepted");
                            return Ok(payload);
                        }
                        warn!(attempt, "upstream response has no completion content");
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "upstream response body unreadable");
                    }
                }
                last_status = Some(status.as_u16());
            } else {
                let detail = response.text().await.unwrap_or_default();
                warn!(
                    attempt,
                    status = status.as_u16(),
                    error = detail.as_str(),
                    "upstream rejected API key"
                );
                last_status = Some(status.as_u16());
            }
        }

        Err(classify_exhaustion(last_status))
    }
}

/// Build the upstream request body for one attempt.
fn request_body(model: &str, messages: &[ChatMessage], temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
    })
}

/// Map the last observed failure status onto the error taxonomy.
fn classify_exhaustion(last_status: Option<u16>) -> AssistError {
    let status = last_status.unwrap_or(DEFAULT_FAILURE_STATUS);
    match status {
        401 => AssistError::Unauthorized("every API key was rejected".to_owned()),
        429 => AssistError::RateLimited("every API key was throttled".to_owned()),
        other => AssistError::Transport(format!("API request failed with status {other}")),
    }
}
