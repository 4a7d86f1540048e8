//! HTTP client for the local chat relay.
//!
//! The controller does not talk to the upstream model API directly; it posts
//! conversations to the relay endpoint and lets the relay handle key
//! fallback. Saved user keys are attached to every request so the relay can
//! try them ahead of its own environment-held fallbacks.

use std::time::Duration;

use tracing::info;

use crate::credentials::StoredKeys;
use crate::error::{AssistError, Result};
use crate::relay::api::{ChatMessage, ChatRequest, RelayError, completion_content};

/// Client for the relay's `POST /chat` endpoint.
pub struct RelayClient {
    client: reqwest::Client,
    relay_url: String,
    keys: StoredKeys,
}

impl RelayClient {
    /// Create a client for the relay at `relay_url` (the full `/chat` URL).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
            keys: StoredKeys::default(),
        })
    }

    /// Replace the saved keys attached to future requests.
    ///
    /// Blank slots are dropped, matching what the key store persists.
    pub fn set_keys(&mut self, keys: &StoredKeys) {
        self.keys = keys.normalized();
    }

    /// The saved keys currently attached to requests.
    #[must_use]
    pub fn keys(&self) -> &StoredKeys {
        &self.keys
    }

    /// Request a completion for `messages` from the given model.
    ///
    /// Returns the completion text on success. Relay error bodies are
    /// surfaced through the error taxonomy so callers can decide whether a
    /// different model is worth trying.
    ///
    /// # Errors
    ///
    /// Returns [`AssistError::Unauthorized`] on 401, [`AssistError::RateLimited`]
    /// on 429, and [`AssistError::Transport`] for any other failure, including
    /// a success payload that carries no completion text.
    pub async fn complete(&self, model: &str, messages: Vec<ChatMessage>) -> Result<String> {
        info!(model, url = self.relay_url.as_str(), "requesting completion");

        let request = self.chat_request(model, messages);
        let response = self
            .client
            .post(&self.relay_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistError::Transport(format!("relay request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<RelayError>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("relay returned status {status}"));
            return Err(match status.as_u16() {
                401 => AssistError::Unauthorized(detail),
                429 => AssistError::RateLimited(detail),
                _ => AssistError::Transport(detail),
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistError::Transport(format!("relay response was not JSON: {e}")))?;

        match completion_content(&payload) {
            Some(text) => Ok(text.to_owned()),
            None => Err(AssistError::Transport(
                "completion payload had no content".to_owned(),
            )),
        }
    }

    /// Build the request body, attaching saved keys in slot order.
    fn chat_request(&self, model: &str, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: model.to_owned(),
            messages,
            custom_api_key: self.keys.primary.clone(),
            backup_api_key_1: self.keys.backup_1.clone(),
            backup_api_key_2: self.keys.backup_2.clone(),
        }
    }
}
