//! Wire types for the chat relay endpoint.
//!
//! The request shape matches the browser client this service grew out of:
//! optional per-request API keys ride alongside the conversation under
//! camelCase field names. Successful responses carry the upstream
//! completion payload verbatim, so only the error body has a fixed type.

use serde::{Deserialize, Serialize};

/// Chat relay request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model ID to request from the upstream service.
    pub model: String,
    /// Conversation messages, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Caller's primary API key, tried before any server-held key.
    #[serde(
        rename = "customApiKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_api_key: Option<String>,
    /// Caller's first backup key.
    #[serde(
        rename = "backupApiKey1",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_api_key_1: Option<String>,
    /// Caller's second backup key.
    #[serde(
        rename = "backupApiKey2",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_api_key_2: Option<String>,
}

impl ChatRequest {
    /// Caller-supplied keys in fallback order, with unset and blank entries
    /// dropped.
    #[must_use]
    pub fn caller_keys(&self) -> Vec<String> {
        [
            &self.custom_api_key,
            &self.backup_api_key_1,
            &self.backup_api_key_2,
        ]
        .into_iter()
        .flatten()
        .filter(|k| !k.is_empty())
        .cloned()
        .collect()
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message author (`system`, `user`, `assistant`).
    pub role: String,
    /// The content of the message.
    pub content: String,
}

/// Error body returned by the relay on any failure path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayError {
    /// Human-readable error message. Never contains credential values.
    pub error: String,
}

/// Extract the completion text from an upstream payload.
///
/// Returns `choices[0].message.content`, treating a missing or empty field
/// as `None`. An empty completion is never a usable response.
#[must_use]
pub fn completion_content(payload: &serde_json::Value) -> Option<&str> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .filter(|content| !content.is_empty())
}
