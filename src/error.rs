//! Error types for the assistant.

/// Top-level error type for the chat relay and speech adapters.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    /// No API keys available after merging caller and server keys.
    #[error("no API keys configured")]
    NoKeysConfigured,

    /// Every credential was rejected by the upstream API.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// Every credential hit the upstream rate limit.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Network failure or an unusable upstream response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Primary and secondary model both failed for a user turn.
    #[error("all models exhausted: {0}")]
    ModelsExhausted(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Speech recognition or synthesis error.
    #[error("speech error: {0}")]
    Speech(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistError>;
