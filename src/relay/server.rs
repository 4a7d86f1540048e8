//! HTTP relay service for chat completions.
//!
//! Exposes a single `POST /chat` endpoint on localhost. The handler merges
//! the caller's API keys (tried first) with the server-held fallback keys
//! captured at startup, delegates to the [`CompletionResolver`], and maps
//! the failure taxonomy onto HTTP statuses with fixed explanatory bodies.
//! Credential values never appear in logs or response bodies; requests are
//! correlated in the log stream by a generated request ID.

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::error::AssistError;
use crate::relay::api::{ChatRequest, RelayError};
use crate::relay::resolver::CompletionResolver;

/// Body for a request that arrives with no usable key anywhere.
const NO_KEYS_MESSAGE: &str = "No API keys configured. Please add an API key in settings or configure server environment variables.";

/// Body when every key was rejected with 401.
const AUTH_FAILED_MESSAGE: &str =
    "Authentication failed: All API keys are invalid. Please provide a valid API key.";

/// Body when every key was throttled with 429.
const RATE_LIMITED_MESSAGE: &str =
    "Rate limit exceeded: All available API keys are rate limited. Please try again later.";

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    /// Upstream fallback resolver shared across requests.
    resolver: Arc<CompletionResolver>,
    /// Server-held fallback keys, tried after any caller-supplied keys.
    server_keys: Arc<Vec<String>>,
}

/// Chat relay HTTP server.
///
/// The server is stateless per request; the only shared state is the
/// resolver and the read-only server key list.
pub struct RelayServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl RelayServer {
    /// Start the relay server.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task. `server_keys` are the
    /// environment-held fallback credentials, already filtered of blanks.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the TCP
    /// listener cannot bind.
    pub async fn start(
        config: &RelayConfig,
        temperature: f64,
        server_keys: Vec<String>,
    ) -> crate::error::Result<Self> {
        let resolver = CompletionResolver::new(
            config.upstream_url.clone(),
            temperature,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        let state = AppState {
            resolver: Arc::new(resolver),
            server_keys: Arc::new(server_keys),
        };

        let app = Router::new()
            .route("/chat", post(handle_chat))
            .with_state(state);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AssistError::Transport(format!("relay bind failed: {e}")))?;

        let addr = listener
            .local_addr()
            .map_err(|e| AssistError::Transport(format!("failed to get local addr: {e}")))?;

        info!("chat relay listening on http://{addr}/chat");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("relay server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `POST /chat`: forward a conversation to the upstream API with key fallback.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    let request_id = Uuid::new_v4();
    let mut keys = request.caller_keys();
    let caller_count = keys.len();
    keys.extend(state.server_keys.iter().cloned());

    info!(
        %request_id,
        model = request.model.as_str(),
        caller_keys = caller_count,
        server_keys = state.server_keys.len(),
        turns = request.messages.len(),
        "relay request"
    );

    if keys.is_empty() {
        warn!(%request_id, "no API keys available");
        return error_response(&AssistError::NoKeysConfigured);
    }

    match state
        .resolver
        .resolve(&request.model, &request.messages, &keys)
        .await
    {
        Ok(payload) => {
            info!(%request_id, "relay request succeeded");
            (axum::http::StatusCode::OK, Json(payload))
        }
        Err(err) => {
            warn!(%request_id, error = %err, "relay request failed");
            error_response(&err)
        }
    }
}

/// Map a failure onto its HTTP status and fixed explanatory body.
fn error_response(err: &AssistError) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    let (status, message) = match err {
        AssistError::NoKeysConfigured => (
            axum::http::StatusCode::UNAUTHORIZED,
            NO_KEYS_MESSAGE.to_owned(),
        ),
        AssistError::Unauthorized(_) => (
            axum::http::StatusCode::UNAUTHORIZED,
            AUTH_FAILED_MESSAGE.to_owned(),
        ),
        AssistError::RateLimited(_) => (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            RATE_LIMITED_MESSAGE.to_owned(),
        ),
        AssistError::Transport(detail) => {
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, detail.clone())
        }
        other => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {other}"),
        ),
    };
    let body = serde_json::to_value(RelayError { error: message }).unwrap_or_default();
    (status, Json(body))
}
