//! P.O.O.J.A: voice-enabled mental health chat assistant.
//!
//! This crate provides the pieces of a supportive chat assistant:
//! a local relay that forwards conversations to an upstream model API with
//! sequential API key and model fallback, a conversation controller that
//! degrades to canned supportive replies when every model fails, and
//! speech adapters for voice input and spoken output.
//!
//! # Architecture
//!
//! - **Relay**: `POST /chat` HTTP service; tries caller keys, then
//!   server-held fallbacks, against the upstream completions API
//! - **Chat**: conversation log, relay client, and the controller that
//!   orchestrates prompts, model fallback, truncation, and speech
//! - **Persona**: the assistant's system prompt, greetings, and canned
//!   supportive replies
//! - **Speech**: voice capture and synthesis adapters over platform seam
//!   traits, plus the cosmetic speaking visualizer
//! - **Credentials**: saved key store and environment fallback keys

pub mod chat;
pub mod config;
pub mod credentials;
pub mod error;
pub mod persona;
pub mod relay;
pub mod speech;

pub use chat::{ChatController, ChatTurn, Conversation, RelayClient, ReplySource, Role, Status};
pub use config::AssistConfig;
pub use credentials::StoredKeys;
pub use error::{AssistError, Result};
pub use relay::RelayServer;
pub use speech::{SpeechOutput, SystemSynthesis, VoiceInput, VoiceInputEvent};
