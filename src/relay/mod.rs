//! Chat relay between the assistant front end and the upstream model API.
//!
//! The relay has three parts:
//!
//! - [`api`]: the wire types shared by the service and its clients
//! - [`resolver`]: sequential API key fallback against the upstream service
//! - [`server`]: the local HTTP endpoint that front ends talk to
//!
//! Callers may attach their own API keys to a request; those are tried
//! before the server's environment-held fallbacks, in order, until one
//! yields a usable completion.

pub mod api;
pub mod resolver;
pub mod server;

pub use api::{ChatMessage, ChatRequest, RelayError, completion_content};
pub use resolver::CompletionResolver;
pub use server::RelayServer;
