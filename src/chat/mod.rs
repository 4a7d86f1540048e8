//! Conversation management and the assistant reply loop.
//!
//! - [`history`]: chat turns and the greeting-seeded conversation log
//! - [`client`]: HTTP client for the local relay endpoint
//! - [`controller`]: orchestrates sends, model fallback, and speech

pub mod client;
pub mod controller;
pub mod history;

pub use client::RelayClient;
pub use controller::{ChatController, ReplySource, Status};
pub use history::{ChatTurn, Conversation, Role};

/// Cap on sentence-terminated clauses kept from any assistant reply.
const MAX_REPLY_SENTENCES: usize = 3;

/// Truncate a reply to the first [`MAX_REPLY_SENTENCES`] sentences.
///
/// A sentence is a run of text closed by one or more of `.`, `!`, `?`.
/// Replies with three or fewer closed sentences pass through unchanged,
/// including any unterminated tail. Longer replies are cut at the end of
/// the third sentence's closing punctuation run.
pub(crate) fn limit_sentences(text: &str) -> String {
    let mut ends: Vec<usize> = Vec::new();
    let mut body_seen = false;
    let mut run_end: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            if body_seen {
                run_end = Some(i + c.len_utf8());
            }
        } else {
            if let Some(end) = run_end.take() {
                ends.push(end);
                body_seen = false;
            }
            body_seen = true;
        }
    }
    if let Some(end) = run_end {
        ends.push(end);
    }

    if ends.len() > MAX_REPLY_SENTENCES {
        text[..ends[MAX_REPLY_SENTENCES - 1]].trim().to_owned()
    } else {
        text.trim().to_owned()
    }
}
