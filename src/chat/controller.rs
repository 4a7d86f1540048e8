//! Conversation orchestration.
//!
//! The controller owns the conversation log, the relay client, the speech
//! output adapter, and the visualizer. Front ends feed it user text (typed
//! or transcribed) and poll it for speech events; prompt assembly, model
//! fallback, canned degradation, reply truncation, and speaking the result
//! all happen in here.

use std::fmt;

use tracing::{info, warn};

use crate::chat::history::Conversation;
use crate::chat::{RelayClient, limit_sentences};
use crate::config::LlmConfig;
use crate::credentials::StoredKeys;
use crate::persona;
use crate::speech::{SpeechOutput, SpeechSignal, Visualizer};

/// Which path produced an assistant reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// The primary model answered through the relay.
    Primary,
    /// The secondary model answered after the primary failed.
    Secondary,
    /// Both models failed; a keyword-matched canned reply was used.
    Canned,
}

/// Assistant activity shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Listening,
    Processing,
    Speaking,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ready => "Ready to assist",
            Status::Listening => "Listening...",
            Status::Processing => "Processing your request...",
            Status::Speaking => "Speaking...",
            Status::Error => "Error occurred",
        })
    }
}

/// Orchestrates the conversation, model fallback, and speech output.
pub struct ChatController {
    conversation: Conversation,
    client: RelayClient,
    speech: SpeechOutput,
    visualizer: Visualizer,
    primary_model: String,
    secondary_model: String,
    status: Status,
}

impl ChatController {
    /// Build a controller over an existing relay client and speech adapter.
    #[must_use]
    pub fn new(client: RelayClient, speech: SpeechOutput, llm: &LlmConfig) -> Self {
        Self {
            conversation: Conversation::new(),
            client,
            speech,
            visualizer: Visualizer::default(),
            primary_model: llm.primary_model.clone(),
            secondary_model: llm.secondary_model.clone(),
            status: Status::Ready,
        }
    }

    /// Send a typed user message and produce an assistant reply.
    ///
    /// Blank input is ignored. Otherwise the user turn is appended, the
    /// primary model is tried through the relay, then the secondary, then a
    /// canned reply keyed off the raw user text. The chosen reply is capped
    /// at three sentences, stored, and spoken. Returns the stored reply text
    /// and the path that produced it.
    pub async fn send_message(&mut self, text: &str) -> Option<(String, ReplySource)> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.status = Status::Processing;
        let request = persona::build_messages(self.conversation.turns(), trimmed);
        self.conversation.push_user(trimmed);

        let (reply, source) = match self
            .client
            .complete(&self.primary_model, request.clone())
            .await
        {
            Ok(reply) => (reply, ReplySource::Primary),
            Err(err) => {
                warn!(
                    model = self.primary_model.as_str(),
                    error = %err,
                    "primary model failed, trying secondary"
                );
                match self.client.complete(&self.secondary_model, request).await {
                    Ok(reply) => (reply, ReplySource::Secondary),
                    Err(err) => {
                        warn!(
                            model = self.secondary_model.as_str(),
                            error = %err,
                            "secondary model failed, using canned reply"
                        );
                        (persona::comfort_reply(trimmed).to_owned(), ReplySource::Canned)
                    }
                }
            }
        };

        let reply = limit_sentences(&reply);
        self.conversation.push_assistant(reply.clone());
        self.speech.speak(&reply);
        self.status = Status::Ready;
        info!(source = ?source, "assistant reply stored");
        Some((reply, source))
    }

    /// Handle a final transcript from the voice input adapter.
    ///
    /// Voice turns follow the same path as typed ones.
    pub async fn handle_transcript(&mut self, transcript: &str) -> Option<(String, ReplySource)> {
        self.send_message(transcript).await
    }

    /// Record that speech recognition failed to produce a transcript.
    pub fn recognition_failed(&mut self) {
        warn!("speech recognition failed");
        self.conversation.push_assistant(persona::MISHEARD_REPLY);
    }

    /// Discard the conversation and reseed the post-clear greeting.
    pub fn clear(&mut self) {
        self.conversation.clear();
        info!("conversation cleared");
    }

    /// Replace the saved keys attached to relay requests.
    ///
    /// When no user turn has happened yet, the seed greeting is refreshed to
    /// acknowledge the new keys.
    pub fn set_keys(&mut self, keys: &StoredKeys) {
        self.client.set_keys(keys);
        if self.conversation.is_seed_only() {
            self.conversation = Conversation::with_greeting(persona::SAVED_KEYS_GREETING);
        }
    }

    /// The saved keys currently attached to relay requests.
    #[must_use]
    pub fn keys(&self) -> &StoredKeys {
        self.client.keys()
    }

    /// Drain pending speech signals, keeping the visualizer and status line
    /// in lockstep with the speaking state.
    pub fn pump_speech(&mut self) {
        while let Some(signal) = self.speech.poll_signal() {
            match signal {
                SpeechSignal::SpeakStarted => {
                    self.visualizer.start();
                    self.status = Status::Speaking;
                }
                SpeechSignal::SpeakEnded => {
                    self.visualizer.stop();
                    self.status = Status::Ready;
                }
            }
        }
    }

    /// Note that a voice capture session began.
    pub fn voice_started(&mut self) {
        self.status = Status::Listening;
    }

    /// Note that the voice capture session ended.
    pub fn voice_stopped(&mut self) {
        if self.status == Status::Listening {
            self.status = Status::Ready;
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn speech(&self) -> &SpeechOutput {
        &self.speech
    }

    pub fn speech_mut(&mut self) -> &mut SpeechOutput {
        &mut self.speech
    }

    #[must_use]
    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    /// Advance the visualizer one animation frame.
    pub fn animate(&mut self) {
        self.visualizer.tick();
    }
}
