//! Voice capture adapter.
//!
//! Wraps a [`RecognitionEngine`] behind an `{Idle, Listening}` state
//! machine. The engine reports asynchronously through a cloneable
//! [`RecognitionSink`]; every signal carries the session number it belongs
//! to, and signals from a cancelled session are discarded, so stopping the
//! adapter guarantees no residual events fire. A host without any
//! speech-to-text capability is modelled by constructing the adapter with
//! no engine: starting then reports a failure event instead of panicking.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::warn;

use crate::error::Result;

/// Failure reason reported when no recognition engine is available.
const UNSUPPORTED_REASON: &str = "Speech recognition not supported";

/// Failure reason reported when the engine refuses to start a session.
const START_FAILED_REASON: &str = "Error starting speech recognition";

/// Signal sent by a recognition engine while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionSignal {
    /// Platform capture actually began.
    Started,
    /// A final transcript was produced.
    Transcript(String),
    /// Recognition failed with a human-readable reason.
    Failed(String),
    /// The session terminated, with or without a transcript.
    Ended,
}

/// Session-tagged sender handed to the engine for one capture session.
///
/// Clones may be moved into worker threads; sends after the session was
/// cancelled are silently discarded by the adapter.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    tx: Sender<(u64, RecognitionSignal)>,
    session: u64,
}

impl RecognitionSink {
    pub fn started(&self) {
        self.send(RecognitionSignal::Started);
    }

    pub fn transcript(&self, text: impl Into<String>) {
        self.send(RecognitionSignal::Transcript(text.into()));
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.send(RecognitionSignal::Failed(reason.into()));
    }

    pub fn ended(&self) {
        self.send(RecognitionSignal::Ended);
    }

    fn send(&self, signal: RecognitionSignal) {
        let _ = self.tx.send((self.session, signal));
    }
}

/// Platform seam for speech-to-text.
///
/// `start` begins one capture session and must eventually report
/// [`RecognitionSignal::Ended`] through the sink, after any transcript or
/// failure signal. `cancel` tears down the active session; signals it emits
/// afterwards are ignored by the adapter.
pub trait RecognitionEngine: Send {
    /// Begin a capture session, reporting through `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform session cannot be started.
    fn start(&mut self, language: &str, sink: RecognitionSink) -> Result<()>;

    /// Cancel the active session, if any.
    fn cancel(&mut self);
}

/// Event produced by [`VoiceInput::poll_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceInputEvent {
    /// Capture began; the UI can show a listening indicator.
    Started,
    /// A final transcript arrived.
    Transcript(String),
    /// Recognition failed with a human-readable reason.
    Failed(String),
    /// The capture session ended and the adapter is idle again.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenState {
    Idle,
    Listening,
}

/// Voice capture adapter over an optional [`RecognitionEngine`].
pub struct VoiceInput {
    engine: Option<Box<dyn RecognitionEngine>>,
    state: ListenState,
    language: String,
    session: u64,
    signal_tx: Sender<(u64, RecognitionSignal)>,
    signal_rx: Receiver<(u64, RecognitionSignal)>,
    pending: VecDeque<VoiceInputEvent>,
}

impl VoiceInput {
    /// Build an adapter over `engine`; `None` models a host without
    /// speech-to-text.
    #[must_use]
    pub fn new(engine: Option<Box<dyn RecognitionEngine>>) -> Self {
        let (signal_tx, signal_rx) = unbounded();
        Self {
            engine,
            state: ListenState::Idle,
            language: "en-US".to_owned(),
            session: 0,
            signal_tx,
            signal_rx,
            pending: VecDeque::new(),
        }
    }

    /// An adapter with no capture capability.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn with_engine(engine: impl RecognitionEngine + 'static) -> Self {
        Self::new(Some(Box::new(engine)))
    }

    /// Begin a capture session.
    ///
    /// Returns `true` if a session is (now) running. With no engine, or if
    /// the engine refuses to start, a [`VoiceInputEvent::Failed`] is queued
    /// and the adapter stays idle. Calling while already listening is a
    /// tolerated no-op.
    pub fn start_listening(&mut self) -> bool {
        if self.state == ListenState::Listening {
            return true;
        }

        self.session += 1;
        let sink = RecognitionSink {
            tx: self.signal_tx.clone(),
            session: self.session,
        };

        let Some(engine) = self.engine.as_mut() else {
            warn!("speech recognition not available on this host");
            self.pending
                .push_back(VoiceInputEvent::Failed(UNSUPPORTED_REASON.to_owned()));
            return false;
        };

        match engine.start(&self.language, sink) {
            Ok(()) => {
                self.state = ListenState::Listening;
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to start speech recognition");
                // Orphan the sink handed to the failed start.
                self.session += 1;
                self.pending
                    .push_back(VoiceInputEvent::Failed(START_FAILED_REASON.to_owned()));
                false
            }
        }
    }

    /// Force the adapter idle and cancel any platform session.
    ///
    /// Safe to call repeatedly; a [`VoiceInputEvent::Stopped`] is queued
    /// only when a session was actually running. Signals still in flight
    /// from the cancelled session are discarded.
    pub fn stop_listening(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
        // Outstanding signals carry the old session number and are dropped.
        self.session += 1;
        if self.state == ListenState::Listening {
            self.state = ListenState::Idle;
            self.pending.push_back(VoiceInputEvent::Stopped);
        }
    }

    /// Start or stop depending on the current state.
    ///
    /// Returns `true` if the adapter is listening afterwards.
    pub fn toggle_listening(&mut self) -> bool {
        if self.state == ListenState::Listening {
            self.stop_listening();
            false
        } else {
            self.start_listening()
        }
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == ListenState::Listening
    }

    /// Set the recognition language for subsequent sessions.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Drain pending events, applying state transitions as they surface.
    ///
    /// A transcript or failure is followed by the engine's `Ended` signal,
    /// which returns the adapter to idle and surfaces as
    /// [`VoiceInputEvent::Stopped`].
    pub fn poll_events(&mut self) -> Vec<VoiceInputEvent> {
        let mut events: Vec<VoiceInputEvent> = self.pending.drain(..).collect();

        while let Ok((session, signal)) = self.signal_rx.try_recv() {
            if session != self.session {
                continue;
            }
            match signal {
                RecognitionSignal::Started => events.push(VoiceInputEvent::Started),
                RecognitionSignal::Transcript(text) => {
                    events.push(VoiceInputEvent::Transcript(text));
                }
                RecognitionSignal::Failed(reason) => {
                    events.push(VoiceInputEvent::Failed(reason));
                }
                RecognitionSignal::Ended => {
                    if self.state == ListenState::Listening {
                        self.state = ListenState::Idle;
                        events.push(VoiceInputEvent::Stopped);
                    }
                }
            }
        }

        events
    }
}
