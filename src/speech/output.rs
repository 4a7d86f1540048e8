//! Speech output adapter.
//!
//! Wraps a [`SynthesisEngine`] behind an `{Idle, Speaking}` state machine
//! with a selected voice and a rate multiplier. Each utterance gets its own
//! completion channel; the engine's worker reports through it, and
//! [`SpeechOutput::poll_signal`] translates completions into
//! [`SpeechSignal`]s for the controller. Replacing or cancelling an
//! utterance drops its channel, so late reports from a killed worker are
//! ignored. With no engine every operation is a no-op that reports failure
//! instead of panicking.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tracing::warn;

use crate::error::Result;

/// Rate presets offered by front ends; any positive rate is accepted.
pub const SPEED_PRESETS: [f32; 4] = [0.8, 1.0, 1.2, 1.5];

/// Signal surfaced to the controller for visualizer/status lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechSignal {
    SpeakStarted,
    SpeakEnded,
}

/// Terminal report from a synthesis engine for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// The utterance played to completion.
    Finished,
    /// The utterance failed mid-way.
    Failed(String),
}

/// Voice selection: the engine's default or an index into its voice list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceChoice {
    Default,
    Index(usize),
}

/// Platform seam for text-to-speech.
///
/// `speak` starts one utterance and must report exactly one
/// [`SynthesisOutcome`] through `done` (dropping the sender counts as an
/// end). `cancel` kills the in-flight utterance, if any.
pub trait SynthesisEngine: Send {
    /// Names of the voices this engine can speak with.
    fn voices(&self) -> Vec<String>;

    /// Start speaking `text`, reporting completion through `done`.
    ///
    /// # Errors
    ///
    /// Returns an error if the utterance cannot be started.
    fn speak(
        &mut self,
        text: &str,
        voice: &VoiceChoice,
        rate: f32,
        done: Sender<SynthesisOutcome>,
    ) -> Result<()>;

    /// Kill the in-flight utterance, if any.
    fn cancel(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeakState {
    Idle,
    Speaking,
}

/// Speech output adapter over an optional [`SynthesisEngine`].
pub struct SpeechOutput {
    engine: Option<Box<dyn SynthesisEngine>>,
    state: SpeakState,
    voice: VoiceChoice,
    rate: f32,
    current: Option<Receiver<SynthesisOutcome>>,
    pending: VecDeque<SpeechSignal>,
}

impl SpeechOutput {
    /// Build an adapter over `engine`; `None` models a host without
    /// text-to-speech.
    #[must_use]
    pub fn new(engine: Option<Box<dyn SynthesisEngine>>) -> Self {
        Self {
            engine,
            state: SpeakState::Idle,
            voice: VoiceChoice::Default,
            rate: 1.0,
            current: None,
            pending: VecDeque::new(),
        }
    }

    /// An adapter with no speech capability.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn with_engine(engine: impl SynthesisEngine + 'static) -> Self {
        Self::new(Some(Box::new(engine)))
    }

    /// Speak `text`, cancelling any in-flight utterance first.
    ///
    /// Queues [`SpeechSignal::SpeakStarted`] and returns `true` when the
    /// utterance started; returns `false` with no engine or if the engine
    /// refuses to start.
    pub fn speak(&mut self, text: &str) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        if self.state == SpeakState::Speaking {
            engine.cancel();
            self.current = None;
        }

        let (done_tx, done_rx) = unbounded();
        match engine.speak(text, &self.voice, self.rate, done_tx) {
            Ok(()) => {
                self.current = Some(done_rx);
                self.state = SpeakState::Speaking;
                self.pending.push_back(SpeechSignal::SpeakStarted);
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to start speech synthesis");
                self.state = SpeakState::Idle;
                false
            }
        }
    }

    /// Force idle, killing any in-flight utterance.
    ///
    /// Queues [`SpeechSignal::SpeakEnded`] when something was actually
    /// speaking, so the visualizer stays in lockstep.
    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
        self.current = None;
        if self.state == SpeakState::Speaking {
            self.state = SpeakState::Idle;
            self.pending.push_back(SpeechSignal::SpeakEnded);
        }
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.state == SpeakState::Speaking
    }

    /// Set the rate multiplier; non-positive or non-finite values are
    /// rejected.
    pub fn set_rate(&mut self, rate: f32) -> bool {
        if rate.is_finite() && rate > 0.0 {
            self.rate = rate;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Select a voice; `Index` must point into [`Self::voices`].
    pub fn set_voice(&mut self, choice: VoiceChoice) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            return false;
        };
        match choice {
            VoiceChoice::Default => {
                self.voice = choice;
                true
            }
            VoiceChoice::Index(index) => {
                if index < engine.voices().len() {
                    self.voice = choice;
                    true
                } else {
                    false
                }
            }
        }
    }

    #[must_use]
    pub fn voice(&self) -> VoiceChoice {
        self.voice
    }

    /// Names of the voices available on this host.
    #[must_use]
    pub fn voices(&self) -> Vec<String> {
        self.engine
            .as_ref()
            .map(|engine| engine.voices())
            .unwrap_or_default()
    }

    /// Return the next speech signal, if any.
    ///
    /// Completion reports from the engine are folded in here: a finished,
    /// failed, or vanished utterance surfaces as
    /// [`SpeechSignal::SpeakEnded`] and returns the adapter to idle.
    pub fn poll_signal(&mut self) -> Option<SpeechSignal> {
        if let Some(signal) = self.pending.pop_front() {
            return Some(signal);
        }

        if self.state != SpeakState::Speaking {
            return None;
        }

        let ended = match &self.current {
            Some(rx) => match rx.try_recv() {
                Ok(SynthesisOutcome::Finished) => true,
                Ok(SynthesisOutcome::Failed(reason)) => {
                    warn!(error = reason.as_str(), "speech synthesis failed");
                    true
                }
                Err(TryRecvError::Empty) => false,
                Err(TryRecvError::Disconnected) => true,
            },
            None => true,
        };

        if ended {
            self.current = None;
            self.state = SpeakState::Idle;
            return Some(SpeechSignal::SpeakEnded);
        }
        None
    }
}
