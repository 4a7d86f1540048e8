//! Voice input, speech output, and the speaking visualizer.
//!
//! Both adapters wrap a platform seam trait so hosts without speech
//! capability degrade to no-ops instead of failing:
//!
//! - [`input`]: `{Idle, Listening}` capture sessions over a
//!   [`RecognitionEngine`]
//! - [`output`]: `{Idle, Speaking}` utterances over a [`SynthesisEngine`]
//! - [`system`]: a synthesis engine backed by the host's speech binary
//! - [`visualizer`]: cosmetic bar animation driven by the speaking state
//!
//! Engines report from their worker threads through channels; owners poll
//! with non-blocking `poll_*` calls, so the adapters never need a runtime.

pub mod input;
pub mod output;
pub mod system;
pub mod visualizer;

pub use input::{RecognitionEngine, RecognitionSink, VoiceInput, VoiceInputEvent};
pub use output::{
    SPEED_PRESETS, SpeechOutput, SpeechSignal, SynthesisEngine, SynthesisOutcome, VoiceChoice,
};
pub use system::SystemSynthesis;
pub use visualizer::Visualizer;
