//! Speech synthesis through the host's speech binary.
//!
//! Discovers `say`, `spd-say`, or `espeak` on `PATH` and speaks by spawning
//! the binary once per utterance. A waiter thread polls the child and
//! reports the outcome through the utterance's completion channel; killing
//! the child (cancel) simply ends the utterance. Hosts with none of these
//! binaries get no engine, which the output adapter treats as a platform
//! without text-to-speech.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::info;

use crate::error::{AssistError, Result};
use crate::speech::output::{SynthesisEngine, SynthesisOutcome, VoiceChoice};

/// Speech binaries probed in order.
const SPEECH_BINARIES: &[&str] = &["say", "spd-say", "espeak"];

/// Baseline words-per-minute the rate multiplier scales.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// How often the waiter thread checks the child for exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// In-flight utterance: the child process tagged with its utterance number.
struct Utterance {
    id: u64,
    child: Child,
}

/// [`SynthesisEngine`] backed by a host speech binary.
pub struct SystemSynthesis {
    binary: PathBuf,
    next_id: u64,
    current: Arc<Mutex<Option<Utterance>>>,
    voice_cache: Mutex<Option<Vec<String>>>,
}

impl SystemSynthesis {
    /// Find a usable speech binary on this host.
    ///
    /// Returns `None` when no known binary is on `PATH`.
    #[must_use]
    pub fn discover() -> Option<Self> {
        for name in SPEECH_BINARIES {
            if let Ok(path) = which::which(name) {
                info!(binary = %path.display(), "using system speech synthesis");
                return Some(Self::with_binary(path));
            }
        }
        info!("no system speech binary found, speech output disabled");
        None
    }

    fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            next_id: 0,
            current: Arc::new(Mutex::new(None)),
            voice_cache: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn binary_name(&self) -> String {
        self.binary
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Voice names, listed once from the binary and cached.
    ///
    /// Only `say` supports listing; the other engines speak with their
    /// default voice and report an empty list.
    fn voice_names(&self) -> Vec<String> {
        if let Ok(mut cache) = self.voice_cache.lock() {
            if let Some(names) = cache.as_ref() {
                return names.clone();
            }
            let names = list_voices(&self.binary, &self.binary_name());
            *cache = Some(names.clone());
            return names;
        }
        Vec::new()
    }
}

impl SynthesisEngine for SystemSynthesis {
    fn voices(&self) -> Vec<String> {
        self.voice_names()
    }

    fn speak(
        &mut self,
        text: &str,
        voice: &VoiceChoice,
        rate: f32,
        done: Sender<SynthesisOutcome>,
    ) -> Result<()> {
        self.cancel();

        let voice_name = match voice {
            VoiceChoice::Default => None,
            VoiceChoice::Index(index) => self.voice_names().get(*index).cloned(),
        };

        let args = synthesis_args(&self.binary_name(), text, voice_name.as_deref(), rate);
        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                AssistError::Speech(format!(
                    "failed to spawn {}: {e}",
                    self.binary.display()
                ))
            })?;

        self.next_id += 1;
        let id = self.next_id;
        {
            let mut guard = self
                .current
                .lock()
                .map_err(|_| AssistError::Speech("speech engine state poisoned".to_owned()))?;
            *guard = Some(Utterance { id, child });
        }

        let slot = Arc::clone(&self.current);
        std::thread::spawn(move || wait_for_exit(&slot, id, &done));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Ok(mut guard) = self.current.lock() {
            if let Some(mut utterance) = guard.take() {
                let _ = utterance.child.kill();
                let _ = utterance.child.wait();
            }
        }
    }
}

impl Drop for SystemSynthesis {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Waiter thread
// ---------------------------------------------------------------------------

/// Poll the utterance slot until child `id` exits, then report the outcome.
///
/// Exits quietly when the slot no longer holds utterance `id` (cancelled or
/// replaced); dropping `done` is how the adapter learns the utterance is
/// over in that case.
fn wait_for_exit(slot: &Arc<Mutex<Option<Utterance>>>, id: u64, done: &Sender<SynthesisOutcome>) {
    loop {
        let status = {
            let mut guard = match slot.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            match guard.as_mut() {
                Some(utterance) if utterance.id == id => match utterance.child.try_wait() {
                    Ok(Some(status)) => {
                        guard.take();
                        Some(status)
                    }
                    Ok(None) => None,
                    Err(e) => {
                        guard.take();
                        let _ = done.send(SynthesisOutcome::Failed(format!(
                            "waiting for speech process failed: {e}"
                        )));
                        return;
                    }
                },
                _ => return,
            }
        };

        match status {
            Some(status) if status.success() => {
                let _ = done.send(SynthesisOutcome::Finished);
                return;
            }
            Some(status) => {
                let _ = done.send(SynthesisOutcome::Failed(format!(
                    "speech process exited with {status}"
                )));
                return;
            }
            None => std::thread::sleep(EXIT_POLL_INTERVAL),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-binary argument mapping
// ---------------------------------------------------------------------------

/// Build the argument list for one utterance.
///
/// The rate multiplier maps onto each binary's own rate scale: words per
/// minute for `say` and `espeak`, a signed percentage for `spd-say`.
/// `spd-say` also gets `-w` so the process lives as long as the utterance.
fn synthesis_args(binary_name: &str, text: &str, voice: Option<&str>, rate: f32) -> Vec<String> {
    let mut args = Vec::new();
    match binary_name {
        "say" => {
            if let Some(name) = voice {
                args.push("-v".to_owned());
                args.push(name.to_owned());
            }
            args.push("-r".to_owned());
            args.push(words_per_minute(rate).to_string());
        }
        "spd-say" => {
            args.push("-w".to_owned());
            args.push("-r".to_owned());
            args.push(rate_percent(rate).to_string());
            if let Some(name) = voice {
                args.push("-y".to_owned());
                args.push(name.to_owned());
            }
        }
        "espeak" => {
            if let Some(name) = voice {
                args.push("-v".to_owned());
                args.push(name.to_owned());
            }
            args.push("-s".to_owned());
            args.push(words_per_minute(rate).to_string());
        }
        _ => {}
    }
    args.push(text.to_owned());
    args
}

fn words_per_minute(rate: f32) -> i64 {
    (rate * BASE_WORDS_PER_MINUTE).round() as i64
}

/// Map a multiplier onto spd-say's `-100..=100` rate scale.
fn rate_percent(rate: f32) -> i64 {
    (((rate - 1.0) * 100.0).round() as i64).clamp(-100, 100)
}

/// List voice names from the binary, first column per line.
fn list_voices(binary: &Path, binary_name: &str) -> Vec<String> {
    if binary_name != "say" {
        return Vec::new();
    }
    let output = match Command::new(binary).args(["-v", "?"]).output() {
        Ok(output) => output,
        Err(_) => return Vec::new(),
    };
    parse_voice_listing(&String::from_utf8_lossy(&output.stdout))
}

fn parse_voice_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn say_args_carry_voice_and_wpm() {
        let args = synthesis_args("say", "hello there", Some("Daniel"), 1.2);
        assert_eq!(args, vec!["-v", "Daniel", "-r", "210", "hello there"]);
    }

    #[test]
    fn say_args_without_voice() {
        let args = synthesis_args("say", "hi", None, 1.0);
        assert_eq!(args, vec!["-r", "175", "hi"]);
    }

    #[test]
    fn spd_say_waits_and_uses_percent_rate() {
        let args = synthesis_args("spd-say", "hi", None, 1.5);
        assert_eq!(args, vec!["-w", "-r", "50", "hi"]);
    }

    #[test]
    fn espeak_uses_wpm_rate() {
        let args = synthesis_args("espeak", "hi", None, 0.8);
        assert_eq!(args, vec!["-s", "140", "hi"]);
    }

    #[test]
    fn unknown_binary_gets_text_only() {
        let args = synthesis_args("festival", "hi", Some("Anna"), 2.0);
        assert_eq!(args, vec!["hi"]);
    }

    #[test]
    fn rate_percent_is_clamped() {
        assert_eq!(rate_percent(1.0), 0);
        assert_eq!(rate_percent(0.8), -20);
        assert_eq!(rate_percent(5.0), 100);
        assert_eq!(rate_percent(0.0), -100);
    }

    #[test]
    fn voice_listing_takes_first_column() {
        let listing = "Alex                en_US    # Most people recognize me.\n\
                       Amelie              fr_CA    # Bonjour.\n";
        assert_eq!(parse_voice_listing(listing), vec!["Alex", "Amelie"]);
    }

    #[test]
    fn empty_listing_yields_no_voices() {
        assert!(parse_voice_listing("").is_empty());
    }

    #[test]
    fn discovery_never_panics() {
        let _ = SystemSynthesis::discover();
    }
}
