//! P.O.O.J.A terminal front end.
//!
//! Starts the local chat relay, wires the speech adapters, and runs a
//! line-oriented REPL on stdin. Plain lines are sent to the assistant;
//! `/`-prefixed lines are commands (`/help` lists them). While a reply
//! is being spoken the visualizer bars are drawn on the status line.

use std::io::Write as _;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pooja::chat::{ChatController, ChatTurn, RelayClient};
use pooja::config::AssistConfig;
use pooja::credentials::{self, StoredKeys};
use pooja::relay::RelayServer;
use pooja::speech::{
    SPEED_PRESETS, SpeechOutput, SynthesisEngine, SystemSynthesis, VoiceChoice, VoiceInput,
    VoiceInputEvent,
};

/// Redraw cadence for the speaking animation.
const FRAME_INTERVAL: Duration = Duration::from_millis(120);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so stdout stays clean for the conversation.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = AssistConfig::default_config_path();
    let config = if config_path.exists() {
        AssistConfig::from_file(&config_path)?
    } else {
        info!(path = %config_path.display(), "no config file, using defaults");
        AssistConfig::default()
    };

    let store_path = StoredKeys::default_store_path();
    let stored_keys = StoredKeys::load(&store_path)?;
    let server_keys = credentials::env_fallback_keys();

    let server = RelayServer::start(&config.relay, config.llm.temperature, server_keys).await?;

    let mut client = RelayClient::new(
        format!("http://{}/chat", server.addr()),
        Duration::from_secs(config.relay.request_timeout_secs),
    )?;
    // Seed the client directly so startup keys do not count as a save.
    client.set_keys(&stored_keys);

    let speech = build_speech_output(&config);
    let mut voice = VoiceInput::disabled();
    voice.set_language(&config.voice.language);

    let mut controller = ChatController::new(client, speech, &config.llm);

    println!("P.O.O.J.A Mental Health Assistant");
    println!("Type a message, or /help for commands.\n");
    if let Some(turn) = controller.conversation().last() {
        print_assistant(turn);
    }

    let mut reader = tokio::io::BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            info!("stdin closed (EOF)");
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            if !run_command(command, &mut controller, &mut voice, &store_path).await {
                break;
            }
            continue;
        }

        if controller.send_message(input).await.is_some() {
            if let Some(turn) = controller.conversation().last() {
                print_assistant(turn);
            }
            speak_to_completion(&mut controller).await;
        }
    }

    server.shutdown();
    info!("pooja shut down cleanly");
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Handles one `/`-prefixed line. Returns `false` when the REPL should exit.
async fn run_command(
    command: &str,
    controller: &mut ChatController,
    voice: &mut VoiceInput,
    store_path: &std::path::Path,
) -> bool {
    let mut parts = command.split_whitespace();
    match parts.next() {
        Some("quit") | Some("exit") => return false,
        Some("clear") => {
            controller.clear();
            if let Some(turn) = controller.conversation().last() {
                print_assistant(turn);
            }
        }
        Some("voice") => {
            if voice.toggle_listening() {
                println!("Listening. Use /voice again to stop.");
            } else {
                println!("Stopped listening.");
            }
            drain_voice_events(controller, voice).await;
        }
        Some("voices") => {
            let names = controller.speech().voices();
            if names.is_empty() {
                println!("No voices available.");
            } else {
                for (index, name) in names.iter().enumerate() {
                    println!("  {index}: {name}");
                }
            }
        }
        Some("speed") => {
            let requested = parts.next().and_then(|raw| raw.parse::<f32>().ok());
            match requested {
                Some(rate) if controller.speech_mut().set_rate(rate) => {
                    println!("Speech speed set to {rate}.");
                }
                _ => {
                    let presets: Vec<String> =
                        SPEED_PRESETS.iter().map(ToString::to_string).collect();
                    println!("Usage: /speed <rate>, e.g. one of {}", presets.join(", "));
                }
            }
        }
        Some("setkey") => set_key(parts, controller, store_path),
        Some("keys") => println!("{:?}", controller.keys()),
        Some("help") => {
            println!("  /clear            start a fresh conversation");
            println!("  /voice            toggle voice input");
            println!("  /voices           list speech output voices");
            println!("  /speed <rate>     set speech speed");
            println!("  /setkey <slot> [value]  set or clear an API key slot");
            println!("  /keys             show which key slots are set");
            println!("  /quit             exit");
        }
        _ => println!("Unknown command. /help lists the available ones."),
    }
    true
}

/// `/setkey <primary|backup1|backup2> [value]`. An omitted value clears
/// the slot. The updated set is persisted and handed to the controller.
fn set_key<'a>(
    mut parts: impl Iterator<Item = &'a str>,
    controller: &mut ChatController,
    store_path: &std::path::Path,
) {
    let Some(slot) = parts.next() else {
        println!("Usage: /setkey <primary|backup1|backup2> [value]");
        return;
    };
    let value = parts.next().map(str::to_owned);

    let mut keys = controller.keys().clone();
    match slot {
        "primary" => keys.primary = value,
        "backup1" => keys.backup_1 = value,
        "backup2" => keys.backup_2 = value,
        _ => {
            println!("Unknown slot {slot:?}. Use primary, backup1 or backup2.");
            return;
        }
    }

    let keys = keys.normalized();
    if let Err(err) = keys.save_to_file(store_path) {
        warn!(error = %err, "failed to persist API keys");
        println!("Could not save keys to disk; they apply to this session only.");
    }

    let was_seed_only = controller.conversation().is_seed_only();
    controller.set_keys(&keys);
    println!("Key slot {slot} updated.");
    if was_seed_only {
        if let Some(turn) = controller.conversation().last() {
            print_assistant(turn);
        }
    }
}

/// Applies queued voice-input events to the controller.
async fn drain_voice_events(controller: &mut ChatController, voice: &mut VoiceInput) {
    for event in voice.poll_events() {
        match event {
            VoiceInputEvent::Started => controller.voice_started(),
            VoiceInputEvent::Stopped => controller.voice_stopped(),
            VoiceInputEvent::Transcript(text) => {
                println!("You (voice): {text}");
                if controller.handle_transcript(&text).await.is_some() {
                    if let Some(turn) = controller.conversation().last() {
                        print_assistant(turn);
                    }
                    speak_to_completion(controller).await;
                }
            }
            VoiceInputEvent::Failed(reason) => {
                println!("Voice input failed: {reason}");
                controller.recognition_failed();
                if let Some(turn) = controller.conversation().last() {
                    print_assistant(turn);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_assistant(turn: &ChatTurn) {
    println!("[{}] Pooja: {}", turn.timestamp, turn.text);
}

/// Animates the status line until the current utterance finishes.
async fn speak_to_completion(controller: &mut ChatController) {
    let mut drew = false;
    loop {
        controller.pump_speech();
        if !controller.speech().is_speaking() {
            break;
        }
        controller.animate();
        print!(
            "\r  {}  {}",
            render_bars(controller.visualizer().bars()),
            controller.status()
        );
        let _ = std::io::stdout().flush();
        drew = true;
        tokio::time::sleep(FRAME_INTERVAL).await;
    }
    controller.pump_speech();
    if drew {
        print!("\r{:60}\r", "");
        let _ = std::io::stdout().flush();
    }
}

/// One glyph per bar, scaled from the bar heights.
fn render_bars(bars: &[u8]) -> String {
    const RAMP: [char; 5] = ['▁', '▂', '▄', '▆', '█'];
    bars.iter()
        .map(|height| {
            let step = usize::from(height.saturating_sub(5)) / 5;
            RAMP[step.min(RAMP.len() - 1)]
        })
        .collect()
}

fn build_speech_output(config: &AssistConfig) -> SpeechOutput {
    let engine = match SystemSynthesis::discover() {
        Some(engine) => Some(Box::new(engine) as Box<dyn SynthesisEngine>),
        None => {
            warn!("no speech synthesis binary found, replies will not be spoken");
            None
        }
    };
    let mut speech = SpeechOutput::new(engine);

    if !speech.set_rate(config.voice.speed) {
        warn!(speed = config.voice.speed, "ignoring invalid voice speed");
    }
    if config.voice.voice != "default" {
        let position = speech
            .voices()
            .iter()
            .position(|name| name == &config.voice.voice);
        match position {
            Some(index) => {
                speech.set_voice(VoiceChoice::Index(index));
            }
            None => warn!(voice = %config.voice.voice, "configured voice not found"),
        }
    }
    speech
}
