//! Authored text for the Pooja persona.
//!
//! Everything the assistant says that is not model-generated lives here:
//! the system prompt, the per-message instruction suffix, the seeded
//! greetings, the apology lines, and the keyword-matched comfort replies
//! used when every remote model attempt fails. These strings are product
//! copy; change them deliberately.

use crate::chat::{ChatTurn, Role};
use crate::relay::api::ChatMessage;

/// System prompt sent as the first message of every completion request.
pub const SYSTEM_PROMPT: &str = "Your name is P.O.O.J.A. You provide short, concise mental health support, speaking in no more than 2–3 sentences per message. Mention your name only once—avoid repeating it. Prioritize the user's problems above all. Always refer to yourself as Pooja in your messages, not P.O.O.J.A. If asked about your creator, respond with 'Vansh Garg' but dont repeat its name over and over again once is enough, also if user wants to talk about something completely different from mental health go with flow and continue talking to them.";

/// Instruction suffix appended to each outgoing user message.
pub const MESSAGE_INSTRUCTION: &str = "\n\nPlease respond with only 2-3 concise sentences focused on mental health support. Your name is Pooja (not P.O.O.J.A.) and your creator is Vansh Garg, use no emojis.";

/// Assistant greeting seeded into a fresh conversation.
pub const WELCOME_GREETING: &str =
    "Hi, I'm Pooja. I'm here to support your mental wellbeing. How are you feeling today?";

/// Assistant greeting seeded after the conversation is cleared.
pub const CLEAR_GREETING: &str = "I'm here to support you. How are you feeling now?";

/// Assistant greeting added after API keys are saved into an empty conversation.
pub const SAVED_KEYS_GREETING: &str =
    "I'm here to support your mental wellbeing. How can I help you today?";

/// Reply used when speech recognition fails to produce a transcript.
pub const MISHEARD_REPLY: &str = "I didn't catch that. Could you try again?";

/// Reply used when a voice turn cannot be processed at all.
pub const TROUBLE_REPLY: &str = "I'm having trouble responding right now, but I'm still here to listen. Feel free to continue sharing, and I'll do my best to help.";

/// Reply used when a typed turn cannot be processed at all.
pub const RETRY_REPLY: &str = "I'm having trouble responding. Can we try again?";

/// Comfort reply for greeting messages.
pub const GREETING_REPLY: &str = "Hello! I'm Pooja, your mental health assistant. I'm here to chat with you and provide support. How are you feeling today?";

/// Comfort reply for "how are you" check-ins.
pub const CHECK_IN_REPLY: &str = "I'm here and ready to support you. More importantly, how are you feeling today? Remember, it's okay to not be okay sometimes.";

/// Comfort reply for sadness cues.
pub const SADNESS_REPLY: &str = "I'm sorry to hear you're feeling down. Remember that these feelings are temporary and it's okay to seek support. Would you like to talk about what's troubling you?";

/// Comfort reply for anxiety cues.
pub const ANXIETY_REPLY: &str = "When anxiety hits, try taking slow, deep breaths and focus on the present moment. Remember that you've overcome difficult situations before and you have the strength to handle this too.";

/// Comfort reply when no keyword rule matches.
pub const GENERIC_REPLY: &str = "Thank you for sharing that with me. While I'm currently having trouble connecting to my full capabilities, I'm still here for you. Can you tell me more about how you're feeling?";

/// (rule name, keywords, reply). Rules are evaluated in order; first hit wins.
const COMFORT_TABLE: &[(&str, &[&str], &str)] = &[
    ("greeting", &["hello", "hi", "hey"], GREETING_REPLY),
    ("check-in", &["how are you"], CHECK_IN_REPLY),
    ("sadness", &["sad", "depress", "unhappy"], SADNESS_REPLY),
    ("anxiety", &["anxious", "worry", "stress"], ANXIETY_REPLY),
];

/// Pick a comfort reply for the given user message.
///
/// Matching is a case-insensitive substring scan over [`COMFORT_TABLE`];
/// the first rule with any keyword hit wins. Messages matching no rule get
/// [`GENERIC_REPLY`].
#[must_use]
pub fn comfort_reply(user_text: &str) -> &'static str {
    let lower = user_text.to_lowercase();
    for &(_, keywords, reply) in COMFORT_TABLE {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return reply;
        }
    }
    GENERIC_REPLY
}

/// Append the instruction suffix to a raw user message.
#[must_use]
pub fn decorate_user_message(text: &str) -> String {
    format!("{text}{MESSAGE_INSTRUCTION}")
}

/// Build the completion message list for one user turn.
///
/// Order is fixed: the system prompt, then every prior turn oldest-first,
/// then the new user text with the instruction suffix. Prior turns keep
/// their role except that non-user roles are sent as `assistant`.
#[must_use]
pub fn build_messages(history: &[ChatTurn], user_text: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system".to_owned(),
        content: SYSTEM_PROMPT.to_owned(),
    });
    for turn in history {
        let role = match turn.role {
            Role::User => "user",
            Role::Assistant | Role::System => "assistant",
        };
        messages.push(ChatMessage {
            role: role.to_owned(),
            content: turn.text.clone(),
        });
    }
    messages.push(ChatMessage {
        role: "user".to_owned(),
        content: decorate_user_message(user_text),
    });
    messages
}
