//! Context injection and request assembly.
//!
//! This module provides:
//! - Trigger-keyword detection on user utterances
//! - The prediction preamble prepended to matching utterances
//! - Assembly of the ordered message list sent to the chat backend

use neurochat_provider::{BackendMessage, BackendRole, ChatRequest};
use neurochat_schema::{PredictionLabel, Transcript};
use serde::{Deserialize, Serialize};

/// Phrases that make an utterance a question about the user's own result.
/// Stored lowercase; matching is case-insensitive substring search.
pub const TRIGGER_KEYWORDS: [&str; 4] = ["stage", "my alzheimer", "which stage", "how severe"];

/// Whether `utterance` contains any trigger keyword.
pub fn matches_trigger(utterance: &str) -> bool {
    let lowered = utterance.to_lowercase();
    TRIGGER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

pub fn prediction_preamble(label: &PredictionLabel) -> String {
    format!("Based on the MRI image you uploaded earlier, the model predicted: `{label}`.\n\n")
}

/// Text of the head entry for `utterance`.
///
/// The preamble is added only when a trigger keyword matches and a
/// prediction is stored.
pub fn contextualize(utterance: &str, prediction: Option<&PredictionLabel>) -> String {
    match prediction {
        Some(label) if matches_trigger(utterance) => {
            format!("{}{utterance}", prediction_preamble(label))
        }
        _ => utterance.to_string(),
    }
}

/// How the transcript is replayed after the head entry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryReplay {
    /// Replay every turn except the utterance already sent as the head.
    #[default]
    Deduplicated,
    /// Replay the whole transcript, so the newest utterance appears twice.
    Verbatim,
}

/// Builds the outbound request for the newest user turn.
///
/// `transcript` must already end with the user turn for `utterance`.
pub fn build_request(
    utterance: &str,
    transcript: &Transcript,
    prediction: Option<&PredictionLabel>,
    replay: HistoryReplay,
) -> ChatRequest {
    let turns = transcript.turns();
    let history = match replay {
        HistoryReplay::Verbatim => turns,
        HistoryReplay::Deduplicated => &turns[..turns.len().saturating_sub(1)],
    };

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(BackendMessage::user(contextualize(utterance, prediction)));
    messages.extend(
        history
            .iter()
            .map(|turn| BackendMessage::new(BackendRole::from(turn.role()), turn.content())),
    );
    ChatRequest::new(messages)
}
