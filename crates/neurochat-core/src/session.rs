use chrono::{DateTime, Utc};
use neurochat_schema::{PredictionLabel, Transcript, Turn};
use uuid::Uuid;

/// Everything a single interactive session remembers.
///
/// Created empty when the session starts and dropped when it ends; nothing
/// here outlives the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: Uuid,
    started_at: DateTime<Utc>,
    transcript: Transcript,
    prediction: Option<PredictionLabel>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let state = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            transcript: Transcript::new(),
            prediction: None,
        };
        tracing::debug!(session_id = %state.id, "session started");
        state
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn prediction(&self) -> Option<&PredictionLabel> {
        self.prediction.as_ref()
    }

    /// Single slot: a new prediction replaces the previous one.
    pub fn set_prediction(&mut self, label: PredictionLabel) {
        self.prediction = Some(label);
    }

    pub fn append(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }

    /// Tears the session down, returning the final transcript.
    pub fn end(self) -> Transcript {
        let elapsed = Utc::now() - self.started_at;
        tracing::info!(
            session_id = %self.id,
            turns = self.transcript.len(),
            had_prediction = self.prediction.is_some(),
            duration_secs = elapsed.num_seconds(),
            "session ended"
        );
        self.transcript
    }
}
