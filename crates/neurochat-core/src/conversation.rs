use std::sync::Arc;

use neurochat_provider::{ChatBackend, ChatRequest};
use neurochat_schema::Turn;

use crate::context::{build_request, matches_trigger, HistoryReplay};
use crate::session::SessionState;

pub const BACKEND_ERROR_PREFIX: &str = "❌ Error from Gemini API: ";

/// Turns user utterances into backend requests and records both sides of
/// the exchange in the session transcript.
pub struct ConversationManager {
    backend: Arc<dyn ChatBackend>,
    replay: HistoryReplay,
}

impl ConversationManager {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            replay: HistoryReplay::default(),
        }
    }

    pub fn with_history_replay(mut self, replay: HistoryReplay) -> Self {
        self.replay = replay;
        self
    }

    pub fn history_replay(&self) -> HistoryReplay {
        self.replay
    }

    /// Handles one user turn.
    ///
    /// Appends exactly one user turn and one bot turn to the transcript.
    /// Backend failures become the bot turn's text and are not returned.
    /// Returns the request that was sent.
    pub async fn handle_user_turn(
        &self,
        utterance: &str,
        session: &mut SessionState,
    ) -> ChatRequest {
        session.append(Turn::user(utterance));

        let request = build_request(
            utterance,
            session.transcript(),
            session.prediction(),
            self.replay,
        );
        tracing::info!(
            session_id = %session.id(),
            messages = request.len(),
            injected = session.prediction().is_some() && matches_trigger(utterance),
            "forwarding user turn to chat backend"
        );

        let reply = match self.backend.generate(request.clone()).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    retryable = e.is_retryable(),
                    "chat backend failed: {e}"
                );
                format!("{BACKEND_ERROR_PREFIX}{e}")
            }
        };

        session.append(Turn::bot(reply));
        request
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use neurochat_provider::{BackendMessage, ChatError};
    use neurochat_schema::{PredictionLabel, Role};

    use super::*;
    use crate::explanation::record_prediction;

    /// Records every request and answers with a fixed reply.
    #[derive(Default)]
    struct RecordingProvider {
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ChatBackend for RecordingProvider {
        async fn generate(&self, request: ChatRequest) -> Result<String, ChatError> {
            self.requests.lock().unwrap().push(request);
            Ok("noted".into())
        }
    }

    struct FailProvider;

    #[async_trait]
    impl ChatBackend for FailProvider {
        async fn generate(&self, _request: ChatRequest) -> Result<String, ChatError> {
            Err(ChatError::Api {
                status: 403,
                message: "API key not valid".into(),
            })
        }
    }

    #[tokio::test]
    async fn hi_without_prediction_sends_single_entry() {
        let provider = Arc::new(RecordingProvider::default());
        let manager = ConversationManager::new(provider.clone());
        let mut session = SessionState::new();

        let req = manager.handle_user_turn("hi", &mut session).await;

        assert_eq!(req.messages, vec![BackendMessage::user("hi")]);
        assert_eq!(provider.requests.lock().unwrap().len(), 1);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript().turns()[1].content(), "noted");
    }

    #[tokio::test]
    async fn stage_question_injects_stored_prediction() {
        let manager = ConversationManager::new(Arc::new(RecordingProvider::default()));
        let mut session = SessionState::new();
        session.set_prediction(PredictionLabel::MildDemented);

        let req = manager.handle_user_turn("which stage am I?", &mut session).await;

        assert_eq!(
            req.head().map(|m| m.text()).as_deref(),
            Some("Based on the MRI image you uploaded earlier, the model predicted: `MildDemented`.\n\nwhich stage am I?")
        );
        // The transcript keeps the utterance as typed.
        assert_eq!(session.transcript().turns()[0].content(), "which stage am I?");
    }

    #[tokio::test]
    async fn failure_becomes_bot_turn() {
        let manager = ConversationManager::new(Arc::new(FailProvider));
        let mut session = SessionState::new();

        manager.handle_user_turn("hello", &mut session).await;

        assert_eq!(session.transcript().len(), 2);
        let last = session.transcript().last().unwrap();
        assert_eq!(last.role(), Role::Bot);
        assert!(last.content().starts_with(BACKEND_ERROR_PREFIX));
        assert!(last.content().contains("API key not valid"));
    }

    #[tokio::test]
    async fn transcript_grows_by_two_per_turn() {
        let manager = ConversationManager::new(Arc::new(RecordingProvider::default()));
        let failing = ConversationManager::new(Arc::new(FailProvider));
        let mut session = SessionState::new();
        record_prediction(&mut session, PredictionLabel::NonDemented);

        for (i, text) in ["a", "how severe?", "b"].iter().enumerate() {
            let before = session.transcript().len();
            if i % 2 == 0 {
                manager.handle_user_turn(text, &mut session).await;
            } else {
                failing.handle_user_turn(text, &mut session).await;
            }
            assert_eq!(session.transcript().len(), before + 2);
        }
    }

    #[tokio::test]
    async fn later_turns_replay_prior_history() {
        let provider = Arc::new(RecordingProvider::default());
        let manager = ConversationManager::new(provider.clone());
        let mut session = SessionState::new();

        manager.handle_user_turn("first", &mut session).await;
        let req = manager.handle_user_turn("second", &mut session).await;

        assert_eq!(
            req.messages,
            vec![
                BackendMessage::user("second"),
                BackendMessage::user("first"),
                BackendMessage::model("noted"),
            ]
        );
    }

    #[tokio::test]
    async fn verbatim_replay_duplicates_newest_utterance() {
        let manager = ConversationManager::new(Arc::new(RecordingProvider::default()))
            .with_history_replay(HistoryReplay::Verbatim);
        let mut session = SessionState::new();

        let req = manager.handle_user_turn("hi", &mut session).await;

        assert_eq!(
            req.messages,
            vec![BackendMessage::user("hi"), BackendMessage::user("hi")]
        );
    }
}
