//! Stateful chat session seeded with a generated system instruction.
//!
//! The Gemini API is stateless, so the session keeps the conversation
//! history locally and replays it (together with the system instruction)
//! on every send. Nothing is sent when the session is created.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::ai::{GenerateRequest, GenerativeBackend, Turn};
use crate::error::AnalysisError;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

pub struct ChatSession {
    id: SessionId,
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    system_instruction: String,
    // Locked for the whole round trip; a second sender gets SessionBusy.
    history: Mutex<Vec<Turn>>,
}

impl ChatSession {
    pub(crate) fn new(
        backend: Arc<dyn GenerativeBackend>,
        model: &str,
        system_instruction: &str,
    ) -> Self {
        Self {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            backend,
            model: model.to_string(),
            system_instruction: system_instruction.to_string(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Send one user message and return the model's reply text.
    ///
    /// The exchange is only added to history when the call succeeds with a
    /// non-blank reply; Gemini rejects replayed turns with empty text.
    /// Fails with [`AnalysisError::SessionBusy`] if another send is in flight.
    pub async fn send_message(&self, message: &str) -> Result<String, AnalysisError> {
        let mut history = self.history.try_lock().map_err(|_| {
            warn!(session = self.id.0, "Rejected overlapping chat send");
            AnalysisError::SessionBusy
        })?;

        let mut contents = history.clone();
        contents.push(Turn::user(message));

        debug!(session = self.id.0, turns = contents.len(), "Sending chat message");

        let reply = self
            .backend
            .generate(GenerateRequest {
                model: self.model.clone(),
                system_instruction: Some(self.system_instruction.clone()),
                contents,
                web_search: false,
            })
            .await?;

        if reply.trim().is_empty() {
            warn!(session = self.id.0, "Empty chat reply, exchange not kept in history");
        } else {
            history.push(Turn::user(message));
            history.push(Turn::model(reply.clone()));
        }
        Ok(reply)
    }

    #[cfg(test)]
    async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;
    use crate::state::ChatRole;

    #[tokio::test]
    async fn test_send_replays_history_with_instruction() {
        let backend = Arc::new(ScriptedBackend::new().reply("Hi, I sell rockets").reply("$10"));
        let session = ChatSession::new(backend.clone(), "m", "You sell rockets");

        assert_eq!(session.send_message("hello").await.unwrap(), "Hi, I sell rockets");
        assert_eq!(session.send_message("price?").await.unwrap(), "$10");

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].system_instruction.as_deref(), Some("You sell rockets"));
        assert!(!requests[1].web_search);
        let roles: Vec<ChatRole> = requests[1].contents.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Model, ChatRole::User]);
        assert_eq!(requests[1].contents[2].text, "price?");
        assert_eq!(session.history_len().await, 4);
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history_untouched() {
        let backend = Arc::new(ScriptedBackend::new().fail(AnalysisError::transport("boom")));
        let session = ChatSession::new(backend, "m", "x");

        let err = session.send_message("hello").await.unwrap_err();
        assert_eq!(err, AnalysisError::Transport("boom".into()));
        assert_eq!(session.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_reply_is_not_replayed() {
        let backend = Arc::new(ScriptedBackend::new().reply("").reply("ok"));
        let session = ChatSession::new(backend.clone(), "m", "x");

        assert_eq!(session.send_message("hello").await.unwrap(), "");
        assert_eq!(session.history_len().await, 0);
        assert_eq!(session.send_message("again").await.unwrap(), "ok");

        let requests = backend.requests();
        assert!(requests[1].contents.iter().all(|t| !t.text.is_empty()));
        assert_eq!(requests[1].contents.len(), 1);
        assert_eq!(requests[1].contents[0].text, "again");
        assert_eq!(session.history_len().await, 2);
    }

    #[tokio::test]
    async fn test_overlapping_send_is_rejected() {
        let (backend, gate) = ScriptedBackend::new().reply("first").gated();
        let backend = Arc::new(backend);
        let session = Arc::new(ChatSession::new(backend.clone(), "m", "x"));

        let in_flight = {
            let session = session.clone();
            tokio::spawn(async move { session.send_message("one").await })
        };
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.send_message("two").await, Err(AnalysisError::SessionBusy));

        gate.notify_one();
        assert_eq!(in_flight.await.unwrap().unwrap(), "first");
        assert_eq!(backend.requests().len(), 1);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let backend: Arc<dyn GenerativeBackend> = Arc::new(ScriptedBackend::new());
        let a = ChatSession::new(backend.clone(), "m", "x");
        let b = ChatSession::new(backend, "m", "x");
        assert_ne!(a.id(), b.id());
    }
}
