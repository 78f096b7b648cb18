use std::sync::Arc;

use tracing::{debug, error};

use crate::error::AnalysisError;
use crate::session::{ChatSession, SessionId};
use crate::state::ChatMessage;

pub const EMPTY_REPLY_FALLBACK: &str = "I'm sorry, I couldn't process that.";
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error. Please try again.";
pub const RESET_GREETING: &str = "Hello! How can I help?";

pub fn greeting(company_name: &str) -> String {
    format!(
        "Hello! I'm your AI Sales Agent for {}. How can I help you today?",
        company_name
    )
}

/// A send that has been recorded in the transcript and awaits its reply
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub session: Arc<ChatSession>,
    pub message: String,
}

/// Transcript and input state for testing a generated persona
#[derive(Debug, Default)]
pub struct ChatPlayground {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub cursor: usize, // cursor position in input (chars)
    pub is_typing: bool,
    pub scroll: u16,
    session: Option<Arc<ChatSession>>,
    company_name: String,
}

impl ChatPlayground {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id())
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    /// Bind to the current session; the transcript restarts with a greeting
    /// whenever the session or company name changes.
    pub fn sync(&mut self, session: Option<&Arc<ChatSession>>, company_name: &str) {
        let new_id = session.map(|s| s.id());
        if new_id == self.session_id() && company_name == self.company_name {
            return;
        }

        self.session = session.cloned();
        self.company_name = company_name.to_string();
        self.is_typing = false;
        self.scroll = 0;
        self.messages = if self.session.is_some() {
            vec![ChatMessage::model(greeting(company_name))]
        } else {
            Vec::new()
        };
        debug!(session = ?new_id, company = company_name, "Chat transcript reset");
    }

    /// Manual reset from the chat header
    pub fn reset(&mut self) {
        self.messages = vec![ChatMessage::model(RESET_GREETING)];
        self.scroll = 0;
    }

    pub fn can_send(&self) -> bool {
        !self.input.trim().is_empty() && !self.is_typing && self.session.is_some()
    }

    /// Record the user's message and hand back what needs to be sent
    pub fn begin_send(&mut self) -> Option<PendingSend> {
        if !self.can_send() {
            return None;
        }
        let session = self.session.clone()?;

        let message = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.messages.push(ChatMessage::user(message.clone()));
        self.is_typing = true;

        Some(PendingSend { session, message })
    }

    /// Append the reply for a send started on `session`.
    /// Replies for a session that has since been replaced are dropped.
    pub fn finish_send(&mut self, session: SessionId, result: Result<String, AnalysisError>) {
        if self.session_id() != Some(session) {
            debug!(?session, "Dropping reply for a replaced chat session");
            return;
        }

        let content = match result {
            Ok(text) if text.trim().is_empty() => EMPTY_REPLY_FALLBACK.to_string(),
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Chat error");
                CONNECTION_ERROR_MESSAGE.to_string()
            }
        };
        self.messages.push(ChatMessage::model(content));
        self.is_typing = false;
    }

    /// Send the current input and wait for the reply
    pub async fn send(&mut self) {
        if let Some(pending) = self.begin_send() {
            let result = pending.session.send_message(&pending.message).await;
            self.finish_send(pending.session.id(), result);
        }
    }
}
