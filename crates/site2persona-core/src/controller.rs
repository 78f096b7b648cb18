//! Workflow state machine driving the analyze/chat flow.
//!
//! ```text
//! idle --submit--> analyzing --ok--> success
//!                            \-fail-> error
//! success | error --submit--> analyzing
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::service::AnalysisService;
use crate::session::ChatSession;
use crate::state::{CompanyAnalysis, WorkflowPhase};

/// Shown when a failure carries no message of its own
pub const GENERIC_ERROR_MESSAGE: &str =
    "Something went wrong. Please check the URL and try again.";

/// Prefix `https://` unless the input already starts with `http`
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

pub struct Controller {
    service: AnalysisService,
    phase: WorkflowPhase,
    analysis: Option<CompanyAnalysis>,
    chat_session: Option<Arc<ChatSession>>,
    error_message: Option<String>,
}

impl Controller {
    pub fn new(service: AnalysisService) -> Self {
        Self {
            service,
            phase: WorkflowPhase::Idle,
            analysis: None,
            chat_session: None,
            error_message: None,
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn analysis(&self) -> Option<&CompanyAnalysis> {
        self.analysis.as_ref()
    }

    pub fn chat_session(&self) -> Option<&Arc<ChatSession>> {
        self.chat_session.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn service(&self) -> &AnalysisService {
        &self.service
    }

    /// Submit is disabled while a request is running or the input is blank
    pub fn can_submit(&self, url: &str) -> bool {
        self.phase != WorkflowPhase::Analyzing && !url.trim().is_empty()
    }

    /// Enter `analyzing` and return the normalized URL to analyze.
    ///
    /// Clears any previous analysis, chat session and error. Leaves the
    /// state untouched when the input is blank or a request is in flight.
    pub fn submit(&mut self, url: &str) -> Result<String, AnalysisError> {
        if url.trim().is_empty() {
            return Err(AnalysisError::Validation("Please enter a website URL.".to_string()));
        }
        if self.phase == WorkflowPhase::Analyzing {
            return Err(AnalysisError::Validation(
                "An analysis is already in progress.".to_string(),
            ));
        }

        let normalized = normalize_url(url);
        info!(url = %normalized, "Starting analysis");

        self.analysis = None;
        self.chat_session = None;
        self.error_message = None;
        self.phase = WorkflowPhase::Analyzing;

        Ok(normalized)
    }

    /// Apply the outcome of the analysis started by [`Controller::submit`]
    pub fn complete(&mut self, result: Result<CompanyAnalysis, AnalysisError>) {
        if self.phase != WorkflowPhase::Analyzing {
            warn!(phase = ?self.phase, "Ignoring analysis result outside of analyzing phase");
            return;
        }

        match result {
            Ok(analysis) => {
                let session = self
                    .service
                    .create_chat_session(&analysis.generated_system_instruction);
                self.analysis = Some(analysis);
                self.chat_session = Some(session);
                self.phase = WorkflowPhase::Success;
            }
            Err(err) => {
                warn!(error = ?err, "Analysis failed");
                let message = err.to_string();
                self.error_message = Some(if message.trim().is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    message
                });
                self.phase = WorkflowPhase::Error;
            }
        }
    }

    /// Submit, run the analysis and apply its outcome in one step
    pub async fn analyze(&mut self, url: &str) -> Result<(), AnalysisError> {
        let normalized = self.submit(url)?;
        let result = self.service.analyze_website(&normalized).await;
        self.complete(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;
    use crate::error::MALFORMED_OUTPUT_MESSAGE;

    const ACME: &str = r#"{"name":"Acme","description":"d","industry":"Widgets","targetAudience":[],"keySellingPoints":[],"brandTone":"Bold","products":[],"generatedSystemInstruction":"You are the Acme agent."}"#;

    fn controller(backend: ScriptedBackend) -> (Controller, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let service = AnalysisService::new(backend.clone(), "m");
        (Controller::new(service), backend)
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("acme.com"), "https://acme.com");
        assert_eq!(normalize_url("http://acme.com"), "http://acme.com");
        assert_eq!(normalize_url("https://acme.com/about"), "https://acme.com/about");
        assert_eq!(normalize_url("  acme.com "), "https://acme.com");
    }

    #[test]
    fn test_empty_url_stays_idle() {
        let (mut controller, _) = controller(ScriptedBackend::new());
        assert!(matches!(controller.submit(""), Err(AnalysisError::Validation(_))));
        assert!(matches!(controller.submit("   "), Err(AnalysisError::Validation(_))));
        assert_eq!(controller.phase(), WorkflowPhase::Idle);
        assert!(!controller.can_submit(""));
    }

    #[tokio::test]
    async fn test_successful_analysis_creates_session() {
        let (mut controller, backend) = controller(ScriptedBackend::new().reply(ACME));

        controller.analyze("acme.com").await.unwrap();

        assert_eq!(controller.phase(), WorkflowPhase::Success);
        assert_eq!(controller.analysis().unwrap().name, "Acme");
        let session = controller.chat_session().unwrap();
        assert_eq!(session.system_instruction(), "You are the Acme agent.");
        assert!(controller.error_message().is_none());
        assert!(backend.requests()[0].contents[0].text.contains("https://acme.com"));
    }

    #[tokio::test]
    async fn test_decode_failure_yields_error_phase() {
        let (mut controller, _) = controller(ScriptedBackend::new().reply("<html>nope</html>"));

        controller.analyze("acme.com").await.unwrap();

        assert_eq!(controller.phase(), WorkflowPhase::Error);
        assert_eq!(controller.error_message(), Some(MALFORMED_OUTPUT_MESSAGE));
        assert!(controller.analysis().is_none());
        assert!(controller.chat_session().is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_message_is_surfaced() {
        let (mut controller, _) =
            controller(ScriptedBackend::new().fail(AnalysisError::transport("quota exceeded")));

        controller.analyze("acme.com").await.unwrap();

        assert_eq!(controller.phase(), WorkflowPhase::Error);
        assert_eq!(controller.error_message(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_failure_message_uses_fallback() {
        let (mut controller, _) =
            controller(ScriptedBackend::new().fail(AnalysisError::transport("")));

        controller.analyze("acme.com").await.unwrap();

        assert_eq!(controller.error_message(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_resubmit_from_success_clears_previous_result() {
        let (mut controller, _) = controller(ScriptedBackend::new().reply(ACME));
        controller.analyze("acme.com").await.unwrap();
        let first_session = controller.chat_session().unwrap().id();

        controller.submit("other.com").unwrap();
        assert_eq!(controller.phase(), WorkflowPhase::Analyzing);
        assert!(controller.analysis().is_none());
        assert!(controller.chat_session().is_none());

        controller.complete(Ok(CompanyAnalysis::from_value(serde_json::from_str(ACME).unwrap()).unwrap()));
        assert_ne!(controller.chat_session().unwrap().id(), first_session);
    }

    #[tokio::test]
    async fn test_resubmit_from_error_clears_message() {
        let (mut controller, _) =
            controller(ScriptedBackend::new().fail(AnalysisError::transport("down")));
        controller.analyze("acme.com").await.unwrap();
        assert!(controller.error_message().is_some());

        controller.submit("acme.com").unwrap();
        assert_eq!(controller.phase(), WorkflowPhase::Analyzing);
        assert!(controller.error_message().is_none());
    }

    #[test]
    fn test_submit_rejected_while_analyzing() {
        let (mut controller, _) = controller(ScriptedBackend::new());
        controller.submit("acme.com").unwrap();
        assert!(!controller.can_submit("other.com"));
        assert!(controller.submit("other.com").is_err());
        assert_eq!(controller.phase(), WorkflowPhase::Analyzing);
    }

    #[test]
    fn test_late_result_ignored_when_not_analyzing() {
        let (mut controller, _) = controller(ScriptedBackend::new());
        controller.complete(Err(AnalysisError::transport("late")));
        assert_eq!(controller.phase(), WorkflowPhase::Idle);
        assert!(controller.error_message().is_none());
    }
}
