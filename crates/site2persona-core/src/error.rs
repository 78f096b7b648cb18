use thiserror::Error;

/// User-facing text shown when the model's reply could not be turned into an analysis
pub const MALFORMED_OUTPUT_MESSAGE: &str =
    "The AI analysis completed, but the output format was malformed. Please try again.";

/// Errors surfaced by the analysis and chat paths
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// The remote call failed (network, HTTP status, unreadable envelope)
    #[error("{0}")]
    Transport(String),

    /// The reply text was not valid JSON
    #[error("{}", MALFORMED_OUTPUT_MESSAGE)]
    MalformedOutput,

    /// The reply decoded as JSON but did not match the analysis shape
    #[error("{}", MALFORMED_OUTPUT_MESSAGE)]
    Schema(String),

    /// A message is already in flight on this chat session
    #[error("A reply is still being generated for this chat session")]
    SessionBusy,
}

impl AnalysisError {
    pub fn transport(message: impl Into<String>) -> Self {
        AnalysisError::Transport(message.into())
    }
}
