pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::state::ChatRole;

/// One turn of conversation as sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: ChatRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Model, text: text.into() }
    }
}

/// A single content-generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub contents: Vec<Turn>,
    pub web_search: bool,
}

/// Remote generative model. Implemented by [`GeminiClient`]; tests swap in fakes.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Run one generation and return the reply text (possibly empty)
    async fn generate(&self, request: GenerateRequest) -> Result<String, AnalysisError>;
}

#[cfg(test)]
pub(crate) mod testing;
