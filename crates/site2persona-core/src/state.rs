//! UI-agnostic application state types
//!
//! This module contains data structures that are shared between the service
//! layer and any UI, and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// A product or service offering identified on the company website
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Product {
    pub name: String,
    pub description: String,
}

/// Structured company analysis produced by the model in a single response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyAnalysis {
    pub name: String,
    pub description: String,
    pub industry: String,
    pub target_audience: Vec<String>,
    pub key_selling_points: Vec<String>,
    pub brand_tone: String,
    pub products: Vec<Product>,
    pub generated_system_instruction: String,
}

impl CompanyAnalysis {
    /// Validate a decoded JSON value against the analysis schema.
    ///
    /// Missing fields, wrong types and unknown keys are rejected, as is an
    /// empty system instruction (the chat session cannot be seeded without one).
    pub fn from_value(value: serde_json::Value) -> Result<Self, AnalysisError> {
        let analysis: CompanyAnalysis =
            serde_json::from_value(value).map_err(|e| AnalysisError::Schema(e.to_string()))?;

        if analysis.generated_system_instruction.trim().is_empty() {
            return Err(AnalysisError::Schema(
                "generatedSystemInstruction is empty".to_string(),
            ));
        }

        Ok(analysis)
    }
}

/// A chat message in the playground transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Creation time in Unix milliseconds
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, content)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// Phase of the analyze/chat workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Analyzing,
    Success,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "name": "Acme",
            "description": "Makes everything",
            "industry": "Widgets",
            "targetAudience": ["Coyotes"],
            "keySellingPoints": ["Fast delivery"],
            "brandTone": "Bold",
            "products": [{"name": "Rocket", "description": "Goes up"}],
            "generatedSystemInstruction": "You are the Acme sales agent."
        })
    }

    #[test]
    fn test_from_value_accepts_full_shape() {
        let analysis = CompanyAnalysis::from_value(sample()).unwrap();
        assert_eq!(analysis.name, "Acme");
        assert_eq!(analysis.target_audience, vec!["Coyotes".to_string()]);
        assert_eq!(analysis.products[0].name, "Rocket");
    }

    #[test]
    fn test_from_value_rejects_missing_field() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("brandTone");
        let err = CompanyAnalysis::from_value(value).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema(_)));
    }

    #[test]
    fn test_from_value_rejects_unknown_field() {
        let mut value = sample();
        value["pricing"] = json!("cheap");
        assert!(CompanyAnalysis::from_value(value).is_err());
    }

    #[test]
    fn test_from_value_rejects_wrong_type() {
        let mut value = sample();
        value["products"] = json!("Rocket");
        assert!(CompanyAnalysis::from_value(value).is_err());
    }

    #[test]
    fn test_from_value_rejects_blank_instruction() {
        let mut value = sample();
        value["generatedSystemInstruction"] = json!("   ");
        assert!(CompanyAnalysis::from_value(value).is_err());
    }

    #[test]
    fn test_chat_role_serializes_lowercase() {
        let msg = ChatMessage::model("hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "model");
        assert!(msg.timestamp > 0);
    }
}
