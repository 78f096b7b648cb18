use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{GenerateRequest, GenerativeBackend, Turn};
use crate::error::AnalysisError;

pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
struct GeminiTool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart { text: Some(text.to_string()) }],
        }
    }
}

impl From<&Turn> for GeminiContent {
    fn from(turn: &Turn) -> Self {
        GeminiContent::text(Some(turn.role.as_str()), &turn.text)
    }
}

impl GeminiRequest {
    fn from_request(request: &GenerateRequest) -> Self {
        Self {
            contents: request.contents.iter().map(GeminiContent::from).collect(),
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(|s| GeminiContent::text(None, s)),
            tools: if request.web_search {
                vec![GeminiTool { google_search: GoogleSearch {} }]
            } else {
                Vec::new()
            },
        }
    }
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// HTTP client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn map_api_error(status: reqwest::StatusCode, body: &str) -> AnalysisError {
        let message = serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.to_string(), |e| e.message);
        AnalysisError::transport(format!("Gemini API error ({}): {}", status.as_u16(), message))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    #[instrument(skip(self, request), fields(model = %request.model, turns = request.contents.len()))]
    async fn generate(&self, request: GenerateRequest) -> Result<String, AnalysisError> {
        let body = GeminiRequest::from_request(&request);

        debug!(web_search = request.web_search, "Sending request to Gemini API");

        let response = self
            .client
            .post(self.build_url(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AnalysisError::transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(Self::map_api_error(status, &text));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response envelope");
            AnalysisError::transport(format!("Failed to parse Gemini response: {e}"))
        })?;

        Ok(gemini_response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_with_search_and_instruction() {
        let request = GenerateRequest {
            model: DEFAULT_MODEL.into(),
            system_instruction: Some("Be helpful".into()),
            contents: vec![Turn::user("hi"), Turn::model("hello")],
            web_search: true,
        };
        let value = serde_json::to_value(GeminiRequest::from_request(&request)).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]}
                ],
                "systemInstruction": {"parts": [{"text": "Be helpful"}]},
                "tools": [{"google_search": {}}]
            })
        );
    }

    #[test]
    fn test_request_without_search_omits_tools() {
        let request = GenerateRequest {
            model: DEFAULT_MODEL.into(),
            system_instruction: None,
            contents: vec![Turn::user("hi")],
            web_search: false,
        };
        let value = serde_json::to_value(GeminiRequest::from_request(&request)).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 3}
        }))
        .unwrap();
        assert_eq!(response.text(), "Hello there");
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_api_error_message_extracted() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let err = GeminiClient::map_api_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(err, AnalysisError::Transport("Gemini API error (400): API key not valid".into()));
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client = GeminiClient::with_base_url("k", "http://localhost:9999/v1beta/");
        assert_eq!(
            client.build_url("gemini-2.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
