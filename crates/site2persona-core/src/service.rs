use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{error, info, instrument};

use crate::ai::{GenerateRequest, GenerativeBackend, GeminiClient, Turn};
use crate::config::Config;
use crate::error::AnalysisError;
use crate::session::ChatSession;
use crate::state::CompanyAnalysis;

/// Wraps the generative backend with the two operations the app needs:
/// analyzing a website and opening a persona chat session.
#[derive(Clone)]
pub struct AnalysisService {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
}

impl AnalysisService {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: &str) -> Self {
        Self {
            backend,
            model: model.to_string(),
        }
    }

    /// Build a service backed by the Gemini HTTP API
    pub fn from_config(config: &Config) -> Self {
        let client = GeminiClient::with_base_url(config.api_key(), config.base_url());
        Self::new(Arc::new(client), config.model())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Research `url` with the model's search tool and decode its reply into
    /// a [`CompanyAnalysis`].
    #[instrument(skip(self))]
    pub async fn analyze_website(&self, url: &str) -> Result<CompanyAnalysis, AnalysisError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            system_instruction: None,
            contents: vec![Turn::user(build_analysis_prompt(url))],
            web_search: true,
        };

        let text = self.backend.generate(request).await.map_err(|e| {
            error!(error = %e, "Gemini analysis request failed");
            e
        })?;

        let analysis = parse_analysis(&text)?;
        info!(company = %analysis.name, products = analysis.products.len(), "Analysis complete");
        Ok(analysis)
    }

    /// Open a chat session whose replies follow `system_instruction`.
    /// No request is made until the first message is sent.
    pub fn create_chat_session(&self, system_instruction: &str) -> Arc<ChatSession> {
        Arc::new(ChatSession::new(
            self.backend.clone(),
            &self.model,
            system_instruction,
        ))
    }
}

/// Remove ```json / ``` fence markers and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"```json\n?|\n?```").unwrap());
    fence.replace_all(text, "").trim().to_string()
}

/// Decode the model's reply text into an analysis
pub fn parse_analysis(text: &str) -> Result<CompanyAnalysis, AnalysisError> {
    let cleaned = strip_code_fences(text);

    let value: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
        error!(error = %e, output = %cleaned, "Failed to parse analysis JSON");
        AnalysisError::MalformedOutput
    })?;

    CompanyAnalysis::from_value(value).map_err(|e| {
        error!(error = ?e, output = %cleaned, "Analysis JSON does not match the expected shape");
        e
    })
}

pub fn build_analysis_prompt(url: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are an expert AI persona architect. ");
    prompt.push_str(&format!("Your goal is to analyze the company at this URL: {}\n\n", url));

    prompt.push_str("Use Google Search to research the site and its sub-pages and understand the company's:\n");
    prompt.push_str("1. Core identity and mission.\n");
    prompt.push_str("2. Product or service offerings (features, pricing, sub-page details).\n");
    prompt.push_str("3. Brand voice and tone (e.g. professional, playful, authoritative).\n");
    prompt.push_str("4. Target audience and key value propositions.\n\n");

    prompt.push_str("Based on this research, write a highly optimized system instruction for an AI Sales Representative of this company. ");
    prompt.push_str("It must define the agent's persona, its knowledge base, its goal (conversion and support), and its guardrails.\n\n");

    prompt.push_str("Return the result STRICTLY as a single JSON object with exactly these keys and no markdown formatting around it:\n\n");
    prompt.push_str(
        r#"{
  "name": "Company Name",
  "description": "Short description",
  "industry": "Industry sector",
  "targetAudience": ["Audience 1", "Audience 2"],
  "keySellingPoints": ["Point 1", "Point 2"],
  "brandTone": "e.g. Professional and Empathetic",
  "products": [{"name": "Product 1", "description": "Description"}],
  "generatedSystemInstruction": "The full, long-form system prompt text..."
}"#,
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;
    use crate::error::MALFORMED_OUTPUT_MESSAGE;

    const ACME_FENCED: &str = "```json\n{\"name\":\"Acme\",\"description\":\"...\", \"industry\":\"Widgets\",\"targetAudience\":[],\"keySellingPoints\":[],\"brandTone\":\"Bold\",\"products\":[],\"generatedSystemInstruction\":\"You are...\"} \n```";

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_fenced_analysis() {
        let analysis = parse_analysis(ACME_FENCED).unwrap();
        assert_eq!(analysis.name, "Acme");
        assert_eq!(analysis.brand_tone, "Bold");
        assert!(analysis.target_audience.is_empty());
        assert_eq!(analysis.generated_system_instruction, "You are...");
    }

    #[test]
    fn test_parse_prose_is_malformed() {
        let err = parse_analysis("Sorry, I could not find that website.").unwrap_err();
        assert_eq!(err, AnalysisError::MalformedOutput);
        assert_eq!(err.to_string(), MALFORMED_OUTPUT_MESSAGE);
    }

    #[test]
    fn test_parse_wrong_shape_uses_malformed_message() {
        let err = parse_analysis(r#"{"name": "Acme"}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema(_)));
        assert_eq!(err.to_string(), MALFORMED_OUTPUT_MESSAGE);
    }

    #[test]
    fn test_prompt_embeds_url() {
        let prompt = build_analysis_prompt("https://acme.com");
        assert!(prompt.contains("https://acme.com"));
        assert!(prompt.contains("generatedSystemInstruction"));
    }

    #[tokio::test]
    async fn test_analyze_website_uses_search_tool() {
        let backend = Arc::new(ScriptedBackend::new().reply(ACME_FENCED));
        let service = AnalysisService::new(backend.clone(), "gemini-2.5-flash");

        let analysis = service.analyze_website("https://acme.com").await.unwrap();
        assert_eq!(analysis.industry, "Widgets");

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].web_search);
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert!(requests[0].contents[0].text.contains("https://acme.com"));
    }

    #[tokio::test]
    async fn test_analyze_website_propagates_transport_error() {
        let backend = Arc::new(
            ScriptedBackend::new().fail(AnalysisError::transport("HTTP request failed: timeout")),
        );
        let service = AnalysisService::new(backend, "m");

        let err = service.analyze_website("https://acme.com").await.unwrap_err();
        assert_eq!(err, AnalysisError::Transport("HTTP request failed: timeout".into()));
    }

    #[tokio::test]
    async fn test_create_chat_session_makes_no_request() {
        let backend = Arc::new(ScriptedBackend::new());
        let service = AnalysisService::new(backend.clone(), "m");

        let session = service.create_chat_session("You are the Acme agent");
        assert_eq!(session.system_instruction(), "You are the Acme agent");
        assert!(backend.requests().is_empty());
    }
}
