//! Gemini API client
//!
//! Wraps the single `generateContent` call the planner needs behind the
//! [`Generator`] trait, so the planner never sees the provider's request or
//! response schema:
//! - request: prompt text, web + maps search tools, optional location bias
//! - response: concatenated candidate text plus grounding chunks

use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::metadata::USER_AGENT;
use crate::types::{GroundingLink, LatLng, deserialize_links};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Candidate finish reasons that mean the answer was withheld by a filter.
const BLOCKING_FINISH_REASONS: [&str; 5] =
    ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII", "RECITATION"];

/// Retrieval tools requested alongside the prompt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolConfig {
    pub web_search: bool,
    pub maps_search: bool,
    pub location: Option<LatLng>,
}

impl ToolConfig {
    /// Web and maps search, biased towards `location` when known.
    pub fn grounded(location: Option<LatLng>) -> Self {
        Self {
            web_search: true,
            maps_search: true,
            location,
        }
    }
}

/// What came back from one generation call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generation {
    pub text: Option<String>,
    pub links: Vec<GroundingLink>,
}

pub trait Generator: Send + Sync {
    /// Whether a credential is available. Checked before any call is made.
    fn credential_configured(&self) -> bool;

    fn generate(&self, prompt: &str, tools: &ToolConfig) -> Result<Generation, PlanError>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct GeminiClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model,
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl Generator for GeminiClient {
    fn credential_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn generate(&self, prompt: &str, tools: &ToolConfig) -> Result<Generation, PlanError> {
        let api_key = self.api_key.as_deref().ok_or(PlanError::Configuration)?;
        let url = self.url();
        debug!(%url, prompt_len = prompt.len(), "calling generateContent");

        let response = self
            .agent
            .post(&url)
            .set("x-goog-api-key", api_key)
            .send_json(request_body(prompt, tools));

        match response {
            Ok(response) => {
                let parsed: GenerateContentResponse = response.into_json().map_err(|e| {
                    PlanError::Upstream(format!("Unreadable response from the AI service: {e}"))
                })?;
                parsed.into_generation()
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                warn!(status = code, "generateContent failed");
                Err(PlanError::upstream(upstream_message(&body)))
            }
            Err(ureq::Error::Transport(transport)) => {
                warn!(error = %transport, "generateContent transport failure");
                Err(PlanError::upstream(Some(transport.to_string())))
            }
        }
    }
}

pub fn request_body(prompt: &str, tools: &ToolConfig) -> Value {
    let mut tool_list = Vec::new();
    if tools.web_search {
        tool_list.push(json!({ "googleSearch": {} }));
    }
    if tools.maps_search {
        tool_list.push(json!({ "googleMaps": {} }));
    }

    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    });
    if !tool_list.is_empty() {
        body["tools"] = Value::Array(tool_list);
    }
    if let Some(location) = tools.location {
        body["toolConfig"] = json!({
            "retrievalConfig": {
                "latLng": {
                    "latitude": location.latitude,
                    "longitude": location.longitude,
                }
            }
        });
    }
    body
}

/// The `error.message` field of an API error body, if any.
pub fn upstream_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|m| !m.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default, deserialize_with = "deserialize_links")]
    grounding_chunks: Vec<GroundingLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate (thought parts skipped) and its grounding
    /// links. A prompt or candidate blocked by safety filters is an upstream
    /// error.
    pub fn into_generation(self) -> Result<Generation, PlanError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(PlanError::Upstream(format!(
                    "The request was blocked by the AI service ({reason})"
                )));
            }
            return Ok(Generation::default());
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text)
            .collect();
        let text = Some(text).filter(|t| !t.trim().is_empty());
        let blocked = candidate
            .finish_reason
            .filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()));
        if let (None, Some(reason)) = (&text, blocked) {
            return Err(PlanError::Upstream(format!(
                "The response was blocked by the AI service ({reason})"
            )));
        }
        let links = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default();

        Ok(Generation { text, links })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: Value) -> Result<Generation, PlanError> {
        serde_json::from_value::<GenerateContentResponse>(value)
            .unwrap()
            .into_generation()
    }

    #[test]
    fn body_requests_both_tools_and_location() {
        let tools = ToolConfig::grounded(Some(LatLng {
            latitude: 49.2,
            longitude: 16.6,
        }));
        let body = request_body("plan it", &tools);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "plan it");
        assert_eq!(
            body["tools"],
            json!([{ "googleSearch": {} }, { "googleMaps": {} }])
        );
        assert_eq!(
            body["toolConfig"]["retrievalConfig"]["latLng"]["latitude"],
            49.2
        );
    }

    #[test]
    fn body_omits_tool_config_without_location() {
        let body = request_body("plan it", &ToolConfig::grounded(None));
        assert!(body.get("toolConfig").is_none());
    }

    #[test]
    fn response_text_and_links() {
        let generation = parse(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking", "thought": true },
                    { "text": "# Trip\n" },
                    { "text": "* Day 1" }
                ]},
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } },
                    { "maps": { "uri": "https://maps.example/b", "title": "B" } }
                ]}
            }]
        }))
        .unwrap();
        assert_eq!(generation.text.as_deref(), Some("# Trip\n* Day 1"));
        assert_eq!(
            generation.links,
            vec![
                GroundingLink::web("https://a.example", "A"),
                GroundingLink::maps("https://maps.example/b", "B"),
            ]
        );
    }

    #[test]
    fn blank_or_missing_text_is_none() {
        let generation =
            parse(json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }))
                .unwrap();
        assert_eq!(generation.text, None);
        assert_eq!(parse(json!({})).unwrap(), Generation::default());
    }

    #[test]
    fn blocked_prompt_is_upstream_error() {
        let err = parse(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).unwrap_err();
        assert!(matches!(err, PlanError::Upstream(m) if m.contains("SAFETY")));
    }

    #[test]
    fn blocked_candidate_is_upstream_error() {
        let err = parse(json!({
            "candidates": [{ "finishReason": "SAFETY", "safetyRatings": [] }]
        }))
        .unwrap_err();
        assert!(matches!(err, PlanError::Upstream(m) if m.contains("SAFETY")));
    }

    #[test]
    fn finished_candidate_with_text_is_kept() {
        let generation = parse(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "# Trip" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(generation.text.as_deref(), Some("# Trip"));

        let empty = parse(json!({ "candidates": [{ "finishReason": "STOP" }] })).unwrap();
        assert_eq!(empty.text, None);
    }

    #[test]
    fn error_body_message() {
        assert_eq!(
            upstream_message(r#"{"error":{"code":429,"message":"Quota exceeded"}}"#).as_deref(),
            Some("Quota exceeded")
        );
        assert_eq!(upstream_message("<html>bad gateway</html>"), None);
        assert_eq!(upstream_message(r#"{"error":{"message":""}}"#), None);
    }

    #[test]
    fn missing_key_is_not_configured() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: Some("   ".into()),
            ..GeminiConfig::default()
        });
        assert!(!client.credential_configured());
        assert!(matches!(
            client.generate("x", &ToolConfig::grounded(None)),
            Err(PlanError::Configuration)
        ));
    }

    #[test]
    fn url_uses_model_and_trimmed_endpoint() {
        let client = GeminiClient::new(GeminiConfig {
            endpoint: "http://localhost:9000/v1beta/".into(),
            model: "gemini-test".into(),
            ..GeminiConfig::default()
        });
        assert_eq!(
            client.url(),
            "http://localhost:9000/v1beta/models/gemini-test:generateContent"
        );
    }
}
