use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::codec::EncodedImage;
use crate::inference::{schema, AttemptError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// One inference attempt against the remote service.
///
/// Implementations return the raw model text; decoding and validation happen
/// on the caller's side. The credential string selects a quota pool.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(
        &self,
        credential: &str,
        image: &EncodedImage,
    ) -> Result<String, AttemptError>;
}

/// Production client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(model: &str) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, model)
    }

    pub fn with_base_url(base_url: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self, credential: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, credential
        )
    }
}

/// Request payload: instruction text plus the inline image, with the service
/// constrained to the analysis schema via structured output.
fn request_body(image: &EncodedImage) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": schema::INSTRUCTION },
                {
                    "inline_data": {
                        "mime_type": image.mime,
                        "data": image.body()
                    }
                }
            ]
        }],
        "generationConfig": {
            "response_mime_type": "application/json",
            "response_schema": schema::response_schema()
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn joined_text(self) -> String {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect()
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(
        &self,
        credential: &str,
        image: &EncodedImage,
    ) -> Result<String, AttemptError> {
        debug!(model = %self.model, mime = %image.mime, "sending inference request");

        let response = self
            .http
            .post(self.endpoint(credential))
            .json(&request_body(image))
            .send()
            .await
            .map_err(|e| AttemptError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Quota(format!("HTTP 429: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Some quota rejections come back as 403/400 with a status string
            // instead of 429.
            if body.contains("RESOURCE_EXHAUSTED") {
                return Err(AttemptError::Quota(format!("HTTP {status}: {body}")));
            }
            return Err(AttemptError::Transient(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Transient(format!("unparseable response: {e}")))?;

        let text = parsed.joined_text();
        if text.trim().is_empty() {
            return Err(AttemptError::Transient("no candidate text in response".into()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod client_tests {
    use super::*;

    #[test]
    fn request_carries_instruction_schema_and_stripped_image() {
        let image = EncodedImage::from_bytes("image/jpeg", b"fake");
        let body = request_body(&image);

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], schema::INSTRUCTION);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        // transmitted body is bare base64, no data-URI prefix
        let data = parts[1]["inline_data"]["data"].as_str().unwrap();
        assert!(!data.starts_with("data:"));
        assert_eq!(data, image.body());

        assert_eq!(
            body["generationConfig"]["response_mime_type"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["response_schema"],
            schema::response_schema()
        );
    }

    #[test]
    fn endpoint_selects_model_and_credential() {
        let client = GeminiClient::with_base_url("https://example.test/", "gemini-3-pro-preview");
        assert_eq!(
            client.endpoint("key-a"),
            "https://example.test/v1beta/models/gemini-3-pro-preview:generateContent?key=key-a"
        );
    }

    #[test]
    fn joined_text_concatenates_candidate_parts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": { "parts": [ { "text": "{\"a\":" }, { "text": "1}" } ] }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.joined_text(), "{\"a\":1}");
    }

    #[test]
    fn missing_candidates_yield_empty_text() {
        let parsed: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parsed.joined_text().is_empty());
    }
}
