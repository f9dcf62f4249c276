//! Google Gemini API provider implementation.

use super::common::{build_http_client, check_status};
use crate::error::{IntentError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Google Gemini API provider.
///
/// Supports Gemini models via Google's `generateContent` API.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-pro";

    /// Create a new Gemini provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, Self::DEFAULT_MODEL)
    }

    /// Create a new Gemini provider with a specific model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(Some(60))?,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    /// Read the key from `GEMINI_API_KEY`.
    pub fn from_env(model: Option<&str>) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| IntentError::MissingApiKey {
                provider: "gemini".to_string(),
                env_var: API_KEY_ENV.to_string(),
            })?;
        Self::with_model(api_key, model.unwrap_or(Self::DEFAULT_MODEL))
    }

    fn to_api_request(request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    fn convert_api_response(&self, response: GeminiResponse) -> Result<CompletionResponse> {
        let candidate =
            response
                .candidates
                .into_iter()
                .next()
                .ok_or_else(|| IntentError::ParseError {
                    provider: "gemini".to_string(),
                    message: "no candidates in response".to_string(),
                })?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(CompletionResponse {
            content: text,
            model: response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = Self::to_api_request(&request);

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&api_request)
            .send()
            .await?;
        let response = check_status("gemini", response).await?;

        let api_response: GeminiResponse =
            response.json().await.map_err(|e| IntentError::ParseError {
                provider: "gemini".to_string(),
                message: format!("Failed to parse response: {e}"),
            })?;

        self.convert_api_response(api_response)
    }

    fn provider_id(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new("test-key").expect("create provider");
        assert_eq!(provider.provider_id(), "gemini");
        assert_eq!(provider.model(), "gemini-pro");
    }

    #[test]
    fn test_api_request_uses_generation_config() {
        let request = CompletionRequest::new("Hello")
            .with_max_tokens(500)
            .with_temperature(0.3);
        let json = serde_json::to_value(GeminiProvider::to_api_request(&request)).expect("serialize");

        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 500);
        assert!(json["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_response_conversion() {
        let provider = GeminiProvider::new("test-key").expect("create provider");
        let api: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "first"}, {"text": "second"}]}}]
        }))
        .expect("parse");
        let response = provider.convert_api_response(api).expect("convert");
        assert_eq!(response.content, "first\nsecond");
        assert_eq!(response.model, "gemini-pro");

        let empty: GeminiResponse = serde_json::from_value(serde_json::json!({})).expect("parse");
        assert!(provider.convert_api_response(empty).is_err());
    }
}
