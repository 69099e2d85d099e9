//! Gemini provider implementation.
//!
//! Implements text and multimodal (text + inline image) generation using
//! Google's Gemini `generateContent` REST API.

use super::{
    FinishReason, GenerationParams, ImageInput, ProviderError, RawGenerationResult, TextProvider,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Build the API URL for the given model method.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    fn build_request(
        prompt: &str,
        image: Option<&ImageInput>,
        params: &GenerationParams,
    ) -> GenerateContentRequest {
        let mut parts = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];

        if let Some(image) = image {
            parts.push(ContentPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: STANDARD.encode(&image.bytes),
                },
            });
        }

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            }),
        }
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageInput>,
        params: &GenerationParams,
    ) -> Result<RawGenerationResult, ProviderError> {
        let request = Self::build_request(prompt, image, params);

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            has_image = image.is_some(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url("generateContent"))
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            if status.is_client_error() {
                return Err(ProviderError::InvalidRequest(format!(
                    "Gemini API error {}: {}",
                    status, error_text
                )));
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        parse_response(api_response, image.is_some())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let url = format!("{}/models", self.config.api_base.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

/// Concatenate the text parts of the first candidate, like the SDK's `text()`.
fn parse_response(
    api_response: GenerateContentResponse,
    had_image: bool,
) -> Result<RawGenerationResult, ProviderError> {
    if api_response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_ref())
        .is_some()
    {
        return Err(ProviderError::ContentFiltered);
    }

    let candidate = api_response
        .candidates
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyResponse)?;

    let finish_reason = match candidate.finish_reason.as_deref() {
        Some("STOP") | None => FinishReason::Complete,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Error,
    };

    if finish_reason == FinishReason::ContentFilter {
        return Err(ProviderError::ContentFiltered);
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text),
                    ContentPart::InlineData { .. } => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    let usage = api_response.usage_metadata.unwrap_or_default();

    Ok(RawGenerationResult {
        text,
        had_image,
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
        finish_reason,
    })
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_only_request_has_single_part() {
        let params = GenerationParams {
            temperature: Some(0.2),
            max_tokens: Some(8192),
        };
        let request = GeminiTextProvider::build_request("hello", None, &params);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["parts"].as_array().unwrap().len(), 1);
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
        assert!(value["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn image_request_adds_inline_data_part() {
        let image = ImageInput::new(b"abc".to_vec(), None);
        let request =
            GeminiTextProvider::build_request("describe", Some(&image), &GenerationParams::default());
        let value = serde_json::to_value(&request).unwrap();

        let part = &value["contents"][0]["parts"][1]["inlineData"];
        assert_eq!(part["mimeType"], "image/jpeg");
        assert_eq!(part["data"], "YWJj");
    }

    #[test]
    fn response_text_parts_are_concatenated() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "```json\n"}, {"text": "{}\n```"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
        }))
        .unwrap();

        let result = parse_response(response, true).unwrap();
        assert_eq!(result.text, "```json\n{}\n```");
        assert!(result.had_image);
        assert_eq!(result.input_tokens, 12);
        assert_eq!(result.finish_reason, FinishReason::Complete);
    }

    #[test]
    fn safety_block_is_content_filtered() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(matches!(
            parse_response(response, false),
            Err(ProviderError::ContentFiltered)
        ));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }))
        .unwrap();
        assert!(matches!(
            parse_response(blocked, false),
            Err(ProviderError::ContentFiltered)
        ));
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(
            parse_response(response, false),
            Err(ProviderError::EmptyResponse)
        ));
    }
}
