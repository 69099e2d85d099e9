//! Generation backend abstractions and implementations.
//!
//! The service treats the backend as an opaque function: prompt plus an
//! optional image in, raw text out. Providers never interpret, retry or cache.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// MIME type assumed for images whose type the caller did not supply.
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Backend returned no content")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// An image attached to a multimodal request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        Self { bytes, mime_type }
    }

    pub fn mime_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME_TYPE)
    }
}

/// Generation parameters for backend requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<i32>,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Error,
}

impl FinishReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Error => "error",
        }
    }
}

/// The unmodified text returned by the backend for one request.
#[derive(Debug, Clone)]
pub struct RawGenerationResult {
    pub text: String,

    /// Whether the request carried an inline image.
    pub had_image: bool,

    pub input_tokens: i32,
    pub output_tokens: i32,
    pub finish_reason: FinishReason,
}

/// Trait for text and multimodal generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider label for logs and metrics.
    fn name(&self) -> &'static str;

    /// Model the provider sends requests to.
    fn model(&self) -> &str;

    /// Generate a response for `prompt`, optionally with one inline image.
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageInput>,
        params: &GenerationParams,
    ) -> Result<RawGenerationResult, ProviderError>;

    /// Confirm the backend is reachable and accepts the configured key.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
