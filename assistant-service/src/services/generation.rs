//! Generation client adapter: a provider plus the service's sampling
//! parameters and a hard timeout.

use crate::services::metrics;
use crate::services::providers::{
    GenerationParams, ImageInput, ProviderError, RawGenerationResult, TextProvider,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation backend failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Generation backend did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn TextProvider>,
    params: GenerationParams,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn TextProvider>, params: GenerationParams, timeout: Duration) -> Self {
        Self {
            provider,
            params,
            timeout,
        }
    }

    /// Check that the backend answers within the timeout. The outcome is
    /// logged as well as returned.
    pub async fn check_backend(&self) -> Result<(), GenerationError> {
        let model = self.provider.model();
        let outcome = match tokio::time::timeout(self.timeout, self.provider.health_check()).await {
            Ok(result) => result.map_err(GenerationError::Provider),
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        };

        match &outcome {
            Ok(()) => tracing::info!(
                provider = self.provider.name(),
                model = %model,
                "Generation backend reachable"
            ),
            Err(e) => tracing::warn!(
                provider = self.provider.name(),
                model = %model,
                error = %e,
                "Generation backend check failed"
            ),
        }

        outcome
    }

    /// Send `prompt`, and `image` when present, to the backend.
    ///
    /// No retries: callers decide whether a failed call is worth repeating.
    pub async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageInput>,
    ) -> Result<RawGenerationResult, GenerationError> {
        let modality = if image.is_some() { "multimodal" } else { "text" };
        let model = self.provider.model().to_string();
        let start = Instant::now();

        tracing::info!(
            provider = self.provider.name(),
            model = %model,
            modality,
            prompt_len = prompt.len(),
            "Generating content"
        );

        let outcome = tokio::time::timeout(
            self.timeout,
            self.provider.generate(prompt, image, &self.params),
        )
        .await;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_provider_latency(self.provider.name(), &model, elapsed);

        match outcome {
            Ok(Ok(result)) => {
                metrics::record_genai_request(&model, modality, "ok");
                tracing::info!(
                    model = %model,
                    output_len = result.text.len(),
                    input_tokens = result.input_tokens,
                    output_tokens = result.output_tokens,
                    finish_reason = result.finish_reason.as_str(),
                    elapsed_secs = elapsed,
                    "Generation completed"
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                metrics::record_genai_request(&model, modality, e.kind());
                tracing::error!(model = %model, error = %e, "Generation backend error");
                Err(GenerationError::Provider(e))
            }
            Err(_) => {
                metrics::record_genai_request(&model, modality, "timeout");
                tracing::error!(
                    model = %model,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Generation backend timed out"
                );
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }
}
