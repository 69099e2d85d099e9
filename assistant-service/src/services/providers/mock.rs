//! Mock provider implementation for testing.

use super::{
    FinishReason, GenerationParams, ImageInput, ProviderError, RawGenerationResult, TextProvider,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A request observed by [`MockTextProvider`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub prompt: String,
    pub image_mime_type: Option<String>,
    pub image_len: usize,
}

/// Mock text provider with scripted replies.
///
/// Queued replies are returned in order; once the queue is empty the provider
/// echoes the prompt back.
pub struct MockTextProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
    healthy: bool,
}

impl Default for MockTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTextProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
            healthy: true,
        }
    }

    /// Provider whose first reply is `text`.
    pub fn with_reply(text: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.push_reply(text);
        provider
    }

    /// Sleep before every reply, to exercise caller timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every health check.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.lock_replies().push_back(Ok(text.into()));
    }

    pub fn push_error(&self, error: ProviderError) {
        self.lock_replies().push_back(Err(error));
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, ProviderError>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageInput>,
        _params: &GenerationParams,
    ) -> Result<RawGenerationResult, ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedRequest {
                prompt: prompt.to_string(),
                image_mime_type: image.map(|i| i.mime_type().to_string()),
                image_len: image.map(|i| i.bytes.len()).unwrap_or(0),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .lock_replies()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Mock response for: {}", prompt)));

        let text = reply?;

        Ok(RawGenerationResult {
            output_tokens: text.len() as i32 / 4,
            input_tokens: prompt.len() as i32 / 4,
            text,
            had_image: image.is_some(),
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.healthy {
            Ok(())
        } else {
            Err(ProviderError::NetworkError("mock backend unreachable".to_string()))
        }
    }
}
