//! Generation-to-artifact pipeline: generate, extract, shape-check,
//! normalize, persist.

use crate::models::{Artifact, RecordKind};
use crate::services::artifacts::ArtifactStore;
use crate::services::error::PipelineError;
use crate::services::extractor::{self, ExtractionError};
use crate::services::generation::GenerationClient;
use crate::services::metrics;
use crate::services::normalizer;
use crate::services::providers::ImageInput;
use std::sync::Arc;

/// Characters of raw generator output kept in the failure log.
const RAW_LOG_CHARS: usize = 500;

#[derive(Clone)]
pub struct RecordPipeline {
    generation: GenerationClient,
    store: Arc<dyn ArtifactStore>,
}

impl RecordPipeline {
    pub fn new(generation: GenerationClient, store: Arc<dyn ArtifactStore>) -> Self {
        Self { generation, store }
    }

    pub fn generation(&self) -> &GenerationClient {
        &self.generation
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Free-form reply with surrounding whitespace removed.
    pub async fn reply(&self, prompt: &str) -> Result<String, PipelineError> {
        let result = self.generation.generate(prompt, None).await?;
        Ok(result.text.trim().to_string())
    }

    /// Run the full pipeline for `kind` and return the persisted artifact.
    pub async fn run(
        &self,
        kind: RecordKind,
        prompt: &str,
        image: Option<&ImageInput>,
    ) -> Result<Artifact, PipelineError> {
        let raw = self.generation.generate(prompt, image).await?;

        let payload = extractor::extract(&raw.text)
            .and_then(|payload| extractor::check_shape(&payload, kind).map(|_| payload))
            .map_err(|source| extraction_failed(kind, &raw.text, source))?;

        let record = normalizer::normalize(&payload.value, kind);
        let artifact = self.store.save(&record).await?;
        metrics::record_artifact_saved(kind.slug());

        tracing::info!(
            kind = %kind,
            file = %artifact.name,
            fenced = payload.fenced,
            "Record extracted and saved"
        );

        Ok(artifact)
    }
}

fn extraction_failed(kind: RecordKind, raw: &str, source: ExtractionError) -> PipelineError {
    metrics::record_extraction_failure(kind.slug(), source.reason());
    let excerpt: String = raw.chars().take(RAW_LOG_CHARS).collect();
    tracing::warn!(
        kind = %kind,
        error = %source,
        raw_len = raw.len(),
        raw = %excerpt,
        "Could not extract structured data from generated content"
    );
    PipelineError::Extraction { kind, source }
}
