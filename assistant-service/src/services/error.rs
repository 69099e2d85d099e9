use crate::models::RecordKind;
use crate::services::artifacts::ArtifactError;
use crate::services::extractor::ExtractionError;
use crate::services::generation::GenerationError;
use crate::services::providers::ProviderError;
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Generation backend error: {0}")]
    Generation(#[from] ProviderError),

    #[error("Generation backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Extraction failed for {kind}: {source}")]
    Extraction {
        kind: RecordKind,
        #[source]
        source: ExtractionError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<GenerationError> for PipelineError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Provider(e) => PipelineError::Generation(e),
            GenerationError::Timeout(after) => PipelineError::Timeout(after),
        }
    }
}

impl From<ArtifactError> for PipelineError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Io(e) => PipelineError::Io(e),
            ArtifactError::Serialization(e) => PipelineError::Serialization(e),
            ArtifactError::NotFound(kind) => {
                PipelineError::NotFound(format!("No {} artifacts found.", kind))
            }
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Generation(_) => AppError::BadGateway {
                message: "Generation backend error".to_string(),
                details: None,
            },
            PipelineError::Timeout(after) => AppError::GatewayTimeout(format!(
                "Generation backend did not answer within {}s",
                after.as_secs()
            )),
            PipelineError::Extraction { kind, source } => AppError::BadGateway {
                message: format!("Could not extract a {} from the generated content", kind),
                details: Some(source.to_string()),
            },
            PipelineError::Io(e) => AppError::InternalError(anyhow::Error::new(e)),
            PipelineError::Serialization(e) => AppError::InternalError(anyhow::Error::new(e)),
            PipelineError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            PipelineError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn pipeline_errors_map_to_http_statuses() {
        let cases: Vec<(PipelineError, StatusCode)> = vec![
            (
                PipelineError::Generation(ProviderError::RateLimited),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PipelineError::Timeout(Duration::from_secs(60)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                PipelineError::Extraction {
                    kind: RecordKind::HealthReport,
                    source: ExtractionError::Empty,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                PipelineError::Io(std::io::Error::other("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::NotFound("No ingredient scans found.".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PipelineError::Validation("Ingredients list required".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn generation_details_are_not_exposed() {
        let err = AppError::from(PipelineError::Generation(ProviderError::ApiError(
            "key AIza... rejected".into(),
        )));
        match err {
            AppError::BadGateway { message, details } => {
                assert_eq!(message, "Generation backend error");
                assert!(details.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn extraction_diagnostic_is_carried_in_details() {
        let err = AppError::from(PipelineError::Extraction {
            kind: RecordKind::IngredientList,
            source: ExtractionError::Unparseable {
                diagnostic: "expected value at line 1".into(),
                snippet: "I cannot help".into(),
            },
        });
        match err {
            AppError::BadGateway { details, .. } => {
                let details = details.unwrap();
                assert!(details.contains("expected value at line 1"));
                assert!(!details.contains("I cannot help"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
