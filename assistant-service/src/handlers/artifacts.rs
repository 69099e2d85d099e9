use crate::dtos::{ArtifactListResponse, LatestArtifactResponse};
use crate::models::RecordKind;
use crate::services::PipelineError;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::DateTime;
use service_core::error::AppError;

fn parse_kind(kind: &str) -> Result<RecordKind, AppError> {
    kind.parse()
        .map_err(|e: String| AppError::NotFound(anyhow::anyhow!(e)))
}

pub async fn list_artifacts(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let artifacts = state
        .pipeline
        .store()
        .list(kind)
        .await
        .map_err(PipelineError::from)?;

    Ok(Json(ArtifactListResponse {
        success: true,
        kind: kind.slug().to_string(),
        artifacts,
    }))
}

pub async fn latest_artifact(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let artifact = state
        .pipeline
        .store()
        .latest(kind)
        .await
        .map_err(PipelineError::from)?;

    let created_at = DateTime::from_timestamp_millis(artifact.created_at_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    Ok(Json(LatestArtifactResponse {
        success: true,
        file: artifact.name,
        created_at,
        data: artifact.record,
    }))
}
