use crate::dtos::{ParseImageRequest, ParseTextRequest, RecordResponse};
use crate::handlers::upload::stage_named_field;
use crate::models::{Artifact, RecordKind};
use crate::services::providers::ImageInput;
use crate::services::{PipelineError, StagedUpload};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use service_core::error::AppError;
use service_core::validation::ValidatedJson;

pub async fn parse_image(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ParseImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = decode_image(&req.image)?;
    let image = ImageInput::new(bytes, Some(req.mime_type));

    let artifact = state
        .pipeline
        .run(RecordKind::IngredientList, &state.prompts.vision_image(), Some(&image))
        .await?;

    Ok(Json(record_response(artifact)))
}

pub async fn parse_text(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ParseTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = req
        .ingredients
        .as_ref()
        .and_then(|i| i.to_text())
        .ok_or_else(|| PipelineError::Validation("Ingredients list required".to_string()))?;

    let artifact = state
        .pipeline
        .run(RecordKind::IngredientList, &state.prompts.vision_text(&text), None)
        .await?;

    Ok(Json(record_response(artifact)))
}

/// Ingredient photo sent as multipart field `photo`.
pub async fn parse_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let staged = stage_named_field(&mut multipart, "photo", &state.uploads).await?;

    let outcome = scan_staged_photo(&state, &staged).await;
    staged.discard().await;

    Ok(Json(record_response(outcome?)))
}

async fn scan_staged_photo(
    state: &AppState,
    staged: &StagedUpload,
) -> Result<Artifact, PipelineError> {
    let image = ImageInput::new(staged.read_bytes().await?, Some(staged.mime_type.clone()));
    state
        .pipeline
        .run(RecordKind::IngredientList, &state.prompts.vision_image(), Some(&image))
        .await
}

/// Accepts plain base64 or a `data:<mime>;base64,` URL.
fn decode_image(encoded: &str) -> Result<Vec<u8>, PipelineError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| PipelineError::Validation(format!("Image is not valid base64: {}", e)))
}

pub(crate) fn record_response(artifact: Artifact) -> RecordResponse {
    RecordResponse {
        success: true,
        message: "Report generated and saved".to_string(),
        file: artifact.name,
        data: artifact.record,
    }
}
