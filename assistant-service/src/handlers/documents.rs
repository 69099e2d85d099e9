use crate::handlers::upload::stage_named_field;
use crate::handlers::vision::record_response;
use crate::models::{Artifact, RecordKind};
use crate::services::providers::ImageInput;
use crate::services::{PipelineError, StagedUpload};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

/// Parse a clinical document (multipart field `document`) into a health report.
///
/// Images go to the backend as multimodal input; anything else is read as
/// UTF-8 text.
pub async fn parse_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let staged = stage_named_field(&mut multipart, "document", &state.uploads).await?;

    tracing::info!(
        filename = %staged.original_name,
        mime_type = %staged.mime_type,
        size = staged.size,
        "Parsing document"
    );

    let outcome = parse_staged_document(&state, &staged).await;
    staged.discard().await;

    Ok(Json(record_response(outcome?)))
}

async fn parse_staged_document(
    state: &AppState,
    staged: &StagedUpload,
) -> Result<Artifact, PipelineError> {
    if staged.is_image() {
        let image = ImageInput::new(staged.read_bytes().await?, Some(staged.mime_type.clone()));
        state
            .pipeline
            .run(
                RecordKind::HealthReport,
                &state.prompts.document_image(),
                Some(&image),
            )
            .await
    } else {
        let text = staged.read_text().await?;
        state
            .pipeline
            .run(
                RecordKind::HealthReport,
                &state.prompts.document_text(&text),
                None,
            )
            .await
    }
}
