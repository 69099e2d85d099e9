use crate::dtos::{QueryRequest, QueryResponse};
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;
use service_core::validation::ValidatedJson;

pub async fn query(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let prompt = state.prompts.chat(&req.query);
    let response = state.pipeline.reply(&prompt).await?;

    Ok(Json(QueryResponse {
        success: true,
        response,
    }))
}
