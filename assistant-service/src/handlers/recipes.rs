use crate::dtos::{RecipeRequest, RecipeResponse};
use crate::models::{NormalizedRecord, RecordKind};
use crate::services::{ArtifactError, PipelineError};
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;
use service_core::validation::ValidatedJson;

/// Suggest recipes for the supplied ingredients, or for the most recent
/// ingredient scan when `existingFile` is set.
pub async fn generate_recipes(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ingredients = if req.existing_file {
        latest_scan_text(&state).await?
    } else {
        req.ingredients
            .as_ref()
            .and_then(|i| i.to_text())
            .ok_or_else(|| PipelineError::Validation("No ingredients provided.".to_string()))?
    };

    let artifact = state
        .pipeline
        .run(RecordKind::RecipeSet, &state.prompts.recipe(&ingredients), None)
        .await?;

    let NormalizedRecord::RecipeSet(set) = artifact.record else {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Recipe pipeline produced a {} record",
            artifact.kind
        )));
    };

    tracing::info!(file = %artifact.name, count = set.recipes.len(), "Recipes generated");

    Ok(Json(RecipeResponse {
        success: true,
        recipes: set.recipes,
        file: artifact.name,
    }))
}

async fn latest_scan_text(state: &AppState) -> Result<String, PipelineError> {
    let artifact = state
        .pipeline
        .store()
        .latest(RecordKind::IngredientList)
        .await
        .map_err(|e| match e {
            ArtifactError::NotFound(_) => {
                PipelineError::NotFound("No ingredient scans found.".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(file = %artifact.name, "Using latest ingredient scan");

    match artifact.record {
        NormalizedRecord::IngredientList(record) => Ok(record.ingredients_text()),
        other => Ok(serde_json::to_string(&other)?),
    }
}
