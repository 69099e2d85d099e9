use crate::models::{NormalizedRecord, Recipe};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ParseImageRequest {
    /// Base64-encoded image bytes.
    #[serde(default)]
    #[validate(length(min = 1, message = "Image and mimeType required"))]
    pub image: String,

    #[serde(default, rename = "mimeType")]
    #[validate(length(min = 1, message = "Image and mimeType required"))]
    pub mime_type: String,
}

/// Ingredients as free text or as a list of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientsInput {
    Text(String),
    List(Vec<String>),
}

impl IngredientsInput {
    /// Prompt text for the ingredients, `None` when nothing was supplied.
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            IngredientsInput::Text(text) => text.trim().to_string(),
            IngredientsInput::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ParseTextRequest {
    pub ingredients: Option<IngredientsInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecipeRequest {
    pub ingredients: Option<IngredientsInput>,

    /// Use the most recent ingredient scan instead of `ingredients`.
    #[serde(default, rename = "existingFile")]
    pub existing_file: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub success: bool,
    pub message: String,
    pub file: String,
    pub data: NormalizedRecord,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub success: bool,
    pub recipes: Vec<Recipe>,
    pub file: String,
}
