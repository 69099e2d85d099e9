//! Prompt templates, loaded once at startup, and the compositions that turn
//! them into full generation prompts.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

pub const CHAT_PROMPT_FILE: &str = "ChatbotPrompt.txt";
pub const VISION_PROMPT_FILE: &str = "VisionModulePrompt.txt";
pub const DOCUMENT_PROMPT_FILE: &str = "docParserPrompt.txt";
pub const RECIPE_PROMPT_FILE: &str = "RecipePrompt.txt";

const INGREDIENT_INSTRUCTION: &str =
    "Please extract the relevant information and structure it in the Ingredient Parsing format.";
const HEALTH_REPORT_INSTRUCTION: &str =
    "Please extract the relevant information and structure it in the Universal Health Report format.";

/// Used when no `RecipePrompt.txt` is present.
pub const DEFAULT_RECIPE_PROMPT: &str = "\
You are a master chef and nutritionist.
Based on the provided list of ingredients, suggest 3 healthy and delicious recipes.
For each recipe include:
- Recipe Name
- Ingredients (with quantities)
- Instructions (step-by-step)
- Nutritional Info (approximate calories, protein, etc.)

Format the output as a JSON array of recipe objects.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read prompt template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt template {0} is empty")]
    Empty(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    chat: String,
    vision: String,
    document: String,
    recipe: String,
}

impl PromptLibrary {
    /// Read every template under `dir`. Any missing required template is fatal.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, PromptError> {
        let dir = dir.as_ref();

        let chat = read_required(&dir.join(CHAT_PROMPT_FILE)).await?;
        let vision = read_required(&dir.join(VISION_PROMPT_FILE)).await?;
        let document = read_required(&dir.join(DOCUMENT_PROMPT_FILE)).await?;

        let recipe_path = dir.join(RECIPE_PROMPT_FILE);
        let recipe = match fs::read_to_string(&recipe_path).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => DEFAULT_RECIPE_PROMPT.to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_RECIPE_PROMPT.to_string(),
            Err(source) => {
                return Err(PromptError::Read {
                    path: recipe_path,
                    source,
                })
            }
        };

        tracing::info!(dir = %dir.display(), "Prompt templates loaded");

        Ok(Self {
            chat,
            vision,
            document,
            recipe,
        })
    }

    /// Library built from in-memory templates.
    pub fn from_templates(
        chat: impl Into<String>,
        vision: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            chat: chat.into(),
            vision: vision.into(),
            document: document.into(),
            recipe: DEFAULT_RECIPE_PROMPT.to_string(),
        }
    }

    pub fn chat(&self, query: &str) -> String {
        format!("{}\n\nUser Question:\n{}", self.chat, query)
    }

    /// Prompt sent alongside an ingredient photo.
    pub fn vision_image(&self) -> String {
        self.vision.clone()
    }

    pub fn vision_text(&self, text: &str) -> String {
        format!(
            "{}\n\nDocument Text:\n{}\n\n{}",
            self.vision, text, INGREDIENT_INSTRUCTION
        )
    }

    pub fn document_image(&self) -> String {
        format!("{}\n\n{}", self.document, HEALTH_REPORT_INSTRUCTION)
    }

    pub fn document_text(&self, text: &str) -> String {
        format!(
            "{}\n\nDocument Text:\n{}\n\n{}",
            self.document, text, HEALTH_REPORT_INSTRUCTION
        )
    }

    pub fn recipe(&self, ingredients: &str) -> String {
        format!("{}\n\nIngredients Available: {}", self.recipe, ingredients)
    }
}

async fn read_required(path: &Path) -> Result<String, PromptError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| PromptError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if text.trim().is_empty() {
        return Err(PromptError::Empty(path.to_path_buf()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_required(dir: &Path) {
        std::fs::write(dir.join(CHAT_PROMPT_FILE), "You are a helpful assistant.").unwrap();
        std::fs::write(dir.join(VISION_PROMPT_FILE), "Identify ingredients.").unwrap();
        std::fs::write(dir.join(DOCUMENT_PROMPT_FILE), "Parse the medical document.").unwrap();
    }

    #[tokio::test]
    async fn loads_templates_and_defaults_recipe() {
        let dir = TempDir::new().unwrap();
        write_required(dir.path());

        let prompts = PromptLibrary::load(dir.path()).await.unwrap();

        assert_eq!(
            prompts.chat("What is fibre?"),
            "You are a helpful assistant.\n\nUser Question:\nWhat is fibre?"
        );
        assert!(prompts
            .recipe("eggs, milk")
            .ends_with("\n\nIngredients Available: eggs, milk"));
        assert!(prompts.recipe("x").starts_with("You are a master chef"));
    }

    #[tokio::test]
    async fn recipe_template_can_be_overridden() {
        let dir = TempDir::new().unwrap();
        write_required(dir.path());
        std::fs::write(dir.path().join(RECIPE_PROMPT_FILE), "Suggest vegan dishes.").unwrap();

        let prompts = PromptLibrary::load(dir.path()).await.unwrap();
        assert_eq!(
            prompts.recipe("tofu"),
            "Suggest vegan dishes.\n\nIngredients Available: tofu"
        );
    }

    #[tokio::test]
    async fn missing_template_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CHAT_PROMPT_FILE), "chat").unwrap();

        let err = PromptLibrary::load(dir.path()).await.unwrap_err();
        match err {
            PromptError::Read { path, .. } => assert!(path.ends_with(VISION_PROMPT_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn document_prompts_ask_for_health_report_format() {
        let prompts = PromptLibrary::from_templates("c", "v", "d");
        assert_eq!(
            prompts.document_text("BP 120/80"),
            "d\n\nDocument Text:\nBP 120/80\n\nPlease extract the relevant information and structure it in the Universal Health Report format."
        );
        assert!(prompts.document_image().starts_with("d\n\n"));
        assert!(prompts
            .vision_text("milk")
            .ends_with("structure it in the Ingredient Parsing format."));
    }
}
