//! Domain models for the assistant service.

pub mod records;

pub use records::{
    is_empty_value, Artifact, HealthReport, IngredientRecord, NormalizedRecord, Recipe,
    RecipeSet, RecordKind,
};
