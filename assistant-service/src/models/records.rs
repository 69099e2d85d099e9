//! Normalized domain records produced from generator output.
//!
//! Every record type has a closed field set; fields missing from a payload
//! are filled with defaults so consumers never see a missing key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The record shapes the service knows how to normalize and persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    HealthReport,
    IngredientList,
    RecipeSet,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::HealthReport,
        RecordKind::IngredientList,
        RecordKind::RecipeSet,
    ];

    /// File name prefix for persisted artifacts of this kind.
    pub fn artifact_prefix(self) -> &'static str {
        match self {
            RecordKind::HealthReport => "health_report",
            RecordKind::IngredientList => "IngredientList",
            RecordKind::RecipeSet => "recipes",
        }
    }

    /// URL segment used by the artifact endpoints.
    pub fn slug(self) -> &'static str {
        match self {
            RecordKind::HealthReport => "health-report",
            RecordKind::IngredientList => "ingredients",
            RecordKind::RecipeSet => "recipes",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "health-report" | "health_report" => Ok(RecordKind::HealthReport),
            "ingredients" | "ingredient-list" | "ingredient_list" => {
                Ok(RecordKind::IngredientList)
            }
            "recipes" | "recipe-set" | "recipe_set" => Ok(RecordKind::RecipeSet),
            _ => Err(format!("Unknown record kind: {}", s)),
        }
    }
}

/// Universal health report extracted from a clinical document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub source_metadata: Value,
    pub patient_profile: Value,
    pub encounter_info: Value,
    pub symptoms: Vec<Value>,
    pub diagnoses: Value,
    pub allergies: Value,
    pub medications_current: Vec<Value>,
    pub lab_results: Vec<Value>,
    pub findings: Value,
    pub lifestyle_and_risk: Value,
    pub recommendations: Value,
    pub system_generated: Value,
    /// Stamped at normalization time, never taken from the payload.
    pub last_updated: DateTime<Utc>,
}

/// Ingredient scan result for a single product or label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub item_name: Value,
    pub category: Value,
    pub specific_type: Value,
    pub confidence: Value,
    pub label_text_detected: Value,
}

impl IngredientRecord {
    /// Text handed to the recipe prompt when reusing a stored scan.
    pub fn ingredients_text(&self) -> String {
        if is_empty_value(&self.item_name) {
            serde_json::to_string(self).unwrap_or_default()
        } else {
            self.item_name.to_string()
        }
    }
}

/// One suggested recipe. Keys mirror the labels the recipe prompt asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "Recipe Name")]
    pub name: String,
    #[serde(rename = "Ingredients")]
    pub ingredients: Vec<Value>,
    #[serde(rename = "Instructions")]
    pub instructions: Vec<String>,
    #[serde(rename = "Nutritional Info")]
    pub nutrition: Map<String, Value>,
}

/// Ordered recipe suggestions for one ingredient list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeSet {
    pub recipes: Vec<Recipe>,
}

/// A record of one of the fixed kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    HealthReport(HealthReport),
    IngredientList(IngredientRecord),
    RecipeSet(RecipeSet),
}

impl NormalizedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            NormalizedRecord::HealthReport(_) => RecordKind::HealthReport,
            NormalizedRecord::IngredientList(_) => RecordKind::IngredientList,
            NormalizedRecord::RecipeSet(_) => RecordKind::RecipeSet,
        }
    }

    /// Decode a persisted record whose kind is known from its file name.
    pub fn from_json(kind: RecordKind, bytes: &[u8]) -> serde_json::Result<Self> {
        Ok(match kind {
            RecordKind::HealthReport => {
                NormalizedRecord::HealthReport(serde_json::from_slice(bytes)?)
            }
            RecordKind::IngredientList => {
                NormalizedRecord::IngredientList(serde_json::from_slice(bytes)?)
            }
            RecordKind::RecipeSet => NormalizedRecord::RecipeSet(serde_json::from_slice(bytes)?),
        })
    }
}

/// A normalized record persisted under a sortable, timestamped name.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// File name, `<prefix>_<epoch-millis>.json`.
    pub name: String,
    pub kind: RecordKind,
    pub created_at_millis: i64,
    pub record: NormalizedRecord,
}

/// `null`, `{}`, `[]` and `""` all count as "nothing extracted".
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
