//! Mapping of loosely-typed payloads onto the fixed record shapes.
//!
//! Each record field has one explicit rule: mapping fields keep any non-null
//! value and default to `{}`, sequence fields keep arrays, wrap lone values
//! and default to `[]`. Keys outside a record's field set are dropped.
//! Normalization never fails.

use crate::models::{
    HealthReport, IngredientRecord, NormalizedRecord, Recipe, RecipeSet, RecordKind,
};
use chrono::Utc;
use serde_json::{Map, Value};

/// Normalize `payload` into the record shape for `kind`.
pub fn normalize(payload: &Value, kind: RecordKind) -> NormalizedRecord {
    match kind {
        RecordKind::HealthReport => NormalizedRecord::HealthReport(normalize_health_report(payload)),
        RecordKind::IngredientList => {
            NormalizedRecord::IngredientList(normalize_ingredient(payload))
        }
        RecordKind::RecipeSet => NormalizedRecord::RecipeSet(normalize_recipes(payload)),
    }
}

pub fn normalize_health_report(payload: &Value) -> HealthReport {
    let fields = payload.as_object();

    HealthReport {
        source_metadata: mapping(fields, "source_metadata"),
        patient_profile: mapping(fields, "patient_profile"),
        encounter_info: mapping(fields, "encounter_info"),
        symptoms: sequence(fields, "symptoms"),
        diagnoses: mapping(fields, "diagnoses"),
        allergies: mapping(fields, "allergies"),
        medications_current: sequence(fields, "medications_current"),
        lab_results: sequence(fields, "lab_results"),
        findings: mapping(fields, "findings"),
        lifestyle_and_risk: mapping(fields, "lifestyle_and_risk"),
        recommendations: mapping(fields, "recommendations"),
        system_generated: mapping(fields, "system_generated"),
        // Provenance: always the normalization time, whatever the payload says.
        last_updated: Utc::now(),
    }
}

pub fn normalize_ingredient(payload: &Value) -> IngredientRecord {
    let fields = payload.as_object();

    IngredientRecord {
        item_name: mapping(fields, "item_name"),
        category: mapping(fields, "category"),
        specific_type: mapping(fields, "specific_type"),
        confidence: mapping(fields, "confidence"),
        label_text_detected: mapping(fields, "label_text_detected"),
    }
}

pub fn normalize_recipes(payload: &Value) -> RecipeSet {
    let items = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("recipes") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let recipes = items
        .iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(normalize_recipe(fields)),
            Value::String(name) => Some(Recipe {
                name: name.trim().to_string(),
                ingredients: Vec::new(),
                instructions: Vec::new(),
                nutrition: Map::new(),
            }),
            other => {
                tracing::debug!(value = %other, "Skipping non-recipe entry");
                None
            }
        })
        .collect();

    RecipeSet { recipes }
}

fn normalize_recipe(fields: &Map<String, Value>) -> Recipe {
    let name = match lookup(fields, &["recipename", "name", "title"]) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let ingredients = match lookup(
        fields,
        &["ingredients", "ingredientswithquantities", "ingredientlist"],
    ) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(item, quantity)| serde_json::json!({ "item": item, "quantity": quantity }))
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    };

    let instructions = match lookup(
        fields,
        &[
            "instructions",
            "instructionsstepbystep",
            "steps",
            "directions",
            "method",
        ],
    ) {
        Some(Value::Array(steps)) => steps.iter().filter_map(step_text).collect(),
        Some(Value::String(text)) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    };

    let nutrition = match lookup(
        fields,
        &[
            "nutritionalinfo",
            "nutritionalinformation",
            "nutrition",
            "nutritioninfo",
            "nutritionestimate",
        ],
    ) {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            let mut map = Map::new();
            map.insert("summary".to_string(), other.clone());
            map
        }
    };

    Recipe {
        name,
        ingredients,
        instructions,
        nutrition,
    }
}

/// Mapping rule: any non-null value is kept, absence or null becomes `{}`.
fn mapping(fields: Option<&Map<String, Value>>, key: &str) -> Value {
    match fields.and_then(|f| f.get(key)) {
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(value) => value.clone(),
    }
}

/// Sequence rule: arrays are kept, a lone value is wrapped, absence or null
/// becomes `[]`.
fn sequence(fields: Option<&Map<String, Value>>, key: &str) -> Vec<Value> {
    match fields.and_then(|f| f.get(key)) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(value) => vec![value.clone()],
    }
}

/// Find the first key whose letters and digits, lowercased, match an alias.
fn lookup<'a>(fields: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        fields
            .iter()
            .find(|(key, _)| canonical_key(key) == *alias)
            .map(|(_, value)| value)
    })
}

fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn step_text(step: &Value) -> Option<String> {
    match step {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => ["instruction", "text", "description", "step"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| Some(step.to_string())),
        other => Some(other.to_string()),
    }
}
