use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Query is required"))]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub response: String,
}
