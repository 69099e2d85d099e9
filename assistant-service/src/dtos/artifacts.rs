use crate::models::NormalizedRecord;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ArtifactListResponse {
    pub success: bool,
    pub kind: String,
    /// File names, newest first.
    pub artifacts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LatestArtifactResponse {
    pub success: bool,
    pub file: String,
    pub created_at: String,
    pub data: NormalizedRecord,
}
