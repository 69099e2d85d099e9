use crate::services::{StagedUpload, UploadStager};
use axum::extract::Multipart;
use service_core::error::AppError;

const DEFAULT_UPLOAD_MIME_TYPE: &str = "application/octet-stream";

/// Stage the multipart field called `name`, skipping any other fields.
pub(crate) async fn stage_named_field(
    multipart: &mut Multipart,
    name: &str,
    stager: &UploadStager,
) -> Result<StagedUpload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some(name) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("unnamed").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_UPLOAD_MIME_TYPE)
            .to_string();
        let data = field.bytes().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
        })?;

        if data.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
        }

        return Ok(stager.stage(original_name, mime_type, &data).await?);
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded")))
}
