//! Transient staging of uploaded files.

use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UploadStager {
    dir: PathBuf,
}

/// An upload written to the staging directory. Call [`StagedUpload::discard`]
/// once processing is over, whatever its outcome.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub size: usize,
}

impl UploadStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn stage(
        &self,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: &[u8],
    ) -> std::io::Result<StagedUpload> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(Uuid::new_v4().to_string());
        fs::write(&path, data).await?;

        let upload = StagedUpload {
            path,
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size: data.len(),
        };

        tracing::debug!(
            path = %upload.path.display(),
            filename = %upload.original_name,
            mime_type = %upload.mime_type,
            size = upload.size,
            "Upload staged"
        );

        Ok(upload)
    }
}

impl StagedUpload {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        fs::read(&self.path).await
    }

    /// Contents as text; invalid UTF-8 sequences are replaced.
    pub async fn read_text(&self) -> std::io::Result<String> {
        let bytes = self.read_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Remove the staged file. Failures are logged, not returned.
    pub async fn discard(self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stage_read_and_discard() {
        let dir = TempDir::new().unwrap();
        let stager = UploadStager::new(dir.path().join("uploads"));

        let upload = stager
            .stage("labs.txt", "text/plain", b"Glucose 5.1 mmol/L")
            .await
            .unwrap();
        let path = upload.path.clone();

        assert!(path.exists());
        assert!(!upload.is_image());
        assert_eq!(upload.read_text().await.unwrap(), "Glucose 5.1 mmol/L");

        upload.discard().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let dir = TempDir::new().unwrap();
        let stager = UploadStager::new(dir.path());
        let upload = stager
            .stage("scan.bin", "application/octet-stream", &[b'o', b'k', 0xff])
            .await
            .unwrap();

        assert_eq!(upload.read_text().await.unwrap(), "ok\u{fffd}");
        upload.discard().await;
    }
}
