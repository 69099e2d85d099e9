//! Artifact persistence.
//!
//! Artifacts are named `<prefix>_<epoch-millis>.json` with the timestamp
//! zero-padded to 13 digits, so lexicographic order is creation order.
//! Bodies are written to a hidden temporary file and hard-linked into place,
//! so a final name only ever holds a complete record and is never replaced.

use crate::models::{Artifact, NormalizedRecord, RecordKind};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No {0} artifacts found")]
    NotFound(RecordKind),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `record` under a new timestamped name. Never overwrites.
    async fn save(&self, record: &NormalizedRecord) -> Result<Artifact, ArtifactError>;

    /// Most recent artifact of `kind`.
    async fn latest(&self, kind: RecordKind) -> Result<Artifact, ArtifactError>;

    /// Names of all artifacts of `kind`, newest first.
    async fn list(&self, kind: RecordKind) -> Result<Vec<String>, ArtifactError>;
}

/// Directory-backed store. The directory is scanned on every lookup.
pub struct FsArtifactStore {
    base_path: PathBuf,
}

impl FsArtifactStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    /// Persist `record` as the artifact stamped `created_at_millis`. Fails
    /// with `Io` (`AlreadyExists`) when that name is taken.
    pub async fn save_at(
        &self,
        record: &NormalizedRecord,
        created_at_millis: i64,
    ) -> Result<Artifact, ArtifactError> {
        let kind = record.kind();
        let name = artifact_name(kind, created_at_millis);
        let body = serde_json::to_vec_pretty(record)?;

        fs::create_dir_all(&self.base_path).await?;
        let staging = self.base_path.join(format!(".{}.tmp", Uuid::new_v4()));
        let published = publish(&staging, &self.base_path.join(&name), &body).await;
        if let Err(e) = fs::remove_file(&staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %staging.display(), error = %e, "Failed to remove staging file");
            }
        }
        published?;

        tracing::info!(kind = %kind, file = %name, bytes = body.len(), "Artifact saved");

        Ok(Artifact {
            name,
            kind,
            created_at_millis,
            record: record.clone(),
        })
    }

    async fn matching_names(&self, kind: RecordKind) -> Result<Vec<(String, i64)>, ArtifactError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Some(millis) = parse_artifact_name(&name, kind) {
                names.push((name, millis));
            }
        }

        names.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(names)
    }
}

/// Write `body` to `staging`, then link it to `target`. Linking fails
/// rather than replacing an existing file.
async fn publish(staging: &Path, target: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)
        .await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    drop(file);

    fs::hard_link(staging, target).await
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(&self, record: &NormalizedRecord) -> Result<Artifact, ArtifactError> {
        self.save_at(record, Utc::now().timestamp_millis()).await
    }

    /// Newest artifact that decodes. Unreadable files are logged and skipped.
    async fn latest(&self, kind: RecordKind) -> Result<Artifact, ArtifactError> {
        for (name, created_at_millis) in self.matching_names(kind).await? {
            let bytes = fs::read(self.base_path.join(&name)).await?;
            let record = match NormalizedRecord::from_json(kind, &bytes) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(kind = %kind, file = %name, error = %e, "Skipping undecodable artifact");
                    continue;
                }
            };

            tracing::debug!(kind = %kind, file = %name, "Resolved latest artifact");

            return Ok(Artifact {
                name,
                kind,
                created_at_millis,
                record,
            });
        }

        Err(ArtifactError::NotFound(kind))
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<String>, ArtifactError> {
        Ok(self
            .matching_names(kind)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }
}

pub fn artifact_name(kind: RecordKind, millis: i64) -> String {
    format!("{}_{:013}.json", kind.artifact_prefix(), millis)
}

/// Timestamp encoded in `name` if it is an artifact of `kind`.
pub fn parse_artifact_name(name: &str, kind: RecordKind) -> Option<i64> {
    let digits = name
        .strip_prefix(kind.artifact_prefix())?
        .strip_prefix('_')?
        .strip_suffix(".json")?;

    if digits.len() != 13 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
