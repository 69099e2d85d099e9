//! TLS bootstrap: make sure a key and certificate exist on disk, then build
//! the rustls server configuration for the HTTPS listener.

use chrono::{Datelike, Duration as ChronoDuration, Utc};
use rcgen::{CertificateParams, DnType, KeyPair};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const KEY_FILE: &str = "key.pem";
pub const CERT_FILE: &str = "cert.pem";
pub const COMMON_NAME: &str = "localhost";

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Certificate I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),

    #[error("Malformed PEM material: {0}")]
    Pem(String),

    #[error("TLS configuration rejected: {0}")]
    Config(#[from] rustls::Error),
}

/// A PEM private key and self-signed certificate for one identity.
#[derive(Clone)]
pub struct CertificateMaterial {
    pub key_pem: String,
    pub cert_pem: String,
}

impl std::fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("key_pem", &"[REDACTED]")
            .field("cert_pem_len", &self.cert_pem.len())
            .finish()
    }
}

/// How the material came to be available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    Loaded,
    Generated,
}

#[derive(Debug, Clone)]
pub enum TlsState {
    Unprovisioned,
    Provisioned {
        material: CertificateMaterial,
        provisioning: Provisioning,
    },
}

/// File locations and validity window for the self-signed pair.
#[derive(Debug, Clone)]
pub struct TlsBootstrap {
    dir: PathBuf,
    validity_days: u32,
}

impl TlsBootstrap {
    pub fn new(dir: impl Into<PathBuf>, validity_days: u32) -> Self {
        Self {
            dir: dir.into(),
            validity_days,
        }
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    pub fn cert_path(&self) -> PathBuf {
        self.dir.join(CERT_FILE)
    }

    /// Load the pair if both files exist and are within the validity window,
    /// otherwise generate and persist a fresh one.
    ///
    /// Runs once before any listener accepts connections.
    pub async fn ensure(&self) -> Result<TlsState, TlsError> {
        let key_path = self.key_path();
        let cert_path = self.cert_path();

        if fs::try_exists(&key_path).await? && fs::try_exists(&cert_path).await? {
            if self.is_expired(&cert_path).await? {
                tracing::warn!(
                    cert = %cert_path.display(),
                    validity_days = self.validity_days,
                    "Certificate is older than its validity window, regenerating"
                );
            } else {
                let material = CertificateMaterial {
                    key_pem: fs::read_to_string(&key_path).await?,
                    cert_pem: fs::read_to_string(&cert_path).await?,
                };
                tracing::info!(dir = %self.dir.display(), "Loaded existing certificate");
                return Ok(TlsState::Provisioned {
                    material,
                    provisioning: Provisioning::Loaded,
                });
            }
        }

        let material = generate_self_signed(self.validity_days)?;
        fs::create_dir_all(&self.dir).await?;
        write_private_key(&key_path, &material.key_pem).await?;
        fs::write(&cert_path, &material.cert_pem).await?;

        tracing::info!(
            dir = %self.dir.display(),
            common_name = COMMON_NAME,
            validity_days = self.validity_days,
            "Generated self-signed certificate"
        );

        Ok(TlsState::Provisioned {
            material,
            provisioning: Provisioning::Generated,
        })
    }

    async fn is_expired(&self, cert_path: &Path) -> Result<bool, TlsError> {
        let modified = fs::metadata(cert_path).await?.modified()?;
        let window = Duration::from_secs(u64::from(self.validity_days) * 24 * 60 * 60);
        // A clock behind the file's mtime counts as fresh.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(age > window)
    }
}

/// Generate a key pair and a certificate for `CN=localhost` valid from today
/// for `validity_days`.
pub fn generate_self_signed(validity_days: u32) -> Result<CertificateMaterial, TlsError> {
    let mut params = CertificateParams::new(vec![COMMON_NAME.to_string()])?;
    params
        .distinguished_name
        .push(DnType::CommonName, COMMON_NAME);

    let today = Utc::now().date_naive();
    let expires = today + ChronoDuration::days(i64::from(validity_days));
    params.not_before = rcgen::date_time_ymd(today.year(), today.month() as u8, today.day() as u8);
    params.not_after =
        rcgen::date_time_ymd(expires.year(), expires.month() as u8, expires.day() as u8);

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    Ok(CertificateMaterial {
        key_pem: key_pair.serialize_pem(),
        cert_pem: cert.pem(),
    })
}

/// Build the HTTPS server configuration, advertising h2 and http/1.1.
pub fn server_config(material: &CertificateMaterial) -> Result<Arc<ServerConfig>, TlsError> {
    let certs = CertificateDer::pem_slice_iter(material.cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::Pem(format!("failed to parse certificates: {e}")))?;
    if certs.is_empty() {
        return Err(TlsError::Pem("no certificates found".into()));
    }

    let key = PrivateKeyDer::from_pem_slice(material.key_pem.as_bytes())
        .map_err(|e| TlsError::Pem(format!("failed to parse private key: {e}")))?;

    let mut config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Write the key readable by its owner only. The file may already exist
/// with wider permissions when a stale pair is regenerated.
async fn write_private_key(path: &Path, pem: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    file.write_all(pem.as_bytes()).await?;
    file.flush().await
}
