use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Gemini REST base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default JSON/multipart body limit (10MB), matching inline base64 images.
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub common: core_config::Config,
    pub https: HttpsConfig,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub storage: StorageConfig,
    pub max_body_bytes: usize,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpsConfig {
    /// When false, neither the TLS bootstrap nor the HTTPS listener run.
    pub enabled: bool,
    pub port: u16,
    pub certificates_dir: PathBuf,
    pub validity_days: u32,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model for every text and multimodal request (e.g., gemini-2.5-flash-lite)
    pub text_model: String,
    pub temperature: f32,
    pub max_output_tokens: i32,
    /// Upper bound on a single generation call.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub prompts_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl AssistantConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        // The original deployments used a bare API_KEY variable.
        let api_key = match env::var("GOOGLE_API_KEY") {
            Ok(key) => key,
            Err(_) => get_env("API_KEY", None, is_prod)?,
        };

        Ok(AssistantConfig {
            common: common_config,
            https: HttpsConfig {
                enabled: parse_env("HTTPS_ENABLED", "true", is_prod)?,
                port: parse_env("HTTPS_PORT", "3443", is_prod)?,
                certificates_dir: get_env("CERTIFICATES_DIR", Some("certificates"), is_prod)?
                    .into(),
                validity_days: parse_env("CERT_VALIDITY_DAYS", "365", is_prod)?,
            },
            google: GoogleConfig {
                api_key: Secret::new(api_key),
                api_base: get_env("GENAI_API_BASE", Some(DEFAULT_API_BASE), is_prod)?,
            },
            models: ModelConfig {
                text_model: get_env("GENAI_TEXT_MODEL", Some("gemini-2.5-flash-lite"), is_prod)?,
                temperature: parse_env("GENAI_TEMPERATURE", "0.2", is_prod)?,
                max_output_tokens: parse_env("GENAI_MAX_OUTPUT_TOKENS", "8192", is_prod)?,
                timeout_secs: parse_env("GENAI_TIMEOUT_SECS", "60", is_prod)?,
            },
            storage: StorageConfig {
                prompts_dir: get_env("PROMPTS_DIR", Some("prompts"), is_prod)?.into(),
                uploads_dir: get_env("UPLOADS_DIR", Some("uploads"), is_prod)?.into(),
                artifacts_dir: get_env("ARTIFACTS_DIR", Some("artifacts"), is_prod)?.into(),
                static_dir: get_env("STATIC_DIR", Some("public"), is_prod)?.into(),
            },
            max_body_bytes: parse_env(
                "MAX_BODY_BYTES",
                &DEFAULT_MAX_BODY_BYTES.to_string(),
                is_prod,
            )?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = get_env(key, Some(default), is_prod)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}
