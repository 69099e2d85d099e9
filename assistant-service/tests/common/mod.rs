#![allow(dead_code)]

use assistant_service::config::{
    AssistantConfig, GoogleConfig, HttpsConfig, ModelConfig, StorageConfig, DEFAULT_API_BASE,
};
use assistant_service::services::providers::mock::MockTextProvider;
use assistant_service::services::providers::GenerationParams;
use assistant_service::services::{
    FsArtifactStore, GenerationClient, PromptLibrary, RecordPipeline, UploadStager,
};
use assistant_service::startup::{build_router, AppState, Application};
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use secrecy::Secret;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const CHAT_PROMPT: &str = "You are a nutrition assistant.";
pub const VISION_PROMPT: &str = "Identify the food product and return JSON.";
pub const DOCUMENT_PROMPT: &str = "Extract the medical report as JSON.";

pub const BOUNDARY: &str = "assistant-test-boundary";

/// A temporary working directory laid out like a deployment, plus a
/// scripted generation backend.
pub struct TestContext {
    pub dir: TempDir,
    pub provider: Arc<MockTextProvider>,
    pub config: AssistantConfig,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_provider(MockTextProvider::new())
    }

    pub fn with_provider(provider: MockTextProvider) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();

        let prompts_dir = root.join("prompts");
        std::fs::create_dir_all(&prompts_dir).unwrap();
        std::fs::write(prompts_dir.join("ChatbotPrompt.txt"), CHAT_PROMPT).unwrap();
        std::fs::write(prompts_dir.join("VisionModulePrompt.txt"), VISION_PROMPT).unwrap();
        std::fs::write(prompts_dir.join("docParserPrompt.txt"), DOCUMENT_PROMPT).unwrap();

        let static_dir = root.join("public");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(
            static_dir.join("index.html"),
            "<!doctype html><title>Assistant</title>",
        )
        .unwrap();

        let config = AssistantConfig {
            common: service_core::config::Config {
                port: 0,
                log_level: "debug".to_string(),
            },
            https: HttpsConfig {
                enabled: false,
                port: 0,
                certificates_dir: root.join("certificates"),
                validity_days: 365,
            },
            google: GoogleConfig {
                api_key: Secret::new("test-api-key".to_string()),
                api_base: DEFAULT_API_BASE.to_string(),
            },
            models: ModelConfig {
                text_model: "mock-model".to_string(),
                temperature: 0.2,
                max_output_tokens: 1024,
                timeout_secs: 5,
            },
            storage: StorageConfig {
                prompts_dir,
                uploads_dir: root.join("uploads"),
                artifacts_dir: root.join("artifacts"),
                static_dir,
            },
            max_body_bytes: 10 * 1024 * 1024,
            otlp_endpoint: None,
        };

        Self {
            dir,
            provider: Arc::new(provider),
            config,
        }
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.config.storage.artifacts_dir.clone()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.config.storage.uploads_dir.clone()
    }

    /// Router wired exactly as the listeners serve it.
    pub async fn router(&self) -> Router {
        let prompts = PromptLibrary::load(&self.config.storage.prompts_dir)
            .await
            .expect("Failed to load prompts");
        let store = FsArtifactStore::new(&self.config.storage.artifacts_dir)
            .await
            .expect("Failed to create artifact store");
        let generation = GenerationClient::new(
            self.provider.clone(),
            GenerationParams::default(),
            Duration::from_secs(self.config.models.timeout_secs),
        );

        build_router(AppState {
            config: self.config.clone(),
            prompts: Arc::new(prompts),
            pipeline: RecordPipeline::new(generation, Arc::new(store)),
            uploads: UploadStager::new(&self.config.storage.uploads_dir),
        })
    }

    /// Build the full application and run it in the background.
    pub async fn spawn(&self) -> (u16, Option<u16>) {
        let app = Application::build_with_provider(self.config.clone(), self.provider.clone())
            .await
            .expect("Failed to build application");
        let http_port = app.http_port().expect("HTTP listener should be bound");
        let https_port = app.https_port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", http_port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        (http_port, https_port)
    }
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Single-file multipart request.
pub fn multipart_request(
    uri: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn files_in(dir: &std::path::Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect(),
        Err(_) => Vec::new(),
    }
}
