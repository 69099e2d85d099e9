//! Application startup and lifecycle management.
//!
//! One router serves two listeners: plain HTTP and, when TLS bootstrap
//! succeeds, HTTPS. Each runs as its own task and neither one's failure
//! stops the other. Startup fails only when no listener could be bound.

use crate::config::AssistantConfig;
use crate::handlers;
use crate::services::metrics::http_metrics_middleware;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::tls::{self, TlsBootstrap, TlsState};
use crate::services::{FsArtifactStore, GenerationClient, PromptLibrary, RecordPipeline, UploadStager};
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AssistantConfig,
    pub prompts: Arc<PromptLibrary>,
    pub pipeline: RecordPipeline,
    pub uploads: UploadStager,
}

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.storage.static_dir);
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/query", post(handlers::query))
        .route("/api/vision/parse-image", post(handlers::parse_image))
        .route("/api/vision/parse-text", post(handlers::parse_text))
        .route("/api/vision/parse-upload", post(handlers::parse_upload))
        .route("/api/doc/parse", post(handlers::parse_document))
        .route("/api/recipe/generate", post(handlers::generate_recipes))
        .route("/api/artifacts/:kind", get(handlers::list_artifacts))
        .route("/api/artifacts/:kind/latest", get(handlers::latest_artifact))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: Option<u16>,
    https_port: Option<u16>,
    http_listener: Option<TcpListener>,
    https: Option<(TcpListener, TlsAcceptor)>,
    router: Router,
}

impl Application {
    /// Build the application against the Gemini backend.
    pub async fn build(config: AssistantConfig) -> Result<Self, AppError> {
        let gemini_config = GeminiConfig {
            api_key: config.google.api_key.clone(),
            api_base: config.google.api_base.clone(),
            model: config.models.text_model.clone(),
            timeout: Duration::from_secs(config.models.timeout_secs),
        };
        let provider = GeminiTextProvider::new(gemini_config).map_err(|e| {
            tracing::error!("Failed to initialize Gemini provider: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        tracing::info!(
            model = %config.models.text_model,
            "Initialized Gemini text provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application with an explicit generation backend.
    pub async fn build_with_provider(
        config: AssistantConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let prompts = PromptLibrary::load(&config.storage.prompts_dir)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load prompt templates: {}", e);
                AppError::ConfigError(anyhow::Error::new(e))
            })?;

        let store = FsArtifactStore::new(&config.storage.artifacts_dir)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to initialize artifact store at {}: {}",
                    config.storage.artifacts_dir.display(),
                    e
                );
                AppError::InternalError(anyhow::Error::new(e))
            })?;

        let params = GenerationParams {
            temperature: Some(config.models.temperature),
            max_tokens: Some(config.models.max_output_tokens),
        };
        let generation = GenerationClient::new(
            provider,
            params,
            Duration::from_secs(config.models.timeout_secs),
        );

        // Reachability is reported, not required: requests fail with 502 later.
        let backend = generation.clone();
        tokio::spawn(async move {
            let _ = backend.check_backend().await;
        });

        let state = AppState {
            config: config.clone(),
            prompts: Arc::new(prompts),
            pipeline: RecordPipeline::new(generation, Arc::new(store)),
            uploads: UploadStager::new(&config.storage.uploads_dir),
        };
        let router = build_router(state);

        // Port 0 binds an ephemeral port (tests).
        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_bind = TcpListener::bind(http_addr).await;

        let https = if config.https.enabled {
            prepare_https(&config).await
        } else {
            tracing::info!("HTTPS disabled by configuration");
            None
        };
        let https_port = match &https {
            Some((listener, _)) => Some(listener.local_addr()?.port()),
            None => None,
        };

        let http_listener = match http_bind {
            Ok(listener) => Some(listener),
            Err(e) if https.is_some() => {
                tracing::error!("Failed to bind HTTP listener to {}: {}, serving HTTPS only", http_addr, e);
                None
            }
            Err(e) => {
                tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
                return Err(AppError::from(e));
            }
        };
        let http_port = match &http_listener {
            Some(listener) => Some(listener.local_addr()?.port()),
            None => None,
        };

        tracing::info!(
            http_port = ?http_port,
            https_port = ?https_port,
            "Assistant service listeners bound"
        );

        Ok(Self {
            http_port,
            https_port,
            http_listener,
            https,
            router,
        })
    }

    /// HTTP port, or `None` when the HTTP bind failed and HTTPS carries on alone.
    pub fn http_port(&self) -> Option<u16> {
        self.http_port
    }

    /// HTTPS port, or `None` when HTTPS is disabled or its bootstrap failed.
    pub fn https_port(&self) -> Option<u16> {
        self.https_port
    }

    /// Run every bound listener until all of them have stopped. Dropping the
    /// returned future aborts the listener tasks.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let mut listeners = JoinSet::new();

        if let Some(listener) = self.http_listener {
            let router = self.router.clone();
            listeners.spawn(async move { ("http", axum::serve(listener, router).await) });
        }
        if let Some((listener, acceptor)) = self.https {
            let router = self.router.clone();
            listeners.spawn(async move {
                serve_https(listener, acceptor, router).await;
                ("https", Ok(()))
            });
        }

        let mut failure = None;
        while let Some(joined) = listeners.join_next().await {
            match joined {
                Ok((name, Ok(()))) => tracing::warn!(listener = name, "Listener stopped"),
                Ok((name, Err(e))) => {
                    tracing::error!(listener = name, error = %e, "Listener failed");
                    failure.get_or_insert(e);
                }
                Err(e) => tracing::error!(error = %e, "Listener task aborted"),
            }
        }

        failure.map_or(Ok(()), Err)
    }
}

/// TLS bootstrap plus HTTPS bind. Any failure is logged and yields `None`.
async fn prepare_https(config: &AssistantConfig) -> Option<(TcpListener, TlsAcceptor)> {
    let bootstrap = TlsBootstrap::new(
        &config.https.certificates_dir,
        config.https.validity_days,
    );

    let material = match bootstrap.ensure().await {
        Ok(TlsState::Provisioned { material, .. }) => material,
        Ok(TlsState::Unprovisioned) => return None,
        Err(e) => {
            tracing::error!(error = %e, "TLS bootstrap failed, serving HTTP only");
            return None;
        }
    };

    let server_config = match tls::server_config(&material) {
        Ok(server_config) => server_config,
        Err(e) => {
            tracing::error!(error = %e, "Certificate material unusable, serving HTTP only");
            return None;
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.https.port));
    match TcpListener::bind(addr).await {
        Ok(listener) => Some((listener, TlsAcceptor::from(server_config))),
        Err(e) => {
            tracing::error!("Failed to bind HTTPS listener to {}: {}, serving HTTP only", addr, e);
            None
        }
    }
}

async fn serve_https(listener: TcpListener, acceptor: TlsAcceptor, router: Router) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "HTTPS accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let router = router.clone();

        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(tls_stream) => tls_stream,
                Err(e) => {
                    tracing::debug!(%peer, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                router.clone().call(request)
            });

            if let Err(e) = ConnectionBuilder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(tls_stream), service)
                .await
            {
                tracing::debug!(%peer, error = %e, "HTTPS connection ended with error");
            }
        });
    }
}
