//! Prometheus metrics for assistant-service.
//!
//! Provides HTTP, generation and artifact metrics for observability.

use axum::{extract::Request, middleware::Next, response::Response};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// HTTP metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Generation pipeline metrics
pub static GENAI_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static EXTRACTION_FAILURES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static ARTIFACTS_SAVED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    let http_requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "status"],
    )
    .expect("Failed to create http_requests_total metric");

    let http_request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["method"],
    )
    .expect("Failed to create http_request_duration_seconds metric");

    // outcome: ok, provider_error, timeout
    let genai_requests = IntCounterVec::new(
        Opts::new("genai_requests_total", "Total generation backend requests"),
        &["model", "modality", "outcome"],
    )
    .expect("Failed to create genai_requests_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "genai_provider_latency_seconds",
            "Generation backend latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )
    .expect("Failed to create genai_provider_latency_seconds metric");

    let extraction_failures = IntCounterVec::new(
        Opts::new(
            "extraction_failures_total",
            "Generator outputs that yielded no usable structure",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create extraction_failures_total metric");

    let artifacts_saved = IntCounterVec::new(
        Opts::new("artifacts_saved_total", "Artifacts written to the store"),
        &["kind"],
    )
    .expect("Failed to create artifacts_saved_total metric");

    // Register all metrics
    registry
        .register(Box::new(http_requests_total.clone()))
        .expect("Failed to register http_requests_total");
    registry
        .register(Box::new(http_request_duration.clone()))
        .expect("Failed to register http_request_duration_seconds");
    registry
        .register(Box::new(genai_requests.clone()))
        .expect("Failed to register genai_requests_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register genai_provider_latency_seconds");
    registry
        .register(Box::new(extraction_failures.clone()))
        .expect("Failed to register extraction_failures_total");
    registry
        .register(Box::new(artifacts_saved.clone()))
        .expect("Failed to register artifacts_saved_total");

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(http_requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(http_request_duration);
    let _ = GENAI_REQUESTS_TOTAL.set(genai_requests);
    let _ = GENAI_PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = EXTRACTION_FAILURES_TOTAL.set(extraction_failures);
    let _ = ARTIFACTS_SAVED_TOTAL.set(artifacts_saved);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

/// Axum middleware counting requests and timing them.
pub async fn http_metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();

    let response = next.run(req).await;

    record_http_request(
        &method,
        response.status().as_str(),
        start.elapsed().as_secs_f64(),
    );

    response
}

// Helper functions for recording metrics

/// Record a completed HTTP request.
pub fn record_http_request(method: &str, status: &str, duration_secs: f64) {
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[method, status]).inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[method])
            .observe(duration_secs);
    }
}

/// Record one generation call and its outcome.
pub fn record_genai_request(model: &str, modality: &str, outcome: &str) {
    if let Some(counter) = GENAI_REQUESTS_TOTAL.get() {
        counter
            .with_label_values(&[model, modality, outcome])
            .inc();
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = GENAI_PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

/// Record an extraction failure.
pub fn record_extraction_failure(kind: &str, reason: &str) {
    if let Some(counter) = EXTRACTION_FAILURES_TOTAL.get() {
        counter.with_label_values(&[kind, reason]).inc();
    }
}

/// Record a persisted artifact.
pub fn record_artifact_saved(kind: &str) {
    if let Some(counter) = ARTIFACTS_SAVED_TOTAL.get() {
        counter.with_label_values(&[kind]).inc();
    }
}
