//! Dual-listener startup: HTTP always, HTTPS when TLS bootstrap succeeds.

mod common;

use assistant_service::services::providers::mock::MockTextProvider;
use assistant_service::startup::Application;
use common::TestContext;
use std::time::Duration;

fn insecure_client() -> reqwest::Client {
    reqwest::Client::builder()
        .use_rustls_tls()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build HTTPS client")
}

#[tokio::test]
async fn health_is_served_over_http_and_https() {
    let mut ctx = TestContext::new();
    ctx.config.https.enabled = true;
    let certs_dir = ctx.config.https.certificates_dir.clone();

    let (http_port, https_port) = ctx.spawn().await;
    let https_port = https_port.expect("HTTPS listener should be running");

    assert!(certs_dir.join("key.pem").exists());
    assert!(certs_dir.join("cert.pem").exists());

    let response = reqwest::get(format!("http://127.0.0.1:{}/health", http_port))
        .await
        .expect("HTTP request failed");
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let response = insecure_client()
        .get(format!("https://localhost:{}/health", https_port))
        .send()
        .await
        .expect("HTTPS request failed");
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["service"], "assistant-service");
}

#[tokio::test]
async fn restart_reuses_existing_certificate() {
    let mut ctx = TestContext::new();
    ctx.config.https.enabled = true;
    let cert_path = ctx.config.https.certificates_dir.join("cert.pem");

    let (_, first) = ctx.spawn().await;
    assert!(first.is_some());
    let cert_before = std::fs::read(&cert_path).unwrap();

    let (_, second) = ctx.spawn().await;
    assert!(second.is_some());
    assert_eq!(std::fs::read(&cert_path).unwrap(), cert_before);
}

#[tokio::test]
async fn malformed_certificate_leaves_http_running() {
    let mut ctx = TestContext::new();
    ctx.config.https.enabled = true;
    let certs_dir = ctx.config.https.certificates_dir.clone();
    std::fs::create_dir_all(&certs_dir).unwrap();
    std::fs::write(certs_dir.join("key.pem"), "garbage").unwrap();
    std::fs::write(certs_dir.join("cert.pem"), "garbage").unwrap();

    let (http_port, https_port) = ctx.spawn().await;
    assert!(https_port.is_none());

    let response = reqwest::get(format!("http://127.0.0.1:{}/health", http_port))
        .await
        .expect("HTTP request failed");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn https_disabled_serves_http_only() {
    let ctx = TestContext::new();
    let (http_port, https_port) = ctx.spawn().await;

    assert!(https_port.is_none());
    assert!(!ctx.config.https.certificates_dir.exists());

    let response = reqwest::get(format!("http://127.0.0.1:{}/ready", http_port))
        .await
        .expect("HTTP request failed");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn taken_http_port_leaves_https_running() {
    let occupied = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let mut ctx = TestContext::new();
    ctx.config.common.port = occupied.local_addr().unwrap().port();
    ctx.config.https.enabled = true;

    let app = Application::build_with_provider(ctx.config.clone(), ctx.provider.clone())
        .await
        .expect("HTTPS alone should be enough to start");
    assert!(app.http_port().is_none());
    let https_port = app.https_port().expect("HTTPS listener should be running");
    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let response = insecure_client()
        .get(format!("https://localhost:{}/health", https_port))
        .send()
        .await
        .expect("HTTPS request failed");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn no_bindable_listener_fails_startup() {
    let occupied = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let mut ctx = TestContext::new();
    ctx.config.common.port = occupied.local_addr().unwrap().port();

    let result = Application::build_with_provider(ctx.config.clone(), ctx.provider.clone()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unreachable_backend_does_not_block_startup() {
    let ctx = TestContext::with_provider(MockTextProvider::new().unhealthy());
    let (http_port, _) = ctx.spawn().await;

    let response = reqwest::get(format!("http://127.0.0.1:{}/health", http_port))
        .await
        .expect("HTTP request failed");
    assert!(response.status().is_success());
}
