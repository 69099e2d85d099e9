use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body extractor that runs `validator` rules and rejects with
/// `AppError`, so malformed bodies get the same JSON error shape as every
/// other failure.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection, "Rejected JSON body");
    AppError::BadRequest(anyhow::anyhow!(
        "Invalid JSON body: {}",
        rejection.body_text()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::post};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Greeting {
        #[validate(length(min = 1))]
        name: String,
    }

    async fn greet(ValidatedJson(body): ValidatedJson<Greeting>) -> String {
        body.name
    }

    async fn send(body: &str, content_type: &str) -> (StatusCode, serde_json::Value) {
        let response = Router::new()
            .route("/", post(greet))
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", content_type)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn malformed_and_mistyped_bodies_are_json_400s() {
        for body in [r#"{"name": "#, r#"{"name": 5}"#] {
            let (status, json) = send(body, "application/json").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["success"], false);
            assert!(json["error"].as_str().unwrap().starts_with("Invalid JSON body"));
        }

        let (status, json) = send(r#"{"name": "x"}"#, "text/plain").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn failing_rules_are_validation_errors() {
        let (status, json) = send(r#"{"name": ""}"#, "application/json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Validation error");
        assert!(json["details"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn valid_body_reaches_handler() {
        let response = Router::new()
            .route("/", post(greet))
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name": "ada"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
