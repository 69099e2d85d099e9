//! HTTP handlers. Every route is served identically over HTTP and HTTPS.

pub mod artifacts;
pub mod chat;
pub mod documents;
pub mod health;
pub mod recipes;
pub mod vision;

mod upload;

pub use artifacts::{latest_artifact, list_artifacts};
pub use chat::query;
pub use documents::parse_document;
pub use health::{health_check, metrics_handler, readiness_check};
pub use recipes::generate_recipes;
pub use vision::{parse_image, parse_text, parse_upload};
