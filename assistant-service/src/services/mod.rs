pub mod artifacts;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod tls;
pub mod uploads;

pub use artifacts::{ArtifactError, ArtifactStore, FsArtifactStore};
pub use error::PipelineError;
pub use generation::{GenerationClient, GenerationError};
pub use pipeline::RecordPipeline;
pub use prompts::{PromptError, PromptLibrary};
pub use tls::{TlsBootstrap, TlsError, TlsState};
pub use uploads::{StagedUpload, UploadStager};
