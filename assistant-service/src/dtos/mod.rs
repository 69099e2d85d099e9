pub mod artifacts;
pub mod chat;
pub mod records;

pub use artifacts::{ArtifactListResponse, LatestArtifactResponse};
pub use chat::{QueryRequest, QueryResponse};
pub use records::{
    IngredientsInput, ParseImageRequest, ParseTextRequest, RecipeRequest, RecipeResponse,
    RecordResponse,
};
