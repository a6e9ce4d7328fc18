//! Read-only trial vector index (Qdrant).

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::{QdrantTrialIndex, TrialIndex};
pub use error::VectorDbError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockTrialIndex, cosine_similarity};
pub use model::{TrialHit, TrialMetadata};
