//! Text-to-vector collaborators.
//!
//! - [`StubEmbedder`] is deterministic and offline.
//! - [`HttpEmbedder`] calls an OpenAI-compatible embeddings endpoint.
//!
//! [`EmbedderBackend`] picks one from [`Config`].

mod error;
/// OpenAI-compatible HTTP embedder.
pub mod http;
/// Hash-seeded stub embedder.
pub mod stub;


pub use error::EmbeddingError;
pub use http::HttpEmbedder;
pub use stub::{STUB_MODEL_ID, StubEmbedder, l2_normalize};

use std::future::Future;

use crate::config::{Config, EmbedderKind};

/// Fixed-length embedding of free text.
pub trait Embedder: Send + Sync {
    /// Identifies the model; vectors from different models are not comparable.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Embeds `text`.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

/// Embedder selected at startup.
#[derive(Debug, Clone)]
pub enum EmbedderBackend {
    Stub(StubEmbedder),
    Http(HttpEmbedder),
}

impl EmbedderBackend {
    /// Builds the embedder named by `config.embedder`. The HTTP backend needs `OPENAI_API_KEY`.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingError> {
        match config.embedder {
            EmbedderKind::Stub => Ok(Self::Stub(StubEmbedder::new(config.embedding_dim))),
            EmbedderKind::OpenAi => {
                let api_key = Config::api_key().map_err(|e| EmbeddingError::InvalidConfig {
                    reason: e.to_string(),
                })?;
                Ok(Self::Http(HttpEmbedder::new(
                    &config.embedding_url,
                    config.embedding_model.clone(),
                    api_key,
                    config.embedding_dim,
                )?))
            }
        }
    }

    /// Returns `true` for the offline stub.
    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub(_))
    }
}

impl Embedder for EmbedderBackend {
    fn model_id(&self) -> &str {
        match self {
            Self::Stub(e) => e.model_id(),
            Self::Http(e) => e.model_id(),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Self::Stub(e) => e.dimension(),
            Self::Http(e) => e.dimension(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            Self::Stub(e) => e.embed(text).await,
            Self::Http(e) => e.embed(text).await,
        }
    }
}
