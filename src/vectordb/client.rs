use std::future::Future;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::SearchPointsBuilder;

use super::error::VectorDbError;
use super::model::TrialHit;

/// Read-only nearest-neighbor index over trial vectors. Ingestion happens elsewhere.
pub trait TrialIndex: Send + Sync {
    /// Name of the collection searched.
    fn collection(&self) -> &str;

    /// Returns up to `limit` hits, most similar first.
    fn search(
        &self,
        query: Vec<f32>,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<TrialHit>, VectorDbError>> + Send;

    /// Checks that the backing service answers.
    fn health_check(&self) -> impl Future<Output = Result<(), VectorDbError>> + Send;
}

#[derive(Clone)]
/// Qdrant-backed trial index.
pub struct QdrantTrialIndex {
    client: Qdrant,
    url: String,
    collection: String,
}

impl QdrantTrialIndex {
    /// Creates a client for `url` bound to `collection`.
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.into(),
        })
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TrialIndex for QdrantTrialIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn search(&self, query: Vec<f32>, limit: u64) -> Result<Vec<TrialHit>, VectorDbError> {
        let search_builder =
            SearchPointsBuilder::new(&self.collection, query, limit).with_payload(true);

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorDbError::SearchFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        let results = search_result
            .result
            .into_iter()
            .filter_map(TrialHit::from_scored_point)
            .collect();

        Ok(results)
    }

    async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
