use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::hashing::trial_point_id;
use crate::vectordb::{TrialHit, TrialIndex, TrialMetadata, VectorDbError};

/// In-memory [`TrialIndex`] with exact cosine search.
///
/// Seeded through [`insert`](Self::insert); equal scores keep insertion order.
/// [`fail_searches`](Self::fail_searches) makes every search return a retryable error, for
/// exercising failure paths.
pub struct MockTrialIndex {
    collection: String,
    points: RwLock<Vec<MockStoredPoint>>,
    fail_searches: AtomicBool,
    search_calls: AtomicUsize,
}

struct MockStoredPoint {
    id: u64,
    vector: Vec<f32>,
    metadata: TrialMetadata,
}

impl Default for MockTrialIndex {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_COLLECTION_NAME)
    }
}

impl MockTrialIndex {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            points: RwLock::new(Vec::new()),
            fail_searches: AtomicBool::new(false),
            search_calls: AtomicUsize::new(0),
        }
    }

    /// Stores a trial under `vector`, replacing any point with the same NCT id.
    pub fn insert(&self, vector: Vec<f32>, metadata: TrialMetadata) {
        let entry = MockStoredPoint {
            id: trial_point_id(&metadata.nct_id),
            vector,
            metadata,
        };

        let mut stored = self.points.write();
        match stored.iter_mut().find(|p| p.id == entry.id) {
            Some(existing) => *existing = entry,
            None => stored.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Toggles search failure injection.
    pub fn fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    /// Number of `search` calls so far, failed ones included.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

impl TrialIndex for MockTrialIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn search(&self, query: Vec<f32>, limit: u64) -> Result<Vec<TrialHit>, VectorDbError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(VectorDbError::SearchFailed {
                collection: self.collection.clone(),
                message: "injected failure".to_string(),
            });
        }

        let mut results: Vec<TrialHit> = self
            .points
            .read()
            .iter()
            .map(|p| TrialHit {
                point_id: p.id.to_string(),
                score: cosine_similarity(&query, &p.vector),
                metadata: p.metadata.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        results.truncate(limit as usize);
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), VectorDbError> {
        Ok(())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
