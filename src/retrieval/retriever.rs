use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::error::RetrievalError;
use super::types::{CandidateMatch, Provisional};
use crate::cache::{CacheStore, CacheStoreExt, Namespace};
use crate::eligibility::{Criteria, Patient, exclusion_hits, normalize};
use crate::embedding::Embedder;
use crate::reliability::{RetryPolicy, call_with_retry};
use crate::vectordb::{TrialHit, TrialIndex};

pub const PRECHECK_REASON_PREFIX: &str = "Exclusion pre-check matched: ";

/// Query vector memoized per patient in [`Namespace::EmbeddingCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEmbedding {
    pub model: String,
    pub vector: Vec<f32>,
}

/// Text used to embed a patient: `"Trial for {conditions}"`.
pub fn query_text(patient: &Patient) -> String {
    format!("Trial for {}", patient.conditions.join(", "))
}

/// Decodes the JSON-encoded criteria payload. An absent payload means empty criteria.
pub fn parse_criteria(raw: Option<&str>) -> Result<Criteria, serde_json::Error> {
    match raw {
        Some(text) => serde_json::from_str(text),
        None => Ok(Criteria::default()),
    }
}

/// Exclusion-only pre-check over already normalized `conditions`.
///
/// Every matching exclusion term becomes a reason. No match leaves the guess open.
pub fn precheck(criteria: &Criteria, conditions: &[String]) -> (Provisional, Vec<String>) {
    let hits = exclusion_hits(criteria, conditions);
    if hits.is_empty() {
        (Provisional::Indeterminate, Vec::new())
    } else {
        let reasons = hits
            .into_iter()
            .map(|term| format!("{PRECHECK_REASON_PREFIX}{term}"))
            .collect();
        (Provisional::Excluded, reasons)
    }
}

/// Candidate retrieval: embed the patient, search the trial index, pre-check each hit.
pub struct Retriever<E, I, S> {
    embedder: E,
    index: I,
    store: S,
    policy: RetryPolicy,
}

impl<E, I, S> Retriever<E, I, S>
where
    E: Embedder,
    I: TrialIndex,
    S: CacheStore,
{
    pub fn new(embedder: E, index: I, store: S) -> Self {
        Self {
            embedder,
            index,
            store,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns up to `top_k` candidates ordered by descending similarity.
    ///
    /// Hits with undecodable criteria are skipped with a warning. Ties keep the index's order.
    #[instrument(skip(self, patient), fields(patient_id = %patient.patient_id, top_k = top_k))]
    pub async fn retrieve(
        &self,
        patient: &Patient,
        top_k: usize,
    ) -> Result<Vec<CandidateMatch>, RetrievalError> {
        let query = self.query_vector(patient).await?;

        let limit = top_k as u64;
        let hits = call_with_retry(&self.policy, "trial_search", || {
            self.index.search(query.clone(), limit)
        })
        .await?;

        let hit_count = hits.len();
        let conditions = normalize(&patient.conditions);

        let mut candidates: Vec<CandidateMatch> = hits
            .into_iter()
            .take(top_k)
            .filter_map(|hit| self.to_candidate(patient, hit, &conditions))
            .collect();

        // Stable: equal scores keep the engine's order.
        candidates.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

        info!(
            hits = hit_count,
            candidates = candidates.len(),
            excluded = candidates.iter().filter(|c| c.provisional.is_excluded()).count(),
            "Retrieval complete"
        );

        Ok(candidates)
    }

    fn to_candidate(
        &self,
        patient: &Patient,
        hit: TrialHit,
        conditions: &[String],
    ) -> Option<CandidateMatch> {
        let TrialHit {
            score, metadata, ..
        } = hit;

        let criteria = match parse_criteria(metadata.structured_criteria.as_deref()) {
            Ok(criteria) => criteria,
            Err(e) => {
                warn!(
                    trial_id = %metadata.nct_id,
                    error = %e,
                    "Malformed structured criteria, skipping candidate"
                );
                return None;
            }
        };

        let (provisional, reasons) = precheck(&criteria, conditions);

        Some(CandidateMatch {
            patient_id: patient.patient_id.clone(),
            trial_id: metadata.nct_id,
            title: metadata.title,
            criteria,
            similarity_score: score,
            provisional,
            reasons,
        })
    }

    /// Returns the patient's query vector, embedding it at most once per patient and model.
    async fn query_vector(&self, patient: &Patient) -> Result<Vec<f32>, RetrievalError> {
        let key = patient.patient_id.as_str();
        let model = self.embedder.model_id();
        let dimension = self.embedder.dimension();

        if let Some(cached) = self
            .store
            .load::<CachedEmbedding>(Namespace::EmbeddingCache, key)
        {
            if cached.model == model && cached.vector.len() == dimension {
                debug!("Embedding cache hit");
                return Ok(cached.vector);
            }
            warn!(
                cached_model = %cached.model,
                cached_dim = cached.vector.len(),
                model,
                dimension,
                "Cached embedding does not match embedder, recomputing"
            );
        }

        let text = query_text(patient);
        let vector =
            call_with_retry(&self.policy, "embed", || self.embedder.embed(&text)).await?;

        self.store.save(
            Namespace::EmbeddingCache,
            key,
            &CachedEmbedding {
                model: model.to_string(),
                vector: vector.clone(),
            },
        )?;

        debug!(dimension = vector.len(), "Query embedding computed and cached");
        Ok(vector)
    }
}
