use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, info, instrument, warn};

use super::error::PipelineError;
use super::stages::{critic, fast_filter, persist};
use super::state::{FilterRoute, PipelineContext, PipelineState, Transition, route};
use super::types::{BatchReport, CommittedResult, PatientFailure};
use crate::cache::CacheStore;
use crate::config::Config;
use crate::eligibility::Patient;
use crate::embedding::Embedder;
use crate::reliability::RetryPolicy;
use crate::retrieval::Retriever;
use crate::vectordb::TrialIndex;
use crate::verifier::Verifier;

/// Per-patient matching state machine.
///
/// Collaborators are injected: the retriever's embedder and index, the critic's verifier,
/// and one shared cache store.
pub struct MatchPipeline<E, I, S> {
    retriever: Retriever<E, I, Arc<S>>,
    verifier: Arc<dyn Verifier>,
    store: Arc<S>,
    policy: RetryPolicy,
    concurrency: usize,
}

impl<E, I, S> MatchPipeline<E, I, S>
where
    E: Embedder,
    I: TrialIndex,
    S: CacheStore,
{
    pub fn new(embedder: E, index: I, store: Arc<S>, verifier: Arc<dyn Verifier>) -> Self {
        Self {
            retriever: Retriever::new(embedder, index, Arc::clone(&store)),
            verifier,
            store,
            policy: RetryPolicy::default(),
            concurrency: 1,
        }
    }

    /// Retry policy for both the retrieval and critic collaborators.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retriever = self.retriever.with_retry_policy(policy);
        self.policy = policy;
        self
    }

    /// Patients processed at once by [`Self::run_batch`]. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Applies the retry and concurrency settings from `config`.
    pub fn configured(self, config: &Config) -> Self {
        self.with_retry_policy(config.retry_policy())
            .with_concurrency(config.concurrency)
    }

    pub fn retriever(&self) -> &Retriever<E, I, Arc<S>> {
        &self.retriever
    }

    pub fn verifier(&self) -> &dyn Verifier {
        self.verifier.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one patient to completion.
    pub async fn run(&self, patient: &Patient, top_k: usize) -> Result<CommittedResult, PipelineError> {
        self.run_traced(patient, top_k).await.map(|(result, _)| result)
    }

    /// Like [`Self::run`], also returning the transitions taken.
    #[instrument(skip(self, patient), fields(patient_id = %patient.patient_id))]
    pub async fn run_traced(
        &self,
        patient: &Patient,
        top_k: usize,
    ) -> Result<(CommittedResult, Vec<Transition>), PipelineError> {
        if patient.patient_id.trim().is_empty() {
            return Err(PipelineError::InvalidPatient {
                reason: "patient_id is empty".to_string(),
            });
        }

        let ctx = PipelineContext::new(patient, top_k);
        let mut path = Vec::with_capacity(4);
        let mut state = PipelineState::Retrieve;

        loop {
            let (transition, next) = match state {
                PipelineState::Retrieve => {
                    let candidates = self.retriever.retrieve(ctx.patient, ctx.top_k).await?;
                    (Transition::Retrieved, PipelineState::FastFilter { candidates })
                }
                PipelineState::FastFilter { candidates } => {
                    let triaged = fast_filter(candidates);
                    let edge = route(&triaged);
                    let next = match edge {
                        FilterRoute::Escalate => PipelineState::Critic { triaged },
                        FilterRoute::SkipCritic => {
                            let verified = triaged
                                .into_iter()
                                .filter_map(|t| t.into_settled())
                                .collect();
                            PipelineState::Persist { verified }
                        }
                    };
                    (edge.transition(), next)
                }
                PipelineState::Critic { triaged } => {
                    let verified =
                        critic(self.verifier.as_ref(), &self.policy, &ctx.summary, triaged).await?;
                    (Transition::Verified, PipelineState::Persist { verified })
                }
                PipelineState::Persist { verified } => {
                    let committed = persist(self.store.as_ref(), ctx.patient_id(), verified)?;
                    (Transition::Committed, PipelineState::Done(committed))
                }
                PipelineState::Done(result) => {
                    info!(
                        trials = result.trials.len(),
                        eligible = result.eligible_trials().count(),
                        "Patient committed"
                    );
                    return Ok((result, path));
                }
            };

            debug!(from = %transition.from(), to = %transition.to(), "Stage transition");
            path.push(transition);
            state = next;
        }
    }

    /// Runs every patient, up to the configured concurrency at a time.
    ///
    /// Committed results keep input order. A failed patient is logged, listed in
    /// [`BatchReport::failures`], and omitted from the committed results.
    pub async fn run_batch(&self, patients: &[Patient], top_k: usize) -> BatchReport {
        let outcomes: Vec<_> = stream::iter(patients)
            .map(|patient| async move { (patient, self.run(patient, top_k).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (patient, outcome) in outcomes {
            match outcome {
                Ok(result) => report.committed.push(result),
                Err(e) => {
                    warn!(patient_id = %patient.patient_id, error = %e, "Patient failed, omitted from results");
                    report.failures.push(PatientFailure {
                        patient_id: patient.patient_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            committed = report.committed.len(),
            failed = report.failures.len(),
            "Batch complete"
        );
        report
    }
}
