use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use super::*;
use crate::cache::{CacheError, CacheStore, JsonFileStore, MemoryStore, Namespace};
use crate::eligibility::{Confidence, Criteria, EligibilityVerdict, Patient, PatientSummary};
use crate::embedding::StubEmbedder;
use crate::reliability::RetryPolicy;
use crate::retrieval::{CandidateMatch, Provisional};
use crate::vectordb::{MockTrialIndex, TrialMetadata};
use crate::verifier::{RuleVerifier, TrialRef, Verifier, VerifierError};

const DIM: usize = 8;

#[derive(Clone, Copy)]
enum Mode {
    Rule,
    Unavailable,
    LostWrite,
}

/// Verifier double: records which trials it saw and answers per `mode`.
struct RecordingVerifier {
    mode: Mode,
    calls: AtomicUsize,
    seen: Mutex<Vec<Criteria>>,
}

impl RecordingVerifier {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for RecordingVerifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn verify(
        &self,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(criteria.clone());
        match self.mode {
            Mode::Rule => Ok(crate::eligibility::evaluate(criteria, patient)),
            Mode::Unavailable => Err(VerifierError::Chat {
                message: "service unavailable".to_string(),
            }),
            Mode::LostWrite => Err(VerifierError::Cache(CacheError::Io {
                path: "critic_agent.json".into(),
                source: std::io::Error::other("disk full"),
            })),
        }
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
        call_timeout: Duration::from_secs(5),
    }
}

fn candidate(trial_id: &str, criteria: Criteria, provisional: Provisional) -> CandidateMatch {
    let reasons = match provisional {
        Provisional::Excluded => vec![format!("Exclusion pre-check matched: {trial_id}")],
        Provisional::Indeterminate => Vec::new(),
    };
    CandidateMatch {
        patient_id: "PAT_00001".to_string(),
        trial_id: trial_id.to_string(),
        title: format!("Trial {trial_id}"),
        criteria,
        similarity_score: 0.5,
        provisional,
        reasons,
    }
}

fn asthma_criteria() -> Criteria {
    Criteria::new(["asthma"], ["pregnant"])
}

fn asthma_patient() -> Patient {
    Patient::new("PAT_00001", vec!["Asthma", "Anxiety"])
}

fn asthma_trial() -> TrialMetadata {
    TrialMetadata::new("NCT100", "Asthma inhaler study").with_criteria(&asthma_criteria())
}

fn anxiety_excluding_trial() -> TrialMetadata {
    TrialMetadata::new("NCT200", "Sleep study")
        .with_criteria(&Criteria::new(["insomnia"], ["generalized anxiety disorder"]))
}

fn diabetes_trial() -> TrialMetadata {
    TrialMetadata::new("NCT300", "Diabetes diet study")
        .with_criteria(&Criteria::new(["diabetes"], Vec::<String>::new()))
}

fn seeded_index(trials: Vec<TrialMetadata>) -> MockTrialIndex {
    let index = MockTrialIndex::new("trials");
    add_trials(&index, trials);
    index
}

fn add_trials(index: &MockTrialIndex, trials: Vec<TrialMetadata>) {
    let embedder = StubEmbedder::new(DIM);
    for meta in trials {
        index.insert(embedder.embed_sync(&meta.title), meta);
    }
}

fn pipeline(
    index: MockTrialIndex,
    store: Arc<MemoryStore>,
    verifier: Arc<dyn Verifier>,
) -> MatchPipeline<StubEmbedder, MockTrialIndex, MemoryStore> {
    MatchPipeline::new(StubEmbedder::new(DIM), index, store, verifier)
        .with_retry_policy(fast_policy())
}

fn trial<'a>(result: &'a CommittedResult, trial_id: &str) -> &'a VerificationResult {
    result
        .trials
        .iter()
        .find(|t| t.trial_id() == trial_id)
        .unwrap()
}

#[test]
fn test_transition_edges() {
    let edges = [
        (Transition::Retrieved, Stage::Retrieve, Stage::FastFilter),
        (Transition::Escalate, Stage::FastFilter, Stage::Critic),
        (Transition::SkipCritic, Stage::FastFilter, Stage::Persist),
        (Transition::Verified, Stage::Critic, Stage::Persist),
        (Transition::Committed, Stage::Persist, Stage::Done),
    ];
    for (transition, from, to) in edges {
        assert_eq!(transition.from(), from, "{transition:?}");
        assert_eq!(transition.to(), to, "{transition:?}");
    }
    assert_eq!(Stage::FastFilter.to_string(), "fast_filter");
}

#[test]
fn test_fast_filter_settles_excluded_and_keeps_order() {
    let triaged = fast_filter(vec![
        candidate("A", asthma_criteria(), Provisional::Indeterminate),
        candidate("B", asthma_criteria(), Provisional::Excluded),
        candidate("C", asthma_criteria(), Provisional::Indeterminate),
    ]);

    assert_eq!(triaged.len(), 3);
    assert!(triaged[0].is_escalated());
    assert!(triaged[2].is_escalated());

    let Triage::Settled(settled) = &triaged[1] else {
        panic!("excluded candidate must settle");
    };
    assert_eq!(settled.trial_id(), "B");
    assert!(!settled.final_eligible);
    assert_eq!(settled.final_reasons, vec!["Exclusion pre-check matched: B"]);
    assert_eq!(settled.confidence, Confidence::High);
}

#[test]
fn test_route() {
    assert_eq!(route(&[]), FilterRoute::SkipCritic);

    let settled_only = fast_filter(vec![candidate("B", asthma_criteria(), Provisional::Excluded)]);
    assert_eq!(route(&settled_only), FilterRoute::SkipCritic);

    let mixed = fast_filter(vec![
        candidate("A", asthma_criteria(), Provisional::Indeterminate),
        candidate("B", asthma_criteria(), Provisional::Excluded),
    ]);
    assert_eq!(route(&mixed), FilterRoute::Escalate);
}

#[test]
fn test_filter_routes_leave_the_fast_filter() {
    for edge in [FilterRoute::Escalate, FilterRoute::SkipCritic] {
        assert_eq!(edge.transition().from(), Stage::FastFilter);
    }
    assert_eq!(FilterRoute::Escalate.transition(), Transition::Escalate);
    assert_eq!(FilterRoute::SkipCritic.transition().to(), Stage::Persist);
}

#[test]
fn test_settle_is_conjunction() {
    let open = settle(
        candidate("A", asthma_criteria(), Provisional::Indeterminate),
        EligibilityVerdict::eligible("ok"),
    );
    let vetoed = settle(
        candidate("B", asthma_criteria(), Provisional::Excluded),
        EligibilityVerdict::eligible("ok"),
    );
    let rejected = settle(
        candidate("C", asthma_criteria(), Provisional::Indeterminate),
        EligibilityVerdict::ineligible("no"),
    );

    assert!(open.final_eligible);
    assert!(!vetoed.final_eligible);
    assert!(!rejected.final_eligible);
    assert_eq!(rejected.final_reasons, vec!["no"]);
}

#[tokio::test]
async fn test_critic_only_sees_escalated_candidates() {
    let verifier = RecordingVerifier::new(Mode::Rule);
    let excluded_criteria = Criteria::new(["asthma"], ["anxiety"]);
    let triaged = fast_filter(vec![
        candidate("A", asthma_criteria(), Provisional::Indeterminate),
        candidate("B", excluded_criteria.clone(), Provisional::Excluded),
    ]);

    let verified = critic(
        &verifier,
        &fast_policy(),
        &asthma_patient().summary(),
        triaged,
    )
    .await
    .unwrap();

    assert_eq!(verifier.calls(), 1);
    assert!(!verifier.seen.lock().contains(&excluded_criteria));
    let ids: Vec<_> = verified.iter().map(|v| v.trial_id()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert!(verified[0].final_eligible);
    assert_eq!(verified[0].final_reasons, vec!["Inclusion met, no exclusions"]);
}

/// Verifier double that records the trial each escalation names.
#[derive(Default)]
struct TrialNamingVerifier {
    trials: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Verifier for TrialNamingVerifier {
    fn name(&self) -> &str {
        "trial-naming"
    }

    async fn verify(
        &self,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        Ok(crate::eligibility::evaluate(criteria, patient))
    }

    async fn verify_trial(
        &self,
        trial: TrialRef<'_>,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        self.trials
            .lock()
            .push((trial.trial_id.to_string(), trial.title.to_string()));
        self.verify(criteria, patient).await
    }
}

#[tokio::test]
async fn test_critic_names_the_trial_to_the_verifier() {
    let verifier = TrialNamingVerifier::default();
    let triaged = fast_filter(vec![
        candidate("A", asthma_criteria(), Provisional::Indeterminate),
        candidate("B", asthma_criteria(), Provisional::Excluded),
    ]);

    critic(
        &verifier,
        &fast_policy(),
        &asthma_patient().summary(),
        triaged,
    )
    .await
    .unwrap();

    assert_eq!(
        *verifier.trials.lock(),
        vec![("A".to_string(), "Trial A".to_string())]
    );
}

#[tokio::test]
async fn test_critic_falls_back_to_conservative_verdict() {
    let verifier = RecordingVerifier::new(Mode::Unavailable);
    let triaged = fast_filter(vec![candidate(
        "A",
        asthma_criteria(),
        Provisional::Indeterminate,
    )]);

    let verified = critic(
        &verifier,
        &fast_policy(),
        &asthma_patient().summary(),
        triaged,
    )
    .await
    .unwrap();

    assert_eq!(verifier.calls(), 3);
    assert!(!verified[0].final_eligible);
    assert_eq!(verified[0].confidence, Confidence::Low);
    assert!(verified[0].final_reasons[0].starts_with(VERIFICATION_UNAVAILABLE_PREFIX));
}

#[tokio::test]
async fn test_critic_lost_write_fails_patient() {
    let verifier = RecordingVerifier::new(Mode::LostWrite);
    let triaged = fast_filter(vec![candidate(
        "A",
        asthma_criteria(),
        Provisional::Indeterminate,
    )]);

    let err = critic(
        &verifier,
        &fast_policy(),
        &asthma_patient().summary(),
        triaged,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Verifier(_)));
    assert_eq!(verifier.calls(), 1);
}

#[test]
fn test_persist_first_write_wins() {
    let store = MemoryStore::new();
    let first = vec![settle(
        candidate("A", asthma_criteria(), Provisional::Indeterminate),
        EligibilityVerdict::eligible("ok"),
    )];
    let second = vec![settle(
        candidate("B", asthma_criteria(), Provisional::Indeterminate),
        EligibilityVerdict::ineligible("no"),
    )];

    let a = persist(&store, "PAT_00001", first.clone()).unwrap();
    let b = persist(&store, "PAT_00001", second).unwrap();

    assert_eq!(a.trials, first);
    assert_eq!(b, a);
    assert!(store.contains(Namespace::WorkflowPatient, "PAT_00001"));
}

#[test]
fn test_persist_write_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();
    let store = JsonFileStore::new(blocker.join("cache"));

    assert!(persist(&store, "PAT_00001", Vec::new()).is_err());
}

#[tokio::test]
async fn test_run_escalates_and_commits() {
    let store = Arc::new(MemoryStore::new());
    let verifier = Arc::new(RecordingVerifier::new(Mode::Rule));
    let index = seeded_index(vec![asthma_trial(), anxiety_excluding_trial()]);
    let pipeline = pipeline(index, Arc::clone(&store), verifier.clone());

    let (result, path) = pipeline.run_traced(&asthma_patient(), 10).await.unwrap();

    assert_eq!(
        path,
        vec![
            Transition::Retrieved,
            Transition::Escalate,
            Transition::Verified,
            Transition::Committed,
        ]
    );
    assert_eq!(result.patient_id, "PAT_00001");
    assert_eq!(result.trials.len(), 2);
    assert_eq!(verifier.calls(), 1);

    let asthma = trial(&result, "NCT100");
    assert!(asthma.final_eligible);
    assert_eq!(asthma.confidence, Confidence::High);

    let sleep = trial(&result, "NCT200");
    assert!(!sleep.final_eligible);
    assert_eq!(
        sleep.final_reasons,
        vec!["Exclusion pre-check matched: generalized anxiety disorder"]
    );

    assert!(store.contains(Namespace::WorkflowPatient, "PAT_00001"));
    assert!(store.contains(Namespace::EmbeddingCache, "PAT_00001"));
}

#[tokio::test]
async fn test_run_skips_critic_when_everything_is_excluded() {
    let verifier = Arc::new(RecordingVerifier::new(Mode::Rule));
    let index = seeded_index(vec![anxiety_excluding_trial()]);
    let pipeline = pipeline(index, Arc::new(MemoryStore::new()), verifier.clone());

    let (result, path) = pipeline.run_traced(&asthma_patient(), 10).await.unwrap();

    assert_eq!(
        path,
        vec![
            Transition::Retrieved,
            Transition::SkipCritic,
            Transition::Committed,
        ]
    );
    assert_eq!(verifier.calls(), 0);
    assert_eq!(result.eligible_trials().count(), 0);
}

#[tokio::test]
async fn test_run_with_no_candidates_commits_empty_result() {
    let index = seeded_index(Vec::new());
    let pipeline = pipeline(
        index,
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingVerifier::new(Mode::Rule)),
    );

    let (result, path) = pipeline.run_traced(&asthma_patient(), 10).await.unwrap();

    assert!(result.trials.is_empty());
    assert_eq!(path[1], Transition::SkipCritic);
}

#[tokio::test]
async fn test_rerun_returns_first_committed_result() {
    let store = Arc::new(MemoryStore::new());
    let index = seeded_index(vec![asthma_trial()]);
    let pipeline = pipeline(
        index,
        Arc::clone(&store),
        Arc::new(RuleVerifier::new(Arc::clone(&store))),
    );

    let first = pipeline.run(&asthma_patient(), 10).await.unwrap();
    assert_eq!(store.len(Namespace::CriticAgent), 1);

    add_trials(pipeline.retriever().index(), vec![diabetes_trial()]);
    let second = pipeline.run(&asthma_patient(), 10).await.unwrap();

    // The new trial was verified, but the committed result is the first one.
    assert_eq!(store.len(Namespace::CriticAgent), 2);
    assert_eq!(first.trials.len(), 1);
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_run_rejects_blank_patient_id() {
    let index = seeded_index(vec![asthma_trial()]);
    let pipeline = pipeline(
        index,
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingVerifier::new(Mode::Rule)),
    );

    let err = pipeline
        .run(&Patient::new("  ", vec!["Asthma"]), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidPatient { .. }));
    assert_eq!(pipeline.retriever().index().search_calls(), 0);
}

#[tokio::test]
async fn test_run_surfaces_retrieval_failure() {
    let store = Arc::new(MemoryStore::new());
    let index = seeded_index(vec![asthma_trial()]);
    index.fail_searches(true);
    let pipeline = pipeline(
        index,
        Arc::clone(&store),
        Arc::new(RecordingVerifier::new(Mode::Rule)),
    );

    let err = pipeline.run(&asthma_patient(), 10).await.unwrap_err();

    assert!(matches!(err, PipelineError::Retrieval(_)));
    assert!(!store.contains(Namespace::WorkflowPatient, "PAT_00001"));
}

#[tokio::test]
async fn test_run_batch_reports_failures_and_keeps_order() {
    let index = seeded_index(vec![asthma_trial(), diabetes_trial()]);
    let pipeline = pipeline(
        index,
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingVerifier::new(Mode::Rule)),
    )
    .with_concurrency(3);

    let patients = vec![
        Patient::new("PAT_00001", vec!["Asthma"]),
        Patient::new("", vec!["Asthma"]),
        Patient::new("PAT_00003", vec!["Diabetes"]),
        Patient::new("PAT_00004", vec!["Migraine"]),
    ];

    let report = pipeline.run_batch(&patients, 10).await;

    let ids: Vec<_> = report
        .committed
        .iter()
        .map(|r| r.patient_id.as_str())
        .collect();
    assert_eq!(ids, vec!["PAT_00001", "PAT_00003", "PAT_00004"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].patient_id, "");
    assert!(!report.is_complete());

    let diabetic = &report.committed[1];
    assert!(trial(diabetic, "NCT300").final_eligible);
    assert!(!trial(diabetic, "NCT100").final_eligible);
    assert_eq!(report.committed[2].eligible_trials().count(), 0);
}

#[test]
fn test_verification_result_serializes_flat() {
    let result = settle(
        candidate("NCT100", asthma_criteria(), Provisional::Indeterminate),
        EligibilityVerdict::eligible("Inclusion met, no exclusions"),
    );

    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["trial_id"], "NCT100");
    assert_eq!(value["provisional"], "indeterminate");
    assert_eq!(value["final_eligible"], true);
    assert_eq!(value["confidence"], "high");
    assert!(value.get("candidate").is_none());

    let decoded: VerificationResult = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, result);
}
