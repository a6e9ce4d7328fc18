//! Test fixtures for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use trialmatch::eligibility::{Criteria, EligibilityVerdict, Patient, PatientSummary, evaluate};
use trialmatch::embedding::StubEmbedder;
use trialmatch::reliability::RetryPolicy;
use trialmatch::vectordb::{MockTrialIndex, TrialMetadata};
use trialmatch::verifier::{Verifier, VerifierError};

pub const TEST_DIM: usize = 16;

pub const TEST_COLLECTION: &str = "trials-under-test";

#[derive(Default)]
pub struct TrialBuilder {
    nct_id: Option<String>,
    title: Option<String>,
    inclusion: Vec<String>,
    exclusion: Vec<String>,
    raw_criteria: Option<String>,
}

impl TrialBuilder {
    pub fn new(nct_id: &str) -> Self {
        Self {
            nct_id: Some(nct_id.to_string()),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn include(mut self, term: &str) -> Self {
        self.inclusion.push(term.to_string());
        self
    }

    pub fn exclude(mut self, term: &str) -> Self {
        self.exclusion.push(term.to_string());
        self
    }

    /// Stores criteria text verbatim, bypassing serialization.
    pub fn raw_criteria(mut self, raw: &str) -> Self {
        self.raw_criteria = Some(raw.to_string());
        self
    }

    pub fn build(self) -> TrialMetadata {
        let nct_id = self.nct_id.unwrap_or_else(|| "NCT00000000".to_string());
        let title = self.title.unwrap_or_else(|| format!("Study {nct_id}"));
        let meta = TrialMetadata::new(nct_id, title);
        match self.raw_criteria {
            Some(raw) => meta.with_raw_criteria(raw),
            None => meta.with_criteria(&Criteria::new(self.inclusion, self.exclusion)),
        }
    }
}

/// Asthma trial that excludes pregnancy.
pub fn asthma_trial() -> TrialMetadata {
    TrialBuilder::new("NCT01000001")
        .title("Inhaled corticosteroids for asthma")
        .include("asthma")
        .exclude("pregnant")
        .build()
}

/// Sleep trial whose exclusion text mentions anxiety.
pub fn sleep_trial() -> TrialMetadata {
    TrialBuilder::new("NCT01000002")
        .title("Cognitive therapy for insomnia")
        .include("insomnia")
        .exclude("generalized anxiety disorder")
        .build()
}

/// Diabetes trial with no exclusions.
pub fn diabetes_trial() -> TrialMetadata {
    TrialBuilder::new("NCT01000003")
        .title("Diet intervention in type 2 diabetes")
        .include("type 2 diabetes")
        .build()
}

pub fn sample_trials() -> Vec<TrialMetadata> {
    vec![asthma_trial(), sleep_trial(), diabetes_trial()]
}

pub fn sample_patients() -> Vec<Patient> {
    vec![
        Patient::new("PAT_00001", vec!["Asthma", "Anxiety"]),
        Patient::new("PAT_00002", vec!["Diabetes", "Hypertension"]),
        Patient::new("PAT_00003", vec!["Pregnant", "Asthma"]),
    ]
}

/// Mock index holding `trials`, each stored under the stub embedding of its title.
pub fn seeded_index(trials: Vec<TrialMetadata>) -> MockTrialIndex {
    let embedder = StubEmbedder::new(TEST_DIM);
    let index = MockTrialIndex::new(TEST_COLLECTION);
    for meta in trials {
        index.insert(embedder.embed_sync(&meta.title), meta);
    }
    index
}

pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        backoff: std::time::Duration::from_millis(1),
        call_timeout: std::time::Duration::from_secs(5),
    }
}

/// Deterministic verifier that counts calls.
#[derive(Default)]
pub struct CountingVerifier {
    calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for CountingVerifier {
    fn name(&self) -> &str {
        "counting"
    }

    async fn verify(
        &self,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(evaluate(criteria, patient))
    }
}
