use serde::{Deserialize, Serialize};

use crate::eligibility::Confidence;
use crate::retrieval::CandidateMatch;

/// A candidate with its authoritative verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(flatten)]
    pub candidate: CandidateMatch,
    pub final_eligible: bool,
    pub final_reasons: Vec<String>,
    pub confidence: Confidence,
}

impl VerificationResult {
    pub fn trial_id(&self) -> &str {
        &self.candidate.trial_id
    }
}

/// Fast-filter output: either settled already or waiting for the critic.
///
/// An escalated candidate has no final verdict yet; that is the only place an undetermined
/// verdict exists, and it never reaches persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum Triage {
    Settled(VerificationResult),
    Escalated(CandidateMatch),
}

impl Triage {
    pub fn is_escalated(&self) -> bool {
        matches!(self, Triage::Escalated(_))
    }

    /// Returns the settled result, or `None` for an escalated candidate.
    pub fn into_settled(self) -> Option<VerificationResult> {
        match self {
            Triage::Settled(result) => Some(result),
            Triage::Escalated(_) => None,
        }
    }
}

/// The per-patient record committed to [`Namespace::WorkflowPatient`](crate::cache::Namespace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedResult {
    pub patient_id: String,
    pub trials: Vec<VerificationResult>,
}

impl CommittedResult {
    /// Trials whose final verdict is eligible.
    pub fn eligible_trials(&self) -> impl Iterator<Item = &VerificationResult> {
        self.trials.iter().filter(|t| t.final_eligible)
    }
}

/// A patient that did not make it to a committed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientFailure {
    pub patient_id: String,
    pub error: String,
}

/// Outcome of a batch run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub committed: Vec<CommittedResult>,
    pub failures: Vec<PatientFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
