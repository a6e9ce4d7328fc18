use serde::{Deserialize, Serialize};

use crate::eligibility::Criteria;

/// Cheap pre-check outcome attached at retrieval time.
///
/// Only exclusions are checked, so the guess is never "eligible": a candidate is either
/// already excluded or still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provisional {
    /// An exclusion term matched; the candidate is ineligible.
    Excluded,
    /// No exclusion matched; eligibility is decided by the critic.
    Indeterminate,
}

impl Provisional {
    /// Returns `true` if the pre-check already ruled the candidate out.
    pub fn is_excluded(self) -> bool {
        matches!(self, Provisional::Excluded)
    }

    /// The pre-check's vote in the final conjunction.
    pub fn permits(self) -> bool {
        !self.is_excluded()
    }
}

/// One (patient, trial) pairing produced by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub patient_id: String,
    /// NCT id of the trial.
    pub trial_id: String,
    #[serde(default)]
    pub title: String,
    pub criteria: Criteria,
    /// Retrieval engine score; higher is more relevant.
    pub similarity_score: f32,
    pub provisional: Provisional,
    /// Pre-check reasons; empty when nothing was excluded.
    #[serde(default)]
    pub reasons: Vec<String>,
}
