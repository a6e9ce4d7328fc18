use serde::{Deserialize, Serialize};

/// Reference verdict for one (patient, trial) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthLabel {
    pub trial_id: String,
    pub eligible: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Reference verdicts for every trial reported for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientGroundTruth {
    pub patient_id: String,
    #[serde(default)]
    pub matches: Vec<GroundTruthLabel>,
}

/// Confusion counts over the ground-truth pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Prediction quality against ground truth. Undefined ratios are reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub counts: ConfusionCounts,
}

/// A pair where prediction and ground truth disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// `PATIENT|TRIAL` key.
    pub key: String,
    pub predicted: bool,
    pub predicted_reasons: Vec<String>,
    pub truth: bool,
    pub truth_reasons: Vec<String>,
}
