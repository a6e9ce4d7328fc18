use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured eligibility criteria of one trial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    /// Free-text inclusion terms; at least one must match.
    #[serde(default)]
    pub inclusion: Vec<String>,
    /// Free-text exclusion terms; any match disqualifies.
    #[serde(default)]
    pub exclusion: Vec<String>,
}

impl Criteria {
    /// Creates criteria from inclusion and exclusion terms.
    pub fn new<I, E, S1, S2>(inclusion: I, exclusion: E) -> Self
    where
        I: IntoIterator<Item = S1>,
        E: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            inclusion: inclusion.into_iter().map(Into::into).collect(),
            exclusion: exclusion.into_iter().map(Into::into).collect(),
        }
    }
}

/// Demographic attributes. Attributes beyond age and sex are kept in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Snapshot of the patient attributes the evaluator reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub demographics: Demographics,
}

/// Patient record as supplied to the pipeline. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub demographics: Demographics,
}

impl Patient {
    /// Creates a patient with the given conditions and no medications or demographics.
    pub fn new<S: Into<String>>(patient_id: impl Into<String>, conditions: Vec<S>) -> Self {
        Self {
            patient_id: patient_id.into(),
            conditions: conditions.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets medications.
    pub fn with_medications<S: Into<String>>(mut self, medications: Vec<S>) -> Self {
        self.medications = medications.into_iter().map(Into::into).collect();
        self
    }

    /// Sets demographics.
    pub fn with_demographics(mut self, demographics: Demographics) -> Self {
        self.demographics = demographics;
        self
    }

    /// Returns the immutable attribute snapshot used for one matching run.
    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            conditions: self.conditions.clone(),
            medications: self.medications.clone(),
            demographics: self.demographics.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => f.write_str("high"),
            Confidence::Low => f.write_str("low"),
        }
    }
}

/// Outcome of one eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub confidence: Confidence,
}

impl EligibilityVerdict {
    /// High-confidence eligible verdict.
    pub fn eligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: true,
            reasons: vec![reason.into()],
            confidence: Confidence::High,
        }
    }

    /// High-confidence ineligible verdict.
    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reasons: vec![reason.into()],
            confidence: Confidence::High,
        }
    }

    /// Low-confidence ineligible verdict used when no verifier could answer.
    pub fn conservative(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reasons: vec![reason.into()],
            confidence: Confidence::Low,
        }
    }
}
