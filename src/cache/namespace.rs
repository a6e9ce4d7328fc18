use serde::{Deserialize, Serialize};

/// Logical partition of the cache. Each namespace persists as its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Critic verdicts keyed by `(verifier, criteria, patient)`.
    CriticAgent,
    /// Committed per-patient pipeline results keyed by patient id.
    WorkflowPatient,
    /// Patient query vectors keyed by patient id.
    EmbeddingCache,
    /// Ground-truth labels keyed by `(patient_id, trial_id)`.
    GroundTruth,
    /// Evaluation reports keyed by the evaluated inputs.
    EvaluationMetrics,
}

impl Namespace {
    /// All namespaces, in declaration order.
    pub const ALL: [Namespace; 5] = [
        Namespace::CriticAgent,
        Namespace::WorkflowPatient,
        Namespace::EmbeddingCache,
        Namespace::GroundTruth,
        Namespace::EvaluationMetrics,
    ];

    /// Returns the on-disk name of this namespace.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::CriticAgent => "critic_agent",
            Namespace::WorkflowPatient => "workflow_patient",
            Namespace::EmbeddingCache => "embedding_cache",
            Namespace::GroundTruth => "ground_truth",
            Namespace::EvaluationMetrics => "evaluation_metrics",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
