//! Offline scoring of pipeline results.
//!
//! Ground truth comes from a deterministic title labeler, independent of the eligibility
//! criteria the pipeline uses. Labels and metrics are memoized like every other step.

pub mod error;
pub mod ground_truth;
pub mod metrics;
pub mod types;


pub use error::EvaluationError;
pub use ground_truth::{NO_TITLE_MATCH, label_ground_truth, title_label};
pub use metrics::{
    compute_metrics, evaluate_predictions, find_conflicts, flatten_ground_truth,
    flatten_predictions, pair_key,
};
pub use types::{Conflict, ConfusionCounts, EvaluationMetrics, GroundTruthLabel, PatientGroundTruth};
