use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::error::EvaluationError;
use super::types::{GroundTruthLabel, PatientGroundTruth};
use crate::cache::{CacheStore, CacheStoreExt, Namespace};
use crate::eligibility::{Patient, normalize};
use crate::hashing::content_key;
use crate::pipeline::CommittedResult;

pub const NO_TITLE_MATCH: &str = "No matching condition found in trial title";

/// Cached form of one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TitleVerdict {
    eligible: bool,
    reason: String,
}

/// Deterministic reference verdict: eligible iff a patient condition occurs in the title.
pub fn title_label(conditions: &[String], title: &str) -> (bool, String) {
    let title = title.to_lowercase();
    match normalize(conditions)
        .into_iter()
        .find(|condition| title.contains(condition.as_str()))
    {
        Some(condition) => (
            true,
            format!("Deterministic match: patient condition '{condition}' found in trial title"),
        ),
        None => (false, NO_TITLE_MATCH.to_string()),
    }
}

/// Labels every trial in `results` against the matching patient record.
///
/// Results for patients missing from `patients` are skipped. Each label is memoized in
/// [`Namespace::GroundTruth`] under the content key of `{patient_id, trial_id}`.
pub fn label_ground_truth<S>(
    store: &S,
    patients: &[Patient],
    results: &[CommittedResult],
) -> Result<Vec<PatientGroundTruth>, EvaluationError>
where
    S: CacheStore + ?Sized,
{
    let by_id: HashMap<&str, &Patient> = patients
        .iter()
        .map(|p| (p.patient_id.as_str(), p))
        .collect();

    let mut labelled = Vec::with_capacity(results.len());

    for result in results {
        let Some(patient) = by_id.get(result.patient_id.as_str()) else {
            warn!(patient_id = %result.patient_id, "No patient record for result, skipping");
            continue;
        };

        let mut matches = Vec::with_capacity(result.trials.len());
        for trial in &result.trials {
            let key = content_key(&json!({
                "patient_id": result.patient_id,
                "trial_id": trial.trial_id(),
            }))?;

            let verdict = match store.load::<TitleVerdict>(Namespace::GroundTruth, &key) {
                Some(cached) => cached,
                None => {
                    let (eligible, reason) = title_label(&patient.conditions, &trial.candidate.title);
                    let verdict = TitleVerdict { eligible, reason };
                    store.save(Namespace::GroundTruth, &key, &verdict)?;
                    verdict
                }
            };

            debug!(trial_id = %trial.trial_id(), eligible = verdict.eligible, "Ground truth label");
            matches.push(GroundTruthLabel {
                trial_id: trial.trial_id().to_string(),
                eligible: verdict.eligible,
                reasons: vec![verdict.reason],
            });
        }

        labelled.push(PatientGroundTruth {
            patient_id: result.patient_id.clone(),
            matches,
        });
    }

    info!(patients = labelled.len(), "Ground truth labelled");
    Ok(labelled)
}
