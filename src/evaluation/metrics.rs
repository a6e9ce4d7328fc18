use std::collections::{BTreeMap, HashMap};

use serde_json::json;
use tracing::{debug, info};

use super::error::EvaluationError;
use super::types::{ConfusionCounts, Conflict, EvaluationMetrics, PatientGroundTruth};
use crate::cache::{CacheStore, CacheStoreExt, Namespace};
use crate::hashing::content_key;
use crate::pipeline::{CommittedResult, VerificationResult};

/// `PATIENT|TRIAL` key with both ids trimmed and uppercased. `None` if either id is blank.
pub fn pair_key(patient_id: &str, trial_id: &str) -> Option<String> {
    let patient = patient_id.trim();
    let trial = trial_id.trim();
    if patient.is_empty() || trial.is_empty() {
        return None;
    }
    Some(format!("{}|{}", patient.to_uppercase(), trial.to_uppercase()))
}

pub fn flatten_predictions(results: &[CommittedResult]) -> BTreeMap<String, bool> {
    results
        .iter()
        .flat_map(|r| {
            r.trials.iter().filter_map(move |t| {
                pair_key(&r.patient_id, t.trial_id()).map(|k| (k, t.final_eligible))
            })
        })
        .collect()
}

pub fn flatten_ground_truth(ground_truth: &[PatientGroundTruth]) -> BTreeMap<String, bool> {
    ground_truth
        .iter()
        .flat_map(|p| {
            p.matches
                .iter()
                .filter_map(move |m| pair_key(&p.patient_id, &m.trial_id).map(|k| (k, m.eligible)))
        })
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Scores `predicted` over the pairs in `truth`. A pair with no prediction counts as ineligible.
pub fn compute_metrics(
    truth: &BTreeMap<String, bool>,
    predicted: &BTreeMap<String, bool>,
) -> EvaluationMetrics {
    let mut counts = ConfusionCounts::default();

    for (key, &actual) in truth {
        let guess = predicted.get(key).copied().unwrap_or(false);
        match (actual, guess) {
            (true, true) => counts.true_positive += 1,
            (false, true) => counts.false_positive += 1,
            (false, false) => counts.true_negative += 1,
            (true, false) => counts.false_negative += 1,
        }
    }

    let precision = ratio(counts.true_positive, counts.true_positive + counts.false_positive);
    let recall = ratio(counts.true_positive, counts.true_positive + counts.false_negative);
    let accuracy = ratio(counts.true_positive + counts.true_negative, counts.total());
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationMetrics {
        accuracy,
        precision,
        recall,
        f1,
        counts,
    }
}

/// Scores pipeline results against ground truth, memoized in
/// [`Namespace::EvaluationMetrics`] under the content key of both flattened maps.
pub fn evaluate_predictions<S>(
    store: &S,
    ground_truth: &[PatientGroundTruth],
    results: &[CommittedResult],
) -> Result<EvaluationMetrics, EvaluationError>
where
    S: CacheStore + ?Sized,
{
    let truth = flatten_ground_truth(ground_truth);
    let predicted = flatten_predictions(results);
    let key = content_key(&json!({ "truth": truth, "predicted": predicted }))?;

    if let Some(cached) = store.load::<EvaluationMetrics>(Namespace::EvaluationMetrics, &key) {
        debug!(key = %key, "Evaluation metrics cache hit");
        return Ok(cached);
    }

    let metrics = compute_metrics(&truth, &predicted);
    store.save(Namespace::EvaluationMetrics, &key, &metrics)?;

    info!(
        accuracy = metrics.accuracy,
        precision = metrics.precision,
        recall = metrics.recall,
        f1 = metrics.f1,
        pairs = metrics.counts.total(),
        "Evaluation complete"
    );
    Ok(metrics)
}

/// Up to `limit` pairs, in ground-truth order, where the prediction disagrees with the label.
/// Pairs without a prediction are not conflicts.
pub fn find_conflicts(
    ground_truth: &[PatientGroundTruth],
    results: &[CommittedResult],
    limit: usize,
) -> Vec<Conflict> {
    let predictions: HashMap<String, &VerificationResult> = results
        .iter()
        .flat_map(|r| {
            r.trials
                .iter()
                .filter_map(move |t| pair_key(&r.patient_id, t.trial_id()).map(|k| (k, t)))
        })
        .collect();

    ground_truth
        .iter()
        .flat_map(|p| {
            p.matches
                .iter()
                .filter_map(move |m| pair_key(&p.patient_id, &m.trial_id).map(|k| (k, m)))
        })
        .filter_map(|(key, label)| {
            let predicted = predictions.get(&key)?;
            (predicted.final_eligible != label.eligible).then(|| Conflict {
                predicted: predicted.final_eligible,
                predicted_reasons: predicted.final_reasons.clone(),
                truth: label.eligible,
                truth_reasons: label.reasons.clone(),
                key,
            })
        })
        .take(limit)
        .collect()
}
