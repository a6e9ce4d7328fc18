use tracing::{debug, warn};

use super::error::PipelineError;
use super::types::{CommittedResult, Triage, VerificationResult};
use crate::cache::{CacheResult, CacheStore, CacheStoreExt, Namespace};
use crate::eligibility::{Confidence, EligibilityVerdict, PatientSummary};
use crate::reliability::{RetryPolicy, call_with_retry};
use crate::retrieval::CandidateMatch;
use crate::verifier::{TrialRef, Verifier};

pub const VERIFICATION_UNAVAILABLE_PREFIX: &str = "Verification unavailable: ";

/// Settles pre-excluded candidates and escalates the rest. Order is preserved.
pub fn fast_filter(candidates: Vec<CandidateMatch>) -> Vec<Triage> {
    candidates
        .into_iter()
        .map(|candidate| {
            if candidate.provisional.is_excluded() {
                let final_reasons = candidate.reasons.clone();
                Triage::Settled(VerificationResult {
                    candidate,
                    final_eligible: false,
                    final_reasons,
                    confidence: Confidence::High,
                })
            } else {
                Triage::Escalated(candidate)
            }
        })
        .collect()
}

/// Combines the provisional guess with the critic's verdict.
pub fn settle(candidate: CandidateMatch, verdict: EligibilityVerdict) -> VerificationResult {
    VerificationResult {
        final_eligible: candidate.provisional.permits() && verdict.eligible,
        final_reasons: verdict.reasons,
        confidence: verdict.confidence,
        candidate,
    }
}

/// Verifies every escalated candidate; settled ones pass through untouched.
///
/// A verifier that still fails after retries yields a conservative verdict, unless the
/// failure is fatal (a lost cache write), which fails the patient.
pub async fn critic(
    verifier: &dyn Verifier,
    policy: &RetryPolicy,
    summary: &PatientSummary,
    triaged: Vec<Triage>,
) -> Result<Vec<VerificationResult>, PipelineError> {
    let mut verified = Vec::with_capacity(triaged.len());

    for entry in triaged {
        let candidate = match entry {
            Triage::Settled(result) => {
                verified.push(result);
                continue;
            }
            Triage::Escalated(candidate) => candidate,
        };

        let trial = TrialRef {
            trial_id: &candidate.trial_id,
            title: &candidate.title,
        };
        let outcome = call_with_retry(policy, verifier.name(), || {
            verifier.verify_trial(trial, &candidate.criteria, summary)
        })
        .await;

        let verdict = match outcome {
            Ok(verdict) => verdict,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(
                    trial_id = %candidate.trial_id,
                    verifier = verifier.name(),
                    error = %e,
                    "Verifier unavailable, using conservative verdict"
                );
                EligibilityVerdict::conservative(format!("{VERIFICATION_UNAVAILABLE_PREFIX}{e}"))
            }
        };

        debug!(trial_id = %candidate.trial_id, eligible = verdict.eligible, "Critic verdict");
        verified.push(settle(candidate, verdict));
    }

    Ok(verified)
}

/// First-write-wins commit of a patient's results.
pub fn persist<S>(
    store: &S,
    patient_id: &str,
    verified: Vec<VerificationResult>,
) -> CacheResult<CommittedResult>
where
    S: CacheStore + ?Sized,
{
    let result = CommittedResult {
        patient_id: patient_id.to_string(),
        trials: verified,
    };
    let committed = store.commit_once(Namespace::WorkflowPatient, patient_id, &result)?;
    if committed != result {
        debug!(patient_id, "Patient already committed, keeping the first result");
    }
    Ok(committed)
}
