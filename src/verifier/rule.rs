use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{Verifier, VerifierError};
use crate::cache::{CacheStore, CacheStoreExt, Namespace};
use crate::eligibility::{Criteria, EligibilityVerdict, PatientSummary, evaluate};
use crate::hashing::content_key;

pub const RULE_VERIFIER_NAME: &str = "rule";

/// The deterministic evaluator, memoized in [`Namespace::CriticAgent`].
pub struct RuleVerifier<S> {
    store: S,
}

impl<S: CacheStore> RuleVerifier<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cache key covering the verifier identity and both inputs.
    pub fn cache_key(criteria: &Criteria, patient: &PatientSummary) -> Result<String, VerifierError> {
        Ok(content_key(&json!({
            "verifier": RULE_VERIFIER_NAME,
            "criteria": criteria,
            "patient": patient,
        }))?)
    }

    /// Synchronous form of [`Verifier::verify`].
    pub fn verify_cached(
        &self,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        let key = Self::cache_key(criteria, patient)?;

        if let Some(cached) = self.store.load(Namespace::CriticAgent, &key) {
            debug!(key = %key, "Rule verdict cache hit");
            return Ok(cached);
        }

        let verdict = evaluate(criteria, patient);
        self.store.save(Namespace::CriticAgent, &key, &verdict)?;
        Ok(verdict)
    }
}

#[async_trait]
impl<S: CacheStore> Verifier for RuleVerifier<S> {
    fn name(&self) -> &str {
        RULE_VERIFIER_NAME
    }

    async fn verify(
        &self,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        self.verify_cached(criteria, patient)
    }
}
