//! Critic-stage verifiers.
//!
//! A [`Verifier`] answers `verify(criteria, patient) -> verdict` and is swappable without
//! touching orchestration: the pipeline only holds an `Arc<dyn Verifier>`. The pipeline calls
//! [`Verifier::verify_trial`], which also names the trial; verifiers that judge on criteria
//! alone keep its default.
//!
//! - [`RuleVerifier`]: the deterministic evaluator, memoized.
//! - [`ModelVerifier`]: a chat-model auditor; low confidence, optionally strict.

pub mod error;
pub mod model;
pub mod rule;


pub use error::VerifierError;
pub use model::{ChatBackend, GenaiChat, MODEL_VERIFIER_NAME, ModelVerifier, audit_prompt, parse_reply};
pub use rule::{RULE_VERIFIER_NAME, RuleVerifier};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::CacheStore;
use crate::config::{Config, CriticKind};
use crate::eligibility::{Criteria, EligibilityVerdict, PatientSummary};

/// The trial a set of criteria belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialRef<'a> {
    pub trial_id: &'a str,
    pub title: &'a str,
}

#[async_trait]
pub trait Verifier: Send + Sync {
    /// Short identifier used in logs and cache keys.
    fn name(&self) -> &str;

    async fn verify(
        &self,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError>;

    /// Same contract as [`verify`](Self::verify), with the trial's identity available.
    async fn verify_trial(
        &self,
        _trial: TrialRef<'_>,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        self.verify(criteria, patient).await
    }
}

/// Builds the verifier named by `config.critic`, sharing `store` for memoization.
pub fn from_config<S>(config: &Config, store: Arc<S>) -> Arc<dyn Verifier>
where
    S: CacheStore + 'static,
{
    match config.critic {
        CriticKind::Rule => Arc::new(RuleVerifier::new(store)),
        CriticKind::Model => Arc::new(
            ModelVerifier::new(GenaiChat::new(config.critic_model.clone()), store)
                .strict(config.critic_strict),
        ),
    }
}
