use std::future::Future;

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{TrialRef, Verifier, VerifierError};
use crate::cache::{CacheStore, CacheStoreExt, Namespace};
use crate::eligibility::{Confidence, Criteria, EligibilityVerdict, PatientSummary};
use crate::hashing::content_key;

pub const MODEL_VERIFIER_NAME: &str = "model";

const SYSTEM_PROMPT: &str = "You are a precise clinical trial eligibility auditor. Return JSON only.";

const STRICT_INSTRUCTION: &str = "Be strict: if any inclusion criterion cannot be confirmed from the profile, or any exclusion criterion might apply, the patient is not eligible.";

/// Single-turn chat completion.
pub trait ChatBackend: Send + Sync {
    /// Model identifier; part of the verdict cache key.
    fn model(&self) -> &str;

    /// Returns the assistant's text reply.
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String, VerifierError>> + Send;
}

/// [`ChatBackend`] over `genai`. Provider credentials come from the provider's usual
/// environment variable (e.g. `OPENAI_API_KEY`).
#[derive(Clone)]
pub struct GenaiChat {
    client: Client,
    model: String,
}

impl GenaiChat {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
        }
    }
}

impl ChatBackend for GenaiChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, VerifierError> {
        let request = ChatRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)]);

        let response = self
            .client
            .exec_chat(&self.model, request, None)
            .await
            .map_err(|e| VerifierError::Chat {
                message: e.to_string(),
            })?;

        response
            .first_text()
            .map(|text| text.to_string())
            .ok_or_else(|| VerifierError::InvalidReply {
                reason: "reply contained no text".to_string(),
            })
    }
}

#[derive(Deserialize)]
struct AuditReply {
    eligible: bool,
    #[serde(default)]
    reasoning: String,
}

/// Chat-model auditor behind the same contract as [`super::RuleVerifier`].
///
/// Verdicts are always [`Confidence::Low`]. Successful verdicts are memoized in
/// [`Namespace::CriticAgent`] under a key that includes the model and strictness.
pub struct ModelVerifier<C, S> {
    chat: C,
    store: S,
    strict: bool,
}

impl<C: ChatBackend, S: CacheStore> ModelVerifier<C, S> {
    pub fn new(chat: C, store: S) -> Self {
        Self {
            chat,
            store,
            strict: false,
        }
    }

    /// Tightens the prompt so doubt resolves to "not eligible".
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn chat(&self) -> &C {
        &self.chat
    }

    fn cache_key(
        &self,
        trial: Option<TrialRef<'_>>,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<String, VerifierError> {
        Ok(content_key(&json!({
            "verifier": MODEL_VERIFIER_NAME,
            "model": self.chat.model(),
            "strict": self.strict,
            "trial": trial,
            "criteria": criteria,
            "patient": patient,
        }))?)
    }

    async fn audit(
        &self,
        trial: Option<TrialRef<'_>>,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        let key = self.cache_key(trial, criteria, patient)?;

        if let Some(cached) = self.store.load(Namespace::CriticAgent, &key) {
            debug!(key = %key, "Model verdict cache hit");
            return Ok(cached);
        }

        let prompt = audit_prompt(trial, criteria, patient, self.strict);
        let reply = self.chat.complete(SYSTEM_PROMPT, &prompt).await?;

        let verdict = parse_reply(&reply).inspect_err(|e| {
            warn!(model = %self.chat.model(), error = %e, "Model auditor reply unusable");
        })?;

        self.store.save(Namespace::CriticAgent, &key, &verdict)?;
        Ok(verdict)
    }
}

/// Builds the user prompt for one audit. The trial header is omitted when `trial` is unknown.
pub fn audit_prompt(
    trial: Option<TrialRef<'_>>,
    criteria: &Criteria,
    patient: &PatientSummary,
    strict: bool,
) -> String {
    let age = patient
        .demographics
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let sex = patient.demographics.sex.as_deref().unwrap_or("unknown");

    let mut prompt = String::from("Determine if the patient is eligible for the trial.\n\n");
    if let Some(trial) = trial {
        prompt.push_str(&format!("CLINICAL TRIAL ({})", trial.trial_id));
        if !trial.title.trim().is_empty() {
            prompt.push_str(&format!(": {}", trial.title.trim()));
        }
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "PATIENT PROFILE:\n\
         - Age: {age}\n\
         - Sex: {sex}\n\
         - Conditions: {conditions:?}\n\
         - Medications: {medications:?}\n\n\
         TRIAL CRITERIA:\n\
         - Inclusion: {inclusion:?}\n\
         - Exclusion: {exclusion:?}\n\n",
        conditions = patient.conditions,
        medications = patient.medications,
        inclusion = criteria.inclusion,
        exclusion = criteria.exclusion,
    ));
    if strict {
        prompt.push_str(STRICT_INSTRUCTION);
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "Return a JSON object: {\"eligible\": boolean, \"reasoning\": \"one short sentence citing specific criteria\"}",
    );
    prompt
}

/// Parses the model's JSON reply, tolerating a surrounding Markdown code fence.
pub fn parse_reply(reply: &str) -> Result<EligibilityVerdict, VerifierError> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let parsed: AuditReply =
        serde_json::from_str(body).map_err(|e| VerifierError::InvalidReply {
            reason: e.to_string(),
        })?;

    let reasoning = parsed.reasoning.trim();
    let reason = if reasoning.is_empty() {
        "Model auditor gave no reasoning".to_string()
    } else {
        reasoning.to_string()
    };

    Ok(EligibilityVerdict {
        eligible: parsed.eligible,
        reasons: vec![reason],
        confidence: Confidence::Low,
    })
}

#[async_trait]
impl<C: ChatBackend, S: CacheStore> Verifier for ModelVerifier<C, S> {
    fn name(&self) -> &str {
        MODEL_VERIFIER_NAME
    }

    async fn verify(
        &self,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        self.audit(None, criteria, patient).await
    }

    async fn verify_trial(
        &self,
        trial: TrialRef<'_>,
        criteria: &Criteria,
        patient: &PatientSummary,
    ) -> Result<EligibilityVerdict, VerifierError> {
        self.audit(Some(trial), criteria, patient).await
    }
}
