//! Deterministic eligibility evaluation over structured criteria.
//!
//! Matching is normalized substring containment: a criterion term is hit when a lowercased,
//! trimmed patient condition occurs inside the lowercased, trimmed term. Exclusion always
//! wins over inclusion, and at least one inclusion hit is required.
//!
//! [`evaluate`] is pure; memoization is the caller's job (see
//! [`crate::verifier::RuleVerifier`]).

pub mod evaluator;
pub mod types;

#[cfg(test)]
mod tests;

pub use evaluator::{
    HARD_EXCLUSION_PREFIX, REASON_INCLUSION_MET, REASON_NO_INCLUSION, evaluate,
    exclusion_hits, first_exclusion_match, normalize,
};
pub use types::{Confidence, Criteria, Demographics, EligibilityVerdict, Patient, PatientSummary};
