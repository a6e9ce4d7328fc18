//! The per-patient matching pipeline.
//!
//! ```text
//! Retrieve ──Retrieved──▶ FastFilter ──Escalate──▶ Critic ──Verified──▶ Persist ──Committed──▶ Done
//!                              └──────────SkipCritic──────────────────────▲
//! ```
//!
//! Pre-excluded candidates settle in the fast filter and never reach the critic. Results are
//! committed first-write-wins in [`Namespace::WorkflowPatient`](crate::cache::Namespace).

pub mod error;
pub mod orchestrator;
pub mod stages;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::PipelineError;
pub use orchestrator::MatchPipeline;
pub use stages::{VERIFICATION_UNAVAILABLE_PREFIX, critic, fast_filter, persist, settle};
pub use state::{FilterRoute, PipelineContext, PipelineState, Stage, Transition, route};
pub use types::{BatchReport, CommittedResult, PatientFailure, Triage, VerificationResult};
