use std::fmt;

use super::types::{CommittedResult, Triage, VerificationResult};
use crate::eligibility::{Patient, PatientSummary};
use crate::retrieval::CandidateMatch;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Retrieve,
    FastFilter,
    Critic,
    Persist,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::FastFilter => "fast_filter",
            Self::Critic => "critic",
            Self::Persist => "persist",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named edges of the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Retrieve → FastFilter.
    Retrieved,
    /// FastFilter → Critic: at least one candidate is undetermined.
    Escalate,
    /// FastFilter → Persist: every candidate settled.
    SkipCritic,
    /// Critic → Persist.
    Verified,
    /// Persist → Done.
    Committed,
}

impl Transition {
    pub fn from(self) -> Stage {
        match self {
            Self::Retrieved => Stage::Retrieve,
            Self::Escalate | Self::SkipCritic => Stage::FastFilter,
            Self::Verified => Stage::Critic,
            Self::Committed => Stage::Persist,
        }
    }

    pub fn to(self) -> Stage {
        match self {
            Self::Retrieved => Stage::FastFilter,
            Self::Escalate => Stage::Critic,
            Self::SkipCritic | Self::Verified => Stage::Persist,
            Self::Committed => Stage::Done,
        }
    }
}

/// The two edges out of the fast filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterRoute {
    Escalate,
    SkipCritic,
}

impl FilterRoute {
    pub fn transition(self) -> Transition {
        match self {
            Self::Escalate => Transition::Escalate,
            Self::SkipCritic => Transition::SkipCritic,
        }
    }
}

/// Chooses the edge out of the fast filter.
pub fn route(triaged: &[Triage]) -> FilterRoute {
    if triaged.iter().any(Triage::is_escalated) {
        FilterRoute::Escalate
    } else {
        FilterRoute::SkipCritic
    }
}

/// Where a run is, with exactly the data the next stage consumes.
#[derive(Debug)]
pub enum PipelineState {
    Retrieve,
    FastFilter { candidates: Vec<CandidateMatch> },
    Critic { triaged: Vec<Triage> },
    Persist { verified: Vec<VerificationResult> },
    Done(CommittedResult),
}

impl PipelineState {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Retrieve => Stage::Retrieve,
            Self::FastFilter { .. } => Stage::FastFilter,
            Self::Critic { .. } => Stage::Critic,
            Self::Persist { .. } => Stage::Persist,
            Self::Done(_) => Stage::Done,
        }
    }
}

/// Immutable per-run inputs shared by every stage.
#[derive(Debug)]
pub struct PipelineContext<'a> {
    pub patient: &'a Patient,
    pub summary: PatientSummary,
    pub top_k: usize,
}

impl<'a> PipelineContext<'a> {
    pub fn new(patient: &'a Patient, top_k: usize) -> Self {
        Self {
            patient,
            summary: patient.summary(),
            top_k,
        }
    }

    pub fn patient_id(&self) -> &str {
        &self.patient.patient_id
    }
}
