//! Trialmatch library crate (used by the binary and integration tests).
//!
//! Matches patients against clinical trials: vector retrieval of candidate trials, an
//! exclusion-only pre-check, escalation of open candidates to a pluggable verifier, and a
//! first-write-wins commit of each patient's results. Every expensive step is memoized in a
//! content-addressed cache, so re-running a batch is replay-safe.
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`MatchPipeline`] - Per-patient state machine and batch driver
//! - [`Stage`], [`Transition`], [`CommittedResult`], [`VerificationResult`]
//!
//! ## Decisions
//! - [`evaluate`] - The deterministic eligibility evaluator
//! - [`Verifier`], [`RuleVerifier`], [`ModelVerifier`] - Critic-stage verifiers
//!
//! ## Collaborators
//! - [`Embedder`], [`StubEmbedder`], [`HttpEmbedder`] - Text embedding
//! - [`TrialIndex`], [`QdrantTrialIndex`] - Trial vector search
//!
//! ## Cache
//! - [`CacheStore`], [`JsonFileStore`], [`MemoryStore`], [`MemoizedStore`]
//! - [`content_key`] - Canonical-JSON BLAKE3 cache keys
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod eligibility;
pub mod embedding;
pub mod evaluation;
pub mod hashing;
pub mod pipeline;
pub mod reliability;
pub mod retrieval;
pub mod vectordb;
pub mod verifier;

pub use cache::{
    CacheError, CacheResult, CacheStore, CacheStoreExt, JsonFileStore, MemoizedStore, MemoryStore,
    Namespace,
};
pub use config::{Config, ConfigError, CriticKind, EmbedderKind};
pub use constants::{DimValidationError, validate_embedding_dim};
pub use eligibility::{
    Confidence, Criteria, Demographics, EligibilityVerdict, Patient, PatientSummary, evaluate,
};
pub use embedding::{Embedder, EmbedderBackend, EmbeddingError, HttpEmbedder, StubEmbedder};
pub use evaluation::{
    Conflict, EvaluationError, EvaluationMetrics, PatientGroundTruth, evaluate_predictions,
    find_conflicts, label_ground_truth,
};
pub use hashing::{canonical_json, content_key, hash_to_u64, trial_point_id};
pub use pipeline::{
    BatchReport, CommittedResult, MatchPipeline, PipelineError, Stage, Transition,
    VerificationResult,
};
pub use reliability::{RetryPolicy, Retryable, call_with_retry};
pub use retrieval::{CandidateMatch, Provisional, RetrievalError, Retriever};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockTrialIndex;
pub use vectordb::{QdrantTrialIndex, TrialHit, TrialIndex, TrialMetadata, VectorDbError};
pub use verifier::{ModelVerifier, RuleVerifier, TrialRef, Verifier, VerifierError};
