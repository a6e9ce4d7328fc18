//! Candidate retrieval with an exclusion-only pre-check.
//!
//! The patient's conditions are embedded (memoized per patient in
//! [`Namespace::EmbeddingCache`](crate::cache::Namespace::EmbeddingCache)), the trial index is
//! searched, and each hit becomes a [`CandidateMatch`] whose provisional guess is
//! [`Provisional::Excluded`] or [`Provisional::Indeterminate`], never eligible.

pub mod error;
pub mod retriever;
pub mod types;


pub use error::RetrievalError;
pub use retriever::{
    CachedEmbedding, PRECHECK_REASON_PREFIX, Retriever, parse_criteria, precheck, query_text,
};
pub use types::{CandidateMatch, Provisional};
