//! Hybrid Retrieval
//!
//! Queries the dense and sparse indices, then fuses both ranked lists into
//! one deduplicated context set. Priority union is the default; weighted
//! Reciprocal Rank Fusion is available through configuration.

mod candidate;
mod deduplication;
mod fusion;
mod hybrid;

pub use candidate::{ranked, CandidateSource, RetrievalCandidate};
pub use deduplication::deduplicate_candidates;
pub use fusion::{priority_union, reciprocal_rank_fusion, FusionConfig, FusionError};
pub use hybrid::{HybridRetriever, RetrievalOutcome, SourceStatus};
