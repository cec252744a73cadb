//! Request-scoped retrieval candidates

use serde::Serialize;
use std::fmt;

/// Which index produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Semantic,
    Keyword,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Semantic => write!(f, "semantic"),
            CandidateSource::Keyword => write!(f, "keyword"),
        }
    }
}

/// A chunk reference with its rank in one source list
///
/// `score` is the source's own measure: L2 distance for semantic hits
/// (lower is better), BM25 score for keyword hits (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrievalCandidate {
    pub chunk_id: u64,
    pub source: CandidateSource,
    /// 0-based position in the source list
    pub rank: usize,
    pub score: f32,
}

impl RetrievalCandidate {
    pub fn semantic(chunk_id: u64, rank: usize, distance: f32) -> Self {
        Self {
            chunk_id,
            source: CandidateSource::Semantic,
            rank,
            score: distance,
        }
    }

    pub fn keyword(chunk_id: u64, rank: usize, score: f32) -> Self {
        Self {
            chunk_id,
            source: CandidateSource::Keyword,
            rank,
            score,
        }
    }
}

/// Rank lists from ids, for callers that only have ordered ids
pub fn ranked(ids: &[u64], source: CandidateSource) -> Vec<RetrievalCandidate> {
    ids.iter()
        .enumerate()
        .map(|(rank, &chunk_id)| RetrievalCandidate {
            chunk_id,
            source,
            rank,
            score: 0.0,
        })
        .collect()
}
