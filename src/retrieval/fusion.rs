//! Fusion of the semantic and keyword candidate lists

use super::{deduplicate_candidates, RetrievalCandidate};
use crate::config::RetrievalConfig;
use ahash::{HashMap, HashMapExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight configuration: weights must be positive")]
    InvalidWeights,

    #[error("Invalid RRF constant: must be non-negative")]
    InvalidRrfK,
}

/// Configuration for reciprocal rank fusion
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// RRF K constant (typically 60)
    pub rrf_k: f32,

    /// Weight for semantic results
    pub semantic_weight: f32,

    /// Weight for keyword results
    pub keyword_weight: f32,
}

impl FusionConfig {
    pub fn new(rrf_k: f32, semantic_weight: f32, keyword_weight: f32) -> Result<Self, FusionError> {
        if semantic_weight <= 0.0 || keyword_weight <= 0.0 {
            return Err(FusionError::InvalidWeights);
        }
        if rrf_k < 0.0 {
            return Err(FusionError::InvalidRrfK);
        }

        Ok(Self {
            rrf_k,
            semantic_weight,
            keyword_weight,
        })
    }
}

impl TryFrom<&RetrievalConfig> for FusionConfig {
    type Error = FusionError;

    fn try_from(config: &RetrievalConfig) -> Result<Self, Self::Error> {
        Self::new(config.rrf_k, config.semantic_weight, config.keyword_weight)
    }
}

/// Walk `semantic ++ keyword`, accept each unseen chunk, stop at `top_k`
///
/// Semantic candidates always come before keyword candidates, so a chunk
/// found by both keeps its semantic rank.
pub fn priority_union(
    semantic: &[RetrievalCandidate],
    keyword: &[RetrievalCandidate],
    top_k: usize,
) -> Vec<RetrievalCandidate> {
    deduplicate_candidates(semantic.iter().chain(keyword).copied())
        .take(top_k)
        .collect()
}

/// Apply Reciprocal Rank Fusion to combine two ranked lists
///
/// RRF formula: score(id) = sum over all rankings of: weight / (k + rank + 1)
///
/// Equal fused scores keep first-appearance order in `semantic ++ keyword`.
/// Each returned candidate is the chunk's first appearance, with `score`
/// replaced by the fused score.
pub fn reciprocal_rank_fusion(
    semantic: &[RetrievalCandidate],
    keyword: &[RetrievalCandidate],
    config: &FusionConfig,
    top_k: usize,
) -> Vec<RetrievalCandidate> {
    let mut scores: HashMap<u64, f32> = HashMap::new();

    for (rank, candidate) in semantic.iter().enumerate() {
        let rrf_score = config.semantic_weight / (config.rrf_k + (rank as f32) + 1.0);
        *scores.entry(candidate.chunk_id).or_insert(0.0) += rrf_score;
    }

    for (rank, candidate) in keyword.iter().enumerate() {
        let rrf_score = config.keyword_weight / (config.rrf_k + (rank as f32) + 1.0);
        *scores.entry(candidate.chunk_id).or_insert(0.0) += rrf_score;
    }

    let mut fused: Vec<RetrievalCandidate> = deduplicate_candidates(semantic.iter().chain(keyword).copied())
        .map(|mut candidate| {
            candidate.score = scores.get(&candidate.chunk_id).copied().unwrap_or(0.0);
            candidate
        })
        .collect();

    // Stable sort: ties stay in first-appearance order
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(top_k);
    fused
}
