//! Hybrid search combining semantic and keyword search

use super::{priority_union, reciprocal_rank_fusion, FusionConfig, RetrievalCandidate};
use crate::config::{FusionStrategy, RetrievalConfig};
use crate::corpus::Chunk;
use crate::embedding::{EmbeddingProvider, KeywordIndex, NearestNeighbor, Tokenizer};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// What happened to one source during a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Searched successfully; `candidates` may be zero
    Ok { candidates: usize },
    /// The index was not available to this retriever
    Unavailable,
    /// The search raised an error
    Failed { reason: String },
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, SourceStatus::Ok { .. })
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Ok { candidates } => write!(f, "ok ({} candidates)", candidates),
            SourceStatus::Unavailable => write!(f, "unavailable"),
            SourceStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Fused context for one query plus per-source status
///
/// `chunks[i]` is the chunk named by `candidates[i]`.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    pub chunks: Vec<Chunk>,
    pub candidates: Vec<RetrievalCandidate>,
    pub dense: SourceStatus,
    pub sparse: SourceStatus,
}

impl RetrievalOutcome {
    pub fn empty(dense: SourceStatus, sparse: SourceStatus) -> Self {
        Self {
            chunks: Vec::new(),
            candidates: Vec::new(),
            dense,
            sparse,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// True when at least one source failed or was missing
    pub fn is_degraded(&self) -> bool {
        !self.dense.is_ok() || !self.sparse.is_ok()
    }

    pub fn chunk_ids(&self) -> Vec<u64> {
        self.chunks.iter().map(|c| c.chunk_id).collect()
    }
}

/// Read-only handle over the chunk collection and both indices
pub struct HybridRetriever {
    chunks: Vec<Chunk>,
    embedder: Box<dyn EmbeddingProvider>,
    tokenizer: Box<dyn Tokenizer>,
    dense: Option<Box<dyn NearestNeighbor>>,
    sparse: Option<KeywordIndex>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        chunks: Vec<Chunk>,
        embedder: Box<dyn EmbeddingProvider>,
        tokenizer: Box<dyn Tokenizer>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            chunks,
            embedder,
            tokenizer,
            dense: None,
            sparse: None,
            config,
        }
    }

    pub fn with_dense(mut self, dense: Box<dyn NearestNeighbor>) -> Self {
        self.dense = Some(dense);
        self
    }

    pub fn with_sparse(mut self, sparse: KeywordIndex) -> Self {
        self.sparse = Some(sparse);
        self
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Up to `top_k` unique chunks for `query`
    ///
    /// Never fails: a broken source is reported in the outcome and the
    /// other source's candidates are used alone.
    pub fn retrieve(&self, query: &str, top_k: usize) -> RetrievalOutcome {
        if top_k == 0 {
            return RetrievalOutcome::empty(
                SourceStatus::Ok { candidates: 0 },
                SourceStatus::Ok { candidates: 0 },
            );
        }

        let limit = top_k.saturating_mul(self.config.candidate_multiplier.max(1));

        let (semantic, dense) = match self.semantic_search(query, limit) {
            Ok(list) => {
                let status = SourceStatus::Ok { candidates: list.len() };
                (list, status)
            }
            Err(status) => {
                warn!("Semantic search degraded: {}", status);
                (Vec::new(), status)
            }
        };

        let (keyword, sparse) = match self.keyword_search(query, limit) {
            Ok(list) => {
                let status = SourceStatus::Ok { candidates: list.len() };
                (list, status)
            }
            Err(status) => {
                warn!("Keyword search degraded: {}", status);
                (Vec::new(), status)
            }
        };

        let fused = self.fuse(&semantic, &keyword, top_k);
        debug!(
            "Retrieved {} semantic + {} keyword candidates, {} after fusion",
            semantic.len(),
            keyword.len(),
            fused.len()
        );

        let mut chunks = Vec::with_capacity(fused.len());
        let mut candidates = Vec::with_capacity(fused.len());
        for candidate in fused {
            if let Some(chunk) = self.chunks.get(candidate.chunk_id as usize) {
                chunks.push(chunk.clone());
                candidates.push(candidate);
            }
        }

        RetrievalOutcome {
            chunks,
            candidates,
            dense,
            sparse,
        }
    }

    fn fuse(
        &self,
        semantic: &[RetrievalCandidate],
        keyword: &[RetrievalCandidate],
        top_k: usize,
    ) -> Vec<RetrievalCandidate> {
        match self.config.fusion {
            FusionStrategy::PriorityUnion => priority_union(semantic, keyword, top_k),
            FusionStrategy::ReciprocalRank => match FusionConfig::try_from(&self.config) {
                Ok(fusion) => reciprocal_rank_fusion(semantic, keyword, &fusion, top_k),
                Err(e) => {
                    warn!("Falling back to priority union: {}", e);
                    priority_union(semantic, keyword, top_k)
                }
            },
        }
    }

    /// Dense candidates, best first, skipping positions outside the collection
    fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalCandidate>, SourceStatus> {
        let dense = self.dense.as_ref().ok_or(SourceStatus::Unavailable)?;
        // Nothing to encode: an empty list, not a failure
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).map_err(|e| SourceStatus::Failed {
            reason: format!("query embedding failed: {}", e),
        })?;
        let neighbors = dense.search(&embedding, limit).map_err(|e| SourceStatus::Failed {
            reason: e.to_string(),
        })?;

        let mut candidates = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            if neighbor.position >= self.chunks.len() {
                warn!(
                    "Dense index returned position {} beyond {} chunks",
                    neighbor.position,
                    self.chunks.len()
                );
                continue;
            }
            let rank = candidates.len();
            candidates.push(RetrievalCandidate::semantic(
                neighbor.position as u64,
                rank,
                neighbor.distance,
            ));
        }
        Ok(candidates)
    }

    /// Sparse candidates, best first, ties by lower chunk_id
    fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalCandidate>, SourceStatus> {
        let sparse = self.sparse.as_ref().ok_or(SourceStatus::Unavailable)?;
        sparse
            .ensure_aligned(self.chunks.len())
            .map_err(|e| SourceStatus::Failed { reason: e.to_string() })?;

        let tokens = self.tokenizer.tokenize(&query.to_lowercase());
        Ok(sparse
            .top_k(&tokens, limit)
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| RetrievalCandidate::keyword(hit.position as u64, rank, hit.score as f32))
            .collect())
    }
}
