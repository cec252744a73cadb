/// Embedding & Indexing
///
/// Everything needed to turn the chunk collection into two searchable
/// structures that agree on chunk positions.
/// Architecture:
/// - EmbeddingProvider trait for abstraction, FastEmbedProvider for local models
/// - Tokenizer trait, backed by a tantivy text analyzer
/// - NearestNeighbor trait with exact flat L2 and HNSW backends
/// - In-house Okapi BM25 keyword statistics
/// - IndexBuilder producing both indices in lockstep
mod builder;
mod keyword_index;
mod provider;
mod tokenizer;
mod vector_index;

pub use builder::{BuiltIndices, IndexBuilder, IndexManifest, INDEX_FORMAT_VERSION};
pub use keyword_index::{Bm25Params, KeywordHit, KeywordIndex, KeywordIndexError, Posting};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use tokenizer::{SimpleTokenizerAdapter, Tokenizer};
pub use vector_index::{open_backend, FlatL2Index, HnswL2Index, NearestNeighbor, Neighbor, VectorIndexError};

use crate::config::RetrievalConfig;

impl From<&RetrievalConfig> for Bm25Params {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            k1: config.bm25_k1,
            b: config.bm25_b,
            epsilon: config.bm25_epsilon,
        }
    }
}
