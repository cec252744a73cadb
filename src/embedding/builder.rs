/// Lockstep construction of the dense and sparse indices
use super::keyword_index::{Bm25Params, KeywordIndex};
use super::provider::{EmbeddingError, EmbeddingProvider};
use super::tokenizer::Tokenizer;
use super::vector_index::{FlatL2Index, NearestNeighbor};
use crate::corpus::{fingerprint, Chunk};
use crate::error::{PaperLensError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Version of the on-disk index layout
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Identity shared by both index artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub chunk_count: usize,
    /// BLAKE3 fingerprint of the chunk collection the indices were built from
    pub chunk_fingerprint: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub tokenizer: String,
}

/// Both indices over one chunk collection, position `i` ↔ chunk `i`
#[derive(Debug, Clone)]
pub struct BuiltIndices {
    pub dense: FlatL2Index,
    pub sparse: KeywordIndex,
    pub manifest: IndexManifest,
}

/// Builds the dense and sparse indices from the same chunk slice
pub struct IndexBuilder<'a> {
    embedder: &'a dyn EmbeddingProvider,
    tokenizer: &'a dyn Tokenizer,
    bm25: Bm25Params,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(embedder: &'a dyn EmbeddingProvider, tokenizer: &'a dyn Tokenizer, bm25: Bm25Params) -> Self {
        Self {
            embedder,
            tokenizer,
            bm25,
        }
    }

    pub fn build(&self, chunks: &[Chunk]) -> Result<BuiltIndices> {
        if chunks.is_empty() {
            return Err(PaperLensError::EmptyCorpus);
        }

        let dense = self.build_dense(chunks)?;
        let sparse = self.build_sparse(chunks)?;

        if dense.len() != chunks.len() || sparse.len() != chunks.len() {
            return Err(PaperLensError::ArtifactMismatch(format!(
                "built {} vectors and {} keyword entries for {} chunks",
                dense.len(),
                sparse.len(),
                chunks.len()
            )));
        }

        let manifest = IndexManifest {
            format_version: INDEX_FORMAT_VERSION,
            chunk_count: chunks.len(),
            chunk_fingerprint: fingerprint(chunks),
            embedding_model: self.embedder.model_name().to_string(),
            dimension: self.embedder.dimension(),
            tokenizer: self.tokenizer.name().to_string(),
        };

        Ok(BuiltIndices {
            dense,
            sparse,
            manifest,
        })
    }

    /// Encode every chunk text in one batched call and load the vectors in order
    fn build_dense(&self, chunks: &[Chunk]) -> Result<FlatL2Index> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Embedding {} chunks with {}", texts.len(), self.embedder.model_name()));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let start = Instant::now();
        let embeddings = self.embedder.embed_batch(&texts);
        spinner.finish_and_clear();
        let embeddings = embeddings?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            }
            .into());
        }
        info!(
            "Embedded {} chunks in {:.1}s",
            embeddings.len(),
            start.elapsed().as_secs_f64()
        );

        let mut dense = FlatL2Index::new(self.embedder.dimension());
        dense.add(&embeddings)?;
        info!("Dense index loaded: {} vectors, {}D", dense.len(), dense.dimension());
        Ok(dense)
    }

    fn build_sparse(&self, chunks: &[Chunk]) -> Result<KeywordIndex> {
        let tokenized: Vec<Vec<String>> = chunks
            .iter()
            .map(|c| self.tokenizer.tokenize(&c.text.to_lowercase()))
            .collect();

        let sparse = KeywordIndex::build(&tokenized, self.bm25)?;
        info!(
            "Keyword index built: {} chunks, {} distinct terms",
            sparse.len(),
            sparse.vocabulary_size()
        );
        Ok(sparse)
    }
}
