//! Two-phase lifecycle for the question-answering pipeline
//!
//! Offline: [`ingest`] chunks a corpus, [`build_indices`] turns the chunk
//! file into both index artifacts. Runtime: [`Engine::open`] loads the
//! artifacts once into a read-only handle that serves every query.

use crate::config::Config;
use crate::corpus::{self, ChunkStats};
use crate::embedding::{
    open_backend, Bm25Params, EmbeddingProvider, FastEmbedProvider, IndexBuilder, IndexManifest,
    SimpleTokenizerAdapter, Tokenizer,
};
use crate::error::{PaperLensError, Result};
use crate::generation::{Answer, AnswerComposer, CompletionClient, GenerationParams, LanguageModel};
use crate::retrieval::{HybridRetriever, RetrievalOutcome};
use crate::storage::ArtifactStore;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Chunk a JSONL corpus and write the chunk collection
pub fn ingest(config: &Config, input: &Path) -> Result<ChunkStats> {
    let ingestion = corpus::ingest_corpus(input, &config.chunking)?;
    if ingestion.chunks.is_empty() {
        return Err(PaperLensError::EmptyCorpus);
    }

    let store = ArtifactStore::new(config.index_dir()?);
    store.write_chunks(&ingestion.chunks)?;
    Ok(ingestion.stats)
}

/// Build both indices from the stored chunk collection with the configured models
pub fn build_indices(config: &Config) -> Result<IndexManifest> {
    let store = ArtifactStore::new(config.index_dir()?);
    store.require_chunks()?;

    let embedder = FastEmbedProvider::new(&config.embedding)?;
    let tokenizer = SimpleTokenizerAdapter::new();
    build_indices_with(&store, &embedder, &tokenizer, Bm25Params::from(&config.retrieval))
}

/// Build both indices with explicit collaborators
///
/// Identical chunks and a deterministic embedder produce byte-identical
/// artifacts.
pub fn build_indices_with(
    store: &ArtifactStore,
    embedder: &dyn EmbeddingProvider,
    tokenizer: &dyn Tokenizer,
    bm25: Bm25Params,
) -> Result<IndexManifest> {
    let start = Instant::now();
    let chunks = store.read_chunks()?;
    info!("Building indices over {} chunks", chunks.len());

    let built = IndexBuilder::new(embedder, tokenizer, bm25).build(&chunks)?;
    store.write_indices(&built)?;

    info!("Index build finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(built.manifest)
}

/// Retrieval plus the answer composed from it
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub retrieval: RetrievalOutcome,
    pub answer: Answer,
}

/// Read-only runtime handle
pub struct Engine {
    retriever: HybridRetriever,
    composer: AnswerComposer,
    manifest: Option<IndexManifest>,
    default_top_k: usize,
}

impl Engine {
    /// Load verified artifacts with the configured embedder and completion client
    pub fn open(config: &Config) -> Result<Self> {
        let store = ArtifactStore::new(config.index_dir()?);
        store.require_all()?;

        let embedder = FastEmbedProvider::new(&config.embedding)?;
        let model = CompletionClient::new(&config.generation)?;
        Self::open_with(config, Box::new(embedder), Box::new(model))
    }

    /// Load verified artifacts with injected collaborators
    pub fn open_with(
        config: &Config,
        embedder: Box<dyn EmbeddingProvider>,
        model: Box<dyn LanguageModel>,
    ) -> Result<Self> {
        let start = Instant::now();
        let store = ArtifactStore::new(config.index_dir()?);
        let loaded = store.load_verified(embedder.model_name())?;

        let tokenizer = SimpleTokenizerAdapter::new();
        if loaded.manifest.tokenizer != tokenizer.name() {
            return Err(PaperLensError::ArtifactMismatch(format!(
                "keyword index was built with tokenizer '{}' but '{}' is in use",
                loaded.manifest.tokenizer,
                tokenizer.name()
            )));
        }
        if loaded.manifest.dimension != embedder.dimension() {
            return Err(PaperLensError::ArtifactMismatch(format!(
                "dense index is {}D but the embedder produces {}D",
                loaded.manifest.dimension,
                embedder.dimension()
            )));
        }

        let chunk_count = loaded.chunks.len();
        let dense = open_backend(loaded.dense, &config.index);
        let retriever = HybridRetriever::new(
            loaded.chunks,
            embedder,
            Box::new(tokenizer),
            config.retrieval.clone(),
        )
        .with_dense(dense)
        .with_sparse(loaded.sparse);

        info!(
            "Engine ready: {} chunks, embedder {}, generator {} ({:.1}s)",
            chunk_count,
            loaded.manifest.embedding_model,
            model.model_name(),
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            retriever,
            composer: AnswerComposer::new(model, &config.generation),
            manifest: Some(loaded.manifest),
            default_top_k: config.retrieval.top_k,
        })
    }

    /// Assemble from already-constructed parts
    pub fn from_parts(retriever: HybridRetriever, composer: AnswerComposer) -> Self {
        let default_top_k = retriever.config().top_k;
        Self {
            retriever,
            composer,
            manifest: None,
            default_top_k,
        }
    }

    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }

    pub fn chunk_count(&self) -> usize {
        self.retriever.chunks().len()
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> RetrievalOutcome {
        self.retriever.retrieve(query, top_k)
    }

    /// Retrieve `top_k` chunks and compose an answer with the configured parameters
    pub fn ask(&self, query: &str, top_k: usize) -> Response {
        self.ask_with(query, top_k, self.composer.params())
    }

    pub fn ask_with(&self, query: &str, top_k: usize, params: &GenerationParams) -> Response {
        let retrieval = self.retrieve(query, top_k);
        let answer = self.composer.answer_with(query, &retrieval.chunks, params);
        Response { retrieval, answer }
    }

    /// Configured generation parameters with a different token budget
    pub fn params_with_max_tokens(&self, max_tokens: usize) -> GenerationParams {
        self.composer.params().clone().with_max_tokens(max_tokens)
    }
}
