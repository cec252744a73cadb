//! Hybrid retrieval over a small crafted collection

mod common;

use common::{chunks_from_texts, BrokenEmbedder, HashingEmbedder, ScriptedNeighbors};
use paperlens::config::{FusionStrategy, RetrievalConfig};
use paperlens::corpus::Chunk;
use paperlens::embedding::{Bm25Params, KeywordIndex, SimpleTokenizerAdapter, Tokenizer};
use paperlens::retrieval::{CandidateSource, HybridRetriever, SourceStatus};

/// Ten chunks of eight tokens; "alpha" appears 4, 3, 2 and 1 times in chunks 1, 9, 3 and 2
fn collection() -> Vec<Chunk> {
    let mut texts = vec!["filler filler filler filler filler filler filler filler"; 10];
    texts[1] = "alpha alpha alpha alpha filler filler filler filler";
    texts[9] = "alpha alpha alpha filler filler filler filler filler";
    texts[3] = "alpha alpha filler filler filler filler filler filler";
    texts[2] = "alpha filler filler filler filler filler filler filler";
    chunks_from_texts(&texts)
}

fn keyword_index(chunks: &[Chunk]) -> KeywordIndex {
    let tokenizer = SimpleTokenizerAdapter::new();
    let docs: Vec<Vec<String>> = chunks
        .iter()
        .map(|c| tokenizer.tokenize(&c.text.to_lowercase()))
        .collect();
    KeywordIndex::build(&docs, Bm25Params::default()).unwrap()
}

fn retriever(chunks: Vec<Chunk>, config: RetrievalConfig) -> HybridRetriever {
    HybridRetriever::new(
        chunks,
        Box::new(HashingEmbedder::default()),
        Box::new(SimpleTokenizerAdapter::new()),
        config,
    )
}

#[test]
fn test_keyword_ranking_follows_term_frequency() {
    let chunks = collection();
    let index = keyword_index(&chunks);
    let hits = index.top_k(&["alpha".to_string()], 4);
    let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
    assert_eq!(positions, vec![1, 9, 3, 2]);
}

#[test]
fn test_priority_union_dense_first() {
    let chunks = collection();
    let sparse = keyword_index(&chunks);
    let retriever = retriever(chunks, RetrievalConfig::default())
        .with_dense(Box::new(ScriptedNeighbors::new(&[3, 1, 7])))
        .with_sparse(sparse);

    let outcome = retriever.retrieve("alpha", 5);

    assert_eq!(outcome.chunk_ids(), vec![3, 1, 7, 9, 2]);
    assert_eq!(outcome.dense, SourceStatus::Ok { candidates: 3 });
    assert!(outcome.sparse.is_ok());

    let sources: Vec<CandidateSource> = outcome.candidates.iter().map(|c| c.source).collect();
    assert_eq!(
        sources,
        vec![
            CandidateSource::Semantic,
            CandidateSource::Semantic,
            CandidateSource::Semantic,
            CandidateSource::Keyword,
            CandidateSource::Keyword,
        ]
    );
    // every returned chunk is the stored chunk at that id
    for chunk in &outcome.chunks {
        assert_eq!(chunk.paper_id, format!("paper-{}", chunk.chunk_id));
    }
}

#[test]
fn test_results_are_unique_and_bounded() {
    let chunks = collection();
    let sparse = keyword_index(&chunks);
    let retriever = retriever(chunks, RetrievalConfig::default())
        .with_dense(Box::new(ScriptedNeighbors::new(&[1, 9, 3, 2, 0])))
        .with_sparse(sparse);

    for top_k in 1..=10 {
        let ids = retriever.retrieve("alpha", top_k).chunk_ids();
        assert!(ids.len() <= top_k);
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }
}

#[test]
fn test_zero_top_k_returns_nothing() {
    let chunks = collection();
    let sparse = keyword_index(&chunks);
    let retriever = retriever(chunks, RetrievalConfig::default())
        .with_dense(Box::new(ScriptedNeighbors::new(&[3])))
        .with_sparse(sparse);

    assert!(retriever.retrieve("alpha", 0).is_empty());
}

#[test]
fn test_missing_dense_index_degrades_to_keyword_only() {
    let chunks = collection();
    let sparse = keyword_index(&chunks);
    let retriever = retriever(chunks, RetrievalConfig::default()).with_sparse(sparse);

    let outcome = retriever.retrieve("alpha", 3);
    assert_eq!(outcome.dense, SourceStatus::Unavailable);
    assert!(outcome.is_degraded());
    assert_eq!(outcome.chunk_ids(), vec![1, 9, 3]);
}

#[test]
fn test_failed_query_embedding_degrades_to_keyword_only() {
    let chunks = collection();
    let sparse = keyword_index(&chunks);
    let retriever = HybridRetriever::new(
        chunks,
        Box::new(BrokenEmbedder),
        Box::new(SimpleTokenizerAdapter::new()),
        RetrievalConfig::default(),
    )
    .with_dense(Box::new(ScriptedNeighbors::new(&[3, 1, 7])))
    .with_sparse(sparse);

    let outcome = retriever.retrieve("alpha", 2);
    assert!(matches!(outcome.dense, SourceStatus::Failed { .. }));
    assert_eq!(outcome.chunk_ids(), vec![1, 9]);
}

#[test]
fn test_misaligned_keyword_index_degrades_to_dense_only() {
    let chunks = collection();
    let sparse = keyword_index(&chunks[..5]);
    let retriever = retriever(chunks, RetrievalConfig::default())
        .with_dense(Box::new(ScriptedNeighbors::new(&[3, 1, 7])))
        .with_sparse(sparse);

    let outcome = retriever.retrieve("alpha", 5);
    assert!(matches!(outcome.sparse, SourceStatus::Failed { .. }));
    assert_eq!(outcome.chunk_ids(), vec![3, 1, 7]);
}

#[test]
fn test_out_of_range_dense_positions_are_skipped() {
    let chunks = collection();
    let sparse = keyword_index(&chunks);
    let retriever = retriever(chunks, RetrievalConfig::default())
        .with_dense(Box::new(ScriptedNeighbors::new(&[42, 3])))
        .with_sparse(sparse);

    let outcome = retriever.retrieve("alpha", 3);
    assert_eq!(outcome.chunk_ids(), vec![3, 1, 9]);
}

#[test]
fn test_both_sources_down_returns_empty() {
    let retriever = retriever(collection(), RetrievalConfig::default());
    let outcome = retriever.retrieve("alpha", 5);
    assert!(outcome.is_empty());
    assert_eq!(outcome.dense, SourceStatus::Unavailable);
    assert_eq!(outcome.sparse, SourceStatus::Unavailable);
}

#[test]
fn test_reciprocal_rank_fusion_rewards_agreement() {
    let chunks = collection();
    let sparse = keyword_index(&chunks);
    let config = RetrievalConfig {
        fusion: FusionStrategy::ReciprocalRank,
        ..Default::default()
    };
    let retriever = retriever(chunks, config)
        .with_dense(Box::new(ScriptedNeighbors::new(&[3, 1, 7])))
        .with_sparse(sparse);

    let ids = retriever.retrieve("alpha", 3).chunk_ids();
    // 1 and 3 appear in both lists and outrank single-source hits
    assert_eq!(&ids[..2], &[1, 3]);
}
