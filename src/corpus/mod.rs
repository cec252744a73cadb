//! Corpus ingestion: paper records in, provenance-carrying chunks out

mod chunker;
mod document;

pub use chunker::{window_bounds, ChunkStats, Chunker};
pub use document::{Document, DocumentError};

use crate::config::ChunkingConfig;
use crate::error::{PaperLensError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// The atomic retrieval unit
///
/// `chunk_id` equals the chunk's position in the collection; both indices
/// address chunks by that position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: u64,
    pub text: String,
    pub paper_id: String,
    pub title: String,
    pub year: String,
    pub authors: Vec<String>,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Result of chunking a whole corpus
#[derive(Debug)]
pub struct Ingestion {
    pub chunks: Vec<Chunk>,
    pub stats: ChunkStats,
}

/// Read a JSONL corpus and chunk every record in file order
///
/// Lines are decoded one at a time, so a record with invalid UTF-8 is
/// counted as malformed instead of failing the whole file.
pub fn ingest_corpus(path: &Path, config: &ChunkingConfig) -> Result<Ingestion> {
    let content = std::fs::read(path).map_err(|e| PaperLensError::Io {
        source: e,
        context: format!("Failed to read corpus: {}", path.display()),
    })?;

    let lines: Vec<&[u8]> = content.split(|&b| b == b'\n').collect();
    info!("Chunking {} records from {}", lines.len(), path.display());

    let pb = ProgressBar::new(lines.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} papers {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut chunker = Chunker::new(config.clone());
    let mut chunks = Vec::new();
    for line in lines {
        chunker.ingest_bytes(line, &mut chunks);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let ingestion = Ingestion {
        chunks,
        stats: chunker.into_stats(),
    };

    info!(
        "Ingestion complete: {} documents, {} skipped (too short), {} malformed, {} chunks",
        ingestion.stats.documents,
        ingestion.stats.skipped_short,
        ingestion.stats.malformed,
        ingestion.stats.chunks
    );

    Ok(ingestion)
}

/// Chunk already-read JSONL lines
pub fn chunk_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    config: &ChunkingConfig,
) -> Ingestion {
    let mut chunker = Chunker::new(config.clone());
    let mut chunks = Vec::new();
    for line in lines {
        chunker.ingest_line(line, &mut chunks);
    }

    Ingestion {
        chunks,
        stats: chunker.into_stats(),
    }
}

/// BLAKE3 fingerprint of an ordered chunk collection
///
/// Both index artifacts record it so that a rebuilt chunk file cannot be
/// paired with stale indices.
pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for chunk in chunks {
        hasher.update(&chunk.chunk_id.to_le_bytes());
        hasher.update(&(chunk.text.len() as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, words: usize) -> String {
        let body = (0..words)
            .map(|i| format!("term{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        serde_json::json!({ "paper_id": id, "title": "Paper", "abstract": body }).to_string()
    }

    #[test]
    fn test_chunk_lines_counts_everything() {
        let lines = [
            record("a", 300),
            "garbage".to_string(),
            serde_json::json!({ "title": "tiny" }).to_string(),
            record("b", 300),
        ];
        let ingestion = chunk_lines(lines.iter().map(String::as_str), &ChunkingConfig::default());

        assert_eq!(ingestion.stats.documents, 3);
        assert_eq!(ingestion.stats.malformed, 1);
        assert_eq!(ingestion.stats.skipped_short, 1);
        assert_eq!(ingestion.chunks.len(), 4);
        assert!(ingestion
            .chunks
            .iter()
            .enumerate()
            .all(|(i, c)| c.chunk_id == i as u64));
    }

    #[test]
    fn test_chunking_is_reproducible() {
        let lines = [record("a", 700), record("b", 450)];
        let first = chunk_lines(lines.iter().map(String::as_str), &ChunkingConfig::default());
        let second = chunk_lines(lines.iter().map(String::as_str), &ChunkingConfig::default());

        assert_eq!(first.chunks, second.chunks);
        assert_eq!(fingerprint(&first.chunks), fingerprint(&second.chunks));
    }

    #[test]
    fn test_fingerprint_tracks_order() {
        let lines = [record("a", 300)];
        let mut chunks = chunk_lines(lines.iter().map(String::as_str), &ChunkingConfig::default()).chunks;
        let before = fingerprint(&chunks);
        chunks.swap(0, 1);
        assert_ne!(before, fingerprint(&chunks));
    }

    #[test]
    fn test_truncate_chars_is_utf8_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
