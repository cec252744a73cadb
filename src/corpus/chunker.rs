//! Sliding-window chunker
//!
//! Splits each document's concatenated text into overlapping word windows
//! and numbers the surviving windows with one counter for the whole corpus.

use super::{truncate_chars, Chunk, Document};
use crate::config::ChunkingConfig;
use tracing::debug;

/// Counters reported after an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Records that parsed as documents
    pub documents: usize,
    /// Documents shorter than the minimum length
    pub skipped_short: usize,
    /// Records that failed to parse
    pub malformed: usize,
    /// Chunks emitted
    pub chunks: usize,
}

/// Half-open word ranges `[start, end)` of every window over `word_count` words
///
/// Windows start every `stride` words; the last ones may be shorter than
/// `chunk_size`.
pub fn window_bounds(
    word_count: usize,
    chunk_size: usize,
    stride: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (0..word_count)
        .step_by(stride.max(1))
        .map(move |start| (start, (start + chunk_size).min(word_count)))
}

/// Stateful chunker; `chunk_id`s keep increasing across documents
pub struct Chunker {
    config: ChunkingConfig,
    next_id: u64,
    stats: ChunkStats,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            next_id: 0,
            stats: ChunkStats::default(),
        }
    }

    /// Chunk one document, appending to `out`. Returns the number emitted.
    pub fn chunk_document(&mut self, doc: &Document, out: &mut Vec<Chunk>) -> usize {
        self.stats.documents += 1;

        let full_text = doc.full_text();
        if full_text.chars().count() < self.config.min_document_chars {
            self.stats.skipped_short += 1;
            debug!(
                "Skipping short document {:?} ({} chars)",
                doc.id,
                full_text.chars().count()
            );
            return 0;
        }

        let words: Vec<&str> = full_text.split_whitespace().collect();
        let paper_id = doc.id.clone().unwrap_or_else(|| "unknown".to_string());
        let title = truncate_chars(
            doc.title.as_deref().unwrap_or("Untitled"),
            self.config.title_max_chars,
        );
        let year = doc.year.clone().unwrap_or_else(|| "N/A".to_string());
        let authors: Vec<String> = doc
            .authors
            .iter()
            .take(self.config.max_authors)
            .cloned()
            .collect();

        let mut emitted = 0;
        for (start, end) in window_bounds(words.len(), self.config.chunk_size, self.config.stride())
        {
            let window = &words[start..end];
            if window.len() <= self.config.min_chunk_words {
                continue;
            }

            out.push(Chunk {
                chunk_id: self.next_id,
                text: window.join(" "),
                paper_id: paper_id.clone(),
                title: title.clone(),
                year: year.clone(),
                authors: authors.clone(),
            });
            self.next_id += 1;
            emitted += 1;
        }

        self.stats.chunks += emitted;
        emitted
    }

    /// Parse and chunk one JSONL line. Malformed records are counted and skipped.
    pub fn ingest_line(&mut self, line: &str, out: &mut Vec<Chunk>) -> usize {
        let line = line.trim();
        if line.is_empty() {
            return 0;
        }

        match Document::from_json_line(line) {
            Ok(doc) => self.chunk_document(&doc, out),
            Err(e) => {
                self.stats.malformed += 1;
                debug!("Skipping malformed record: {}", e);
                0
            }
        }
    }

    /// Like [`Chunker::ingest_line`] for raw bytes; invalid UTF-8 counts as malformed
    pub fn ingest_bytes(&mut self, line: &[u8], out: &mut Vec<Chunk>) -> usize {
        match std::str::from_utf8(line) {
            Ok(text) => self.ingest_line(text, out),
            Err(e) => {
                self.stats.malformed += 1;
                debug!("Skipping record with invalid UTF-8: {}", e);
                0
            }
        }
    }

    pub fn stats(&self) -> &ChunkStats {
        &self.stats
    }

    pub fn into_stats(self) -> ChunkStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{:03}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn doc_with(text: String) -> Document {
        Document {
            id: Some("p".to_string()),
            abstract_text: Some(text),
            ..Default::default()
        }
    }

    #[test]
    fn test_window_bounds_reference_policy() {
        let windows: Vec<_> = window_bounds(300, 250, 200).collect();
        assert_eq!(windows, vec![(0, 250), (200, 300)]);

        let windows: Vec<_> = window_bounds(650, 250, 200).collect();
        assert_eq!(windows, vec![(0, 250), (200, 450), (400, 650), (600, 650)]);

        assert_eq!(window_bounds(0, 250, 200).count(), 0);
    }

    #[test]
    fn test_three_hundred_words_yield_two_chunks() {
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        let text = words(300);
        let all: Vec<&str> = text.split(' ').collect();

        assert_eq!(chunker.chunk_document(&doc_with(text.clone()), &mut out), 2);
        assert_eq!(out[0].text, all[0..250].join(" "));
        assert_eq!(out[1].text, all[200..300].join(" "));
        assert_eq!(out[0].chunk_id, 0);
        assert_eq!(out[1].chunk_id, 1);
    }

    #[test]
    fn test_short_document_is_skipped() {
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        let text = "x".repeat(399);

        assert_eq!(chunker.chunk_document(&doc_with(text), &mut out), 0);
        assert!(out.is_empty());
        assert_eq!(chunker.stats().skipped_short, 1);
    }

    #[test]
    fn test_threshold_counts_characters_not_words() {
        // 120 words but only 239 characters: skipped on the character rule.
        let text = vec!["a"; 120].join(" ");
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        chunker.chunk_document(&doc_with(text), &mut out);
        assert_eq!(chunker.stats().skipped_short, 1);
    }

    #[test]
    fn test_character_threshold_is_inclusive_at_minimum() {
        // 100 four-letter words: 499 characters
        let below = vec!["abcd"; 100].join(" ");
        assert_eq!(below.chars().count(), 499);
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        assert_eq!(chunker.chunk_document(&doc_with(below), &mut out), 0);
        assert_eq!(chunker.stats().skipped_short, 1);

        let at = format!("abcde {}", vec!["abcd"; 99].join(" "));
        assert_eq!(at.chars().count(), 500);
        assert_eq!(chunker.chunk_document(&doc_with(at), &mut out), 1);
        assert_eq!(chunker.stats().skipped_short, 1);
    }

    #[test]
    fn test_overlap_follows_configured_stride() {
        let config = ChunkingConfig {
            chunk_size: 100,
            overlap: 40,
            min_chunk_words: 10,
            ..Default::default()
        };
        let mut chunker = Chunker::new(config);
        let mut out = Vec::new();
        let text = words(200);
        let all: Vec<&str> = text.split(' ').collect();

        chunker.chunk_document(&doc_with(text.clone()), &mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1].text, all[60..160].join(" "));
    }

    #[test]
    fn test_short_trailing_window_dropped() {
        // 260 words: second window holds 60 words, below the minimum
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        chunker.chunk_document(&doc_with(words(260)), &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_window_of_exactly_minimum_is_dropped() {
        // 280 words: trailing window has exactly 80 words
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        chunker.chunk_document(&doc_with(words(280)), &mut out);
        assert_eq!(out.len(), 1);

        let mut out = Vec::new();
        chunker.chunk_document(&doc_with(words(281)), &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_ids_continue_across_documents() {
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        chunker.chunk_document(&doc_with(words(300)), &mut out);
        chunker.chunk_document(&doc_with(words(300)), &mut out);

        let ids: Vec<u64> = out.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(chunker.stats().chunks, 4);
        assert_eq!(chunker.stats().documents, 2);
    }

    #[test]
    fn test_provenance_is_denormalized() {
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        let doc = Document {
            id: None,
            title: Some("T".repeat(300)),
            abstract_text: Some(words(300)),
            year: None,
            authors: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..Default::default()
        };
        chunker.chunk_document(&doc, &mut out);

        let chunk = &out[0];
        assert_eq!(chunk.paper_id, "unknown");
        assert_eq!(chunk.title.chars().count(), 200);
        assert_eq!(chunk.year, "N/A");
        assert_eq!(chunk.authors, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_line_counted() {
        let mut chunker = Chunker::new(ChunkingConfig::default());
        let mut out = Vec::new();
        chunker.ingest_line("{broken", &mut out);
        chunker.ingest_line("   ", &mut out);
        assert_eq!(chunker.stats().malformed, 1);
        assert_eq!(chunker.stats().documents, 0);
    }
}
