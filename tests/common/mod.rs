//! Shared fakes for integration tests
#![allow(dead_code)]

use paperlens::corpus::Chunk;
use paperlens::embedding::{EmbeddingError, EmbeddingProvider, NearestNeighbor, Neighbor, VectorIndexError};
use paperlens::generation::{GenerationError, GenerationParams, LanguageModel};
use std::sync::{Arc, Mutex};

pub const HASHING_MODEL: &str = "hashing-test";

/// Deterministic bag-of-words embedder: each lowercase word adds 1.0 to a bucket
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0; self.dimension];
        for word in text.split_whitespace() {
            let hash = blake3::hash(word.to_lowercase().as_bytes());
            let bucket = hash.as_bytes()[0] as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        HASHING_MODEL
    }
}

/// Embedder whose every call fails
pub struct BrokenEmbedder;

impl EmbeddingProvider for BrokenEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::GenerationError("model offline".to_string()))
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::GenerationError("model offline".to_string()))
    }

    fn dimension(&self) -> usize {
        16
    }

    fn model_name(&self) -> &str {
        HASHING_MODEL
    }
}

/// Dense index that answers every query with the same positions
pub struct ScriptedNeighbors {
    positions: Vec<usize>,
    dimension: usize,
}

impl ScriptedNeighbors {
    pub fn new(positions: &[usize]) -> Self {
        Self {
            positions: positions.to_vec(),
            dimension: 16,
        }
    }
}

impl NearestNeighbor for ScriptedNeighbors {
    fn add(&mut self, _vectors: &[Vec<f32>]) -> Result<(), VectorIndexError> {
        Ok(())
    }

    fn search(&self, _query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        Ok(self
            .positions
            .iter()
            .take(k)
            .enumerate()
            .map(|(rank, &position)| Neighbor {
                position,
                distance: rank as f32,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Language model that returns a fixed reply and records every prompt
#[derive(Clone)]
pub struct ScriptedModel {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for ScriptedModel {
    fn complete(&self, prompt: &str, _params: &GenerationParams) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Language model whose server is always down
pub struct FailingModel;

impl LanguageModel for FailingModel {
    fn complete(&self, _prompt: &str, _params: &GenerationParams) -> Result<String, GenerationError> {
        Err(GenerationError::NetworkError("connection refused".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// One JSONL corpus record with `words` generated body words
pub fn paper_line(id: &str, title: &str, words: usize) -> String {
    let body: Vec<String> = (0..words).map(|i| format!("{}w{}", id, i)).collect();
    serde_json::json!({
        "paper_id": id,
        "title": title,
        "abstract": "",
        "sections": [body.join(" ")],
        "year": 2020,
        "authors": ["Ada", "Grace", "Alan", "Edsger"],
    })
    .to_string()
}

/// Chunks with contiguous ids and the given texts
pub fn chunks_from_texts(texts: &[&str]) -> Vec<Chunk> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            chunk_id: i as u64,
            text: text.to_string(),
            paper_id: format!("paper-{}", i),
            title: format!("Paper {}", i),
            year: "2021".to_string(),
            authors: vec!["Author".to_string()],
        })
        .collect()
}
