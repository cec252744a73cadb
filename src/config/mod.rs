//! Configuration management for paperlens
//!
//! Loads the TOML configuration, applies `PAPERLENS_*` environment overrides
//! and validates the result before anything else touches it.

use crate::error::{PaperLensError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta", default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: current_timestamp(),
        }
    }
}

/// Where the corpus lives and where artifacts are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub index_dir: PathBuf,
    pub corpus: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("index"),
            corpus: PathBuf::from("papers.jsonl"),
        }
    }
}

/// Sliding-window chunking policy
///
/// `min_document_chars` is measured in characters while `min_chunk_words`
/// is measured in words. Both units are kept as they are.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per window
    pub chunk_size: usize,
    /// Words shared by consecutive windows
    pub overlap: usize,
    /// Documents whose concatenated text is shorter than this are skipped
    pub min_document_chars: usize,
    /// A window is kept only if it has more words than this
    pub min_chunk_words: usize,
    pub title_max_chars: usize,
    pub max_authors: usize,
}

impl ChunkingConfig {
    /// Word offset between successive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 250,
            overlap: 50,
            min_document_chars: 500,
            min_chunk_words: 80,
            title_max_chars: 200,
            max_authors: 3,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            batch_size: 32,
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

/// Nearest-neighbor backend used at query time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Exact L2 scan over every vector
    Flat,
    /// Approximate L2 search over an HNSW graph built at open time
    Hnsw,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Flat,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
        }
    }
}

/// How the dense and sparse candidate lists are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Dense candidates first, then sparse, first-seen wins
    PriorityUnion,
    /// Weighted reciprocal-rank fusion
    ReciprocalRank,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Each source is asked for `candidate_multiplier * top_k` candidates
    pub candidate_multiplier: usize,
    pub fusion: FusionStrategy,
    pub rrf_k: f32,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub bm25_epsilon: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            candidate_multiplier: 3,
            fusion: FusionStrategy::PriorityUnion,
            rrf_k: 60.0,
            semantic_weight: 1.0,
            keyword_weight: 1.0,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            bm25_epsilon: 0.25,
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible completion server
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: usize,
    pub stop: Vec<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Characters of each context chunk placed in the prompt
    pub excerpt_chars: usize,
    /// Characters of each source title placed in the prompt
    pub source_title_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1".to_string(),
            model: "phi-3-mini-4k-instruct-q4".to_string(),
            api_key_env: None,
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 800,
            stop: vec![
                "User question:".to_string(),
                "\n\nUser:".to_string(),
                "\n\nContext:".to_string(),
            ],
            timeout_secs: 120,
            max_retries: 2,
            excerpt_chars: 800,
            source_title_chars: 80,
        }
    }
}

/// CSV batch driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub input_column: String,
    pub output_column: String,
    pub max_tokens: usize,
    pub max_message_chars: usize,
    pub top_k: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_column: "scam_messages".to_string(),
            output_column: "ai_responses".to_string(),
            max_tokens: 700,
            max_message_chars: 2000,
            top_k: 5,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PaperLensError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PaperLensError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| PaperLensError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: PAPERLENS_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("PAPERLENS_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "PATHS__INDEX_DIR" => self.paths.index_dir = PathBuf::from(value),
            "PATHS__CORPUS" => self.paths.corpus = PathBuf::from(value),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "INDEX__BACKEND" => {
                self.index.backend = match value {
                    "flat" => IndexBackend::Flat,
                    "hnsw" => IndexBackend::Hnsw,
                    _ => return Err(invalid(path, format!("Unknown backend '{}'", value))),
                }
            }
            "RETRIEVAL__TOP_K" => {
                self.retrieval.top_k = value
                    .parse()
                    .map_err(|_| invalid(path, format!("Cannot parse '{}' as integer", value)))?;
            }
            "RETRIEVAL__FUSION" => {
                self.retrieval.fusion = match value {
                    "priority_union" => FusionStrategy::PriorityUnion,
                    "reciprocal_rank" => FusionStrategy::ReciprocalRank,
                    _ => return Err(invalid(path, format!("Unknown fusion '{}'", value))),
                }
            }
            "GENERATION__ENDPOINT" => self.generation.endpoint = value.to_string(),
            "GENERATION__MODEL" => self.generation.model = value.to_string(),
            "GENERATION__MAX_TOKENS" => {
                self.generation.max_tokens = value
                    .parse()
                    .map_err(|_| invalid(path, format!("Cannot parse '{}' as integer", value)))?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Index directory with `~/` expanded
    pub fn index_dir(&self) -> Result<PathBuf> {
        expand_path(&self.paths.index_dir)
    }

    /// Corpus path with `~/` expanded
    pub fn corpus_path(&self) -> Result<PathBuf> {
        expand_path(&self.paths.corpus)
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            PaperLensError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("paperlens").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig::default(),
            paths: PathsConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

fn invalid(path: &str, message: String) -> PaperLensError {
    PaperLensError::InvalidConfigValue {
        path: path.to_string(),
        message,
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| PaperLensError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            PaperLensError::Config("Cannot determine home directory".to_string())
        })?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
