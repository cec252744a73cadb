use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::{EmbeddingError, KeywordIndexError, VectorIndexError};
use crate::generation::GenerationError;

/// Main error type for paperlens
#[derive(Error, Debug)]
pub enum PaperLensError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// CSV errors from the batch driver
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// One or more persisted artifacts are absent
    #[error("{}", missing_artifacts_message(.missing))]
    MissingArtifacts { missing: Vec<PathBuf> },

    /// Artifacts exist but disagree with each other or with the configuration
    #[error("Index artifacts out of sync: {0}. Rebuild with `paperlens build`")]
    ArtifactMismatch(String),

    /// Artifact could not be decoded
    #[error("Corrupt artifact {path}: {message}")]
    CorruptArtifact { path: PathBuf, message: String },

    /// Chunk collection contained nothing to index
    #[error("No chunks to index. Run `paperlens ingest <corpus.jsonl>` with a non-empty corpus")]
    EmptyCorpus,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),

    #[error(transparent)]
    KeywordIndex(#[from] KeywordIndexError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

fn missing_artifacts_message(missing: &[PathBuf]) -> String {
    let files = missing
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Missing required index files:\n{}\nRun `paperlens ingest <corpus.jsonl>` and then `paperlens build` \
         (or `paperlens index <corpus.jsonl>` for both)",
        files
    )
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for paperlens operations
pub type Result<T> = std::result::Result<T, PaperLensError>;
