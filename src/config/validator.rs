use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{PaperLensError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_generation(config, &mut errors);
        Self::validate_batch(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PaperLensError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        let chunking = &config.chunking;

        if chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if chunking.overlap >= chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    chunking.overlap, chunking.chunk_size
                ),
            ));
        }

        if chunking.min_chunk_words >= chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.min_chunk_words",
                "Minimum chunk words must be smaller than chunk size",
            ));
        }

        if chunking.title_max_chars == 0 {
            errors.push(ValidationError::new(
                "chunking.title_max_chars",
                "Title length must be greater than 0",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.index.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.index.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.index.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }

        if retrieval.candidate_multiplier == 0 {
            errors.push(ValidationError::new(
                "retrieval.candidate_multiplier",
                "Candidate multiplier must be greater than 0",
            ));
        }

        if retrieval.semantic_weight <= 0.0 || retrieval.keyword_weight <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.semantic_weight",
                "Fusion weights must be positive",
            ));
        }

        if retrieval.rrf_k < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.rrf_k",
                "RRF k must not be negative",
            ));
        }

        if retrieval.bm25_k1 < 0.0 || !(0.0..=1.0).contains(&retrieval.bm25_b) {
            errors.push(ValidationError::new(
                "retrieval.bm25_b",
                format!(
                    "BM25 parameters out of range: k1={}, b={}",
                    retrieval.bm25_k1, retrieval.bm25_b
                ),
            ));
        }
    }

    fn validate_generation(config: &Config, errors: &mut Vec<ValidationError>) {
        let generation = &config.generation;

        if generation.endpoint.is_empty() {
            errors.push(ValidationError::new(
                "generation.endpoint",
                "Endpoint cannot be empty",
            ));
        }

        if generation.model.is_empty() {
            errors.push(ValidationError::new(
                "generation.model",
                "Model name cannot be empty",
            ));
        }

        let temp = generation.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "generation.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        let top_p = generation.top_p;
        if top_p <= 0.0 || top_p > 1.0 {
            errors.push(ValidationError::new(
                "generation.top_p",
                format!("top_p must be in (0.0, 1.0], got {}", top_p),
            ));
        }

        if generation.max_tokens == 0 {
            errors.push(ValidationError::new(
                "generation.max_tokens",
                "max_tokens must be greater than 0",
            ));
        }

        if let Some(env_var) = &generation.api_key_env {
            if env_var.is_empty() {
                errors.push(ValidationError::new(
                    "generation.api_key_env",
                    "Environment variable name cannot be empty",
                ));
            }
        }
    }

    fn validate_batch(config: &Config, errors: &mut Vec<ValidationError>) {
        let batch = &config.batch;

        if batch.input_column.is_empty() || batch.output_column.is_empty() {
            errors.push(ValidationError::new(
                "batch.input_column",
                "Column names cannot be empty",
            ));
        }

        if batch.input_column == batch.output_column {
            errors.push(ValidationError::new(
                "batch.output_column",
                "Output column must differ from the input column",
            ));
        }

        if batch.max_tokens == 0 || batch.top_k == 0 {
            errors.push(ValidationError::new(
                "batch.max_tokens",
                "Batch max_tokens and top_k must be greater than 0",
            ));
        }
    }
}
