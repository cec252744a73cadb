//! Artifact storage for paperlens
//!
//! One directory holds the chunk collection and the two index artifacts:
//! - `chunks.json`: the chunk collection, stored exactly once
//! - `dense.idx`: zstd-compressed vector matrix (see [`dense`])
//! - `sparse.json`: BM25 statistics plus the shared [`IndexManifest`]
//!
//! Both index artifacts carry the chunk collection's fingerprint, so a
//! re-ingested corpus can never be paired with stale indices.

mod dense;

pub use dense::DenseArtifact;

use crate::corpus::{fingerprint, Chunk};
use crate::embedding::{BuiltIndices, IndexManifest, KeywordIndex, NearestNeighbor, INDEX_FORMAT_VERSION};
use crate::error::{PaperLensError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CHUNKS_FILE: &str = "chunks.json";
pub const DENSE_FILE: &str = "dense.idx";
pub const SPARSE_FILE: &str = "sparse.json";

/// Contents of `sparse.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseArtifact {
    pub manifest: IndexManifest,
    pub index: KeywordIndex,
}

/// Everything the runtime needs, already cross-checked
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub chunks: Vec<Chunk>,
    pub dense: crate::embedding::FlatL2Index,
    pub sparse: KeywordIndex,
    pub manifest: IndexManifest,
}

/// Presence and size of each artifact, for `paperlens status`
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub dir: PathBuf,
    pub chunks: Option<u64>,
    pub dense: Option<u64>,
    pub sparse: Option<u64>,
}

/// Artifact directory manager
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    pub fn dense_path(&self) -> PathBuf {
        self.dir.join(DENSE_FILE)
    }

    pub fn sparse_path(&self) -> PathBuf {
        self.dir.join(SPARSE_FILE)
    }

    /// Fail with every missing file listed
    pub fn require(&self, paths: &[PathBuf]) -> Result<()> {
        let missing: Vec<PathBuf> = paths.iter().filter(|p| !p.exists()).cloned().collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaperLensError::MissingArtifacts { missing })
        }
    }

    pub fn require_chunks(&self) -> Result<()> {
        self.require(&[self.chunks_path()])
    }

    pub fn require_all(&self) -> Result<()> {
        self.require(&[self.chunks_path(), self.dense_path(), self.sparse_path()])
    }

    pub fn status(&self) -> ArtifactStatus {
        let size = |p: PathBuf| fs::metadata(p).ok().map(|m| m.len());
        ArtifactStatus {
            dir: self.dir.clone(),
            chunks: size(self.chunks_path()),
            dense: size(self.dense_path()),
            sparse: size(self.sparse_path()),
        }
    }

    pub fn write_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let path = self.chunks_path();
        let data = serde_json::to_vec_pretty(chunks).map_err(|e| PaperLensError::Json {
            source: e,
            context: "Failed to serialize chunk collection".to_string(),
        })?;
        write_atomic(&path, &data)?;
        info!("Wrote {} chunks to {}", chunks.len(), path.display());
        Ok(())
    }

    pub fn read_chunks(&self) -> Result<Vec<Chunk>> {
        self.require_chunks()?;
        let path = self.chunks_path();
        let data = read_file(&path)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&data).map_err(|e| PaperLensError::Json {
            source: e,
            context: format!("Failed to parse {}", path.display()),
        })?;

        if let Some((pos, chunk)) = chunks
            .iter()
            .enumerate()
            .find(|(pos, c)| c.chunk_id != *pos as u64)
        {
            return Err(PaperLensError::CorruptArtifact {
                path,
                message: format!("chunk at position {} has chunk_id {}", pos, chunk.chunk_id),
            });
        }

        debug!("Loaded {} chunks", chunks.len());
        Ok(chunks)
    }

    /// Persist both indices; the sparse artifact is written last
    pub fn write_indices(&self, built: &BuiltIndices) -> Result<()> {
        let dense_path = self.dense_path();
        let dense_bytes =
            dense::encode(&built.dense, &built.manifest.chunk_fingerprint).map_err(|e| PaperLensError::Io {
                source: e,
                context: "Failed to encode dense index".to_string(),
            })?;
        write_atomic(&dense_path, &dense_bytes)?;
        info!(
            "Wrote dense index ({} vectors, {} bytes) to {}",
            built.dense.len(),
            dense_bytes.len(),
            dense_path.display()
        );

        let sparse_path = self.sparse_path();
        let artifact = SparseArtifact {
            manifest: built.manifest.clone(),
            index: built.sparse.clone(),
        };
        let sparse_bytes = serde_json::to_vec(&artifact).map_err(|e| PaperLensError::Json {
            source: e,
            context: "Failed to serialize keyword index".to_string(),
        })?;
        write_atomic(&sparse_path, &sparse_bytes)?;
        info!(
            "Wrote keyword index ({} chunks, {} bytes) to {}",
            built.sparse.len(),
            sparse_bytes.len(),
            sparse_path.display()
        );

        Ok(())
    }

    pub fn read_dense(&self) -> Result<DenseArtifact> {
        let path = self.dense_path();
        self.require(&[path.clone()])?;
        let bytes = read_file(&path)?;
        dense::decode(&bytes).map_err(|message| PaperLensError::CorruptArtifact { path, message })
    }

    pub fn read_sparse(&self) -> Result<SparseArtifact> {
        let path = self.sparse_path();
        self.require(&[path.clone()])?;
        let bytes = read_file(&path)?;
        let artifact: SparseArtifact =
            serde_json::from_slice(&bytes).map_err(|e| PaperLensError::CorruptArtifact {
                path: path.clone(),
                message: e.to_string(),
            })?;
        artifact
            .index
            .validate()
            .map_err(|e| PaperLensError::CorruptArtifact {
                path,
                message: e.to_string(),
            })?;
        Ok(artifact)
    }

    /// Load all three artifacts and verify they describe the same collection
    ///
    /// `expected_model` is the embedding model the caller will encode
    /// queries with.
    pub fn load_verified(&self, expected_model: &str) -> Result<LoadedArtifacts> {
        self.require_all()?;

        let chunks = self.read_chunks()?;
        let dense = self.read_dense()?;
        let SparseArtifact { manifest, index: sparse } = self.read_sparse()?;

        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(PaperLensError::ArtifactMismatch(format!(
                "index format version {} is not supported (expected {})",
                manifest.format_version, INDEX_FORMAT_VERSION
            )));
        }

        let current = fingerprint(&chunks);
        if manifest.chunk_fingerprint != current || dense.chunk_fingerprint != current {
            return Err(PaperLensError::ArtifactMismatch(
                "chunks.json changed since the indices were built".to_string(),
            ));
        }

        if dense.index.len() != chunks.len()
            || sparse.len() != chunks.len()
            || manifest.chunk_count != chunks.len()
        {
            return Err(PaperLensError::ArtifactMismatch(format!(
                "{} chunks, {} vectors, {} keyword entries",
                chunks.len(),
                dense.index.len(),
                sparse.len()
            )));
        }

        if dense.index.dimension() != manifest.dimension {
            return Err(PaperLensError::ArtifactMismatch(format!(
                "dense vectors are {}D but the manifest records {}D",
                dense.index.dimension(),
                manifest.dimension
            )));
        }

        if manifest.embedding_model != expected_model {
            return Err(PaperLensError::ArtifactMismatch(format!(
                "indices were built with embedding model '{}' but '{}' is configured",
                manifest.embedding_model, expected_model
            )));
        }

        Ok(LoadedArtifacts {
            chunks,
            dense: dense.index,
            sparse,
            manifest,
        })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| PaperLensError::Io {
        source: e,
        context: format!("Failed to read {}", path.display()),
    })
}

/// Write to a sibling temp file, sync, then rename over the target
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| PaperLensError::Config(format!("Invalid artifact path: {}", path.display())))?;
    fs::create_dir_all(parent).map_err(|e| PaperLensError::Io {
        source: e,
        context: format!("Failed to create directory: {}", parent.display()),
    })?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = fs::File::create(&temp_path).map_err(|e| PaperLensError::Io {
        source: e,
        context: format!("Failed to create temp file: {}", temp_path.display()),
    })?;
    file.write_all(data).map_err(|e| PaperLensError::Io {
        source: e,
        context: format!("Failed to write: {}", temp_path.display()),
    })?;
    file.sync_all().map_err(|e| PaperLensError::Io {
        source: e,
        context: format!("Failed to sync: {}", temp_path.display()),
    })?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| PaperLensError::Io {
        source: e,
        context: format!(
            "Failed to move {} into place at {}",
            temp_path.display(),
            path.display()
        ),
    })
}
