/// L2 nearest-neighbor indices over chunk embeddings
use crate::config::{IndexBackend, IndexConfig};
use hnsw_rs::prelude::*;
use ndarray::{Array2, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// One search hit: position in the chunk collection and its L2 distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Anything that stores vectors by position and finds the nearest ones
pub trait NearestNeighbor {
    /// Append vectors; the first one added gets the next free position
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorIndexError>;

    /// `k` nearest positions by ascending L2 distance
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError>;

    fn len(&self) -> usize;

    fn dimension(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact index: scans every row, ties broken by lower position
///
/// This is also the persisted dense index; row `i` belongs to chunk `i`.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    vectors: Array2<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dimension)),
        }
    }

    /// Rebuild from a row-major buffer of `rows * dimension` values
    pub fn from_raw(dimension: usize, rows: usize, data: Vec<f32>) -> Result<Self, VectorIndexError> {
        let vectors = Array2::from_shape_vec((rows, dimension), data)
            .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;
        Ok(Self { vectors })
    }

    /// Row-major view of every stored value
    pub fn raw_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.vectors.iter().copied()
    }

    pub fn row(&self, position: usize) -> Option<ArrayView1<'_, f32>> {
        (position < self.vectors.nrows()).then(|| self.vectors.row(position))
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> {
        self.vectors.rows().into_iter()
    }

    fn check_dimension(&self, actual: usize) -> Result<(), VectorIndexError> {
        if actual != self.dimension() {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension(),
                actual,
            });
        }
        Ok(())
    }
}

impl NearestNeighbor for FlatL2Index {
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorIndexError> {
        for vector in vectors {
            self.check_dimension(vector.len())?;
        }
        for vector in vectors {
            self.vectors
                .push_row(ArrayView1::from(vector.as_slice()))
                .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        self.check_dimension(query.len())?;

        let mut hits: Vec<Neighbor> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query).sqrt(),
            })
            .collect();

        // Stable: equal distances keep ascending position order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }
}

fn squared_l2(row: ArrayView1<'_, f32>, query: &[f32]) -> f32 {
    row.iter()
        .zip(query)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}

/// Approximate index over an HNSW graph with L2 distance
///
/// Not persisted: built from the flat index when the engine opens.
pub struct HnswL2Index {
    index: Hnsw<'static, f32, DistL2>,
    dimension: usize,
    count: usize,
    ef_search: usize,
}

impl HnswL2Index {
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `capacity` - Expected number of vectors
    /// * `config` - HNSW M / ef parameters
    pub fn new(dimension: usize, capacity: usize, config: &IndexConfig) -> Self {
        let max_layer = 16;
        let index = Hnsw::<f32, DistL2>::new(
            config.hnsw_m,
            capacity.max(1),
            max_layer,
            config.hnsw_ef_construction,
            DistL2 {},
        );

        Self {
            index,
            dimension,
            count: 0,
            ef_search: config.hnsw_ef_search,
        }
    }

    pub fn from_flat(flat: &FlatL2Index, config: &IndexConfig) -> Self {
        let mut index = Self::new(flat.dimension(), flat.len(), config);
        for (position, row) in flat.rows().enumerate() {
            let data = row.to_vec();
            index.index.insert((data.as_slice(), position));
        }
        index.count = flat.len();
        index
    }
}

impl NearestNeighbor for HnswL2Index {
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorIndexError> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(VectorIndexError::InvalidDimension {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        for vector in vectors {
            self.index.insert((vector.as_slice(), self.count));
            self.count += 1;
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.count == 0 {
            return Ok(Vec::new());
        }

        let ef = self.ef_search.max(k);
        let mut hits: Vec<Neighbor> = self
            .index
            .search(query, k, ef)
            .into_iter()
            .map(|n| Neighbor {
                position: n.d_id,
                distance: n.distance,
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.count
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Query-time backend chosen by configuration
pub fn open_backend(flat: FlatL2Index, config: &IndexConfig) -> Box<dyn NearestNeighbor> {
    match config.backend {
        IndexBackend::Flat => Box::new(flat),
        IndexBackend::Hnsw => {
            tracing::info!("Building HNSW graph over {} vectors", flat.len());
            Box::new(HnswL2Index::from_flat(&flat, config))
        }
    }
}
