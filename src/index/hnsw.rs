//! HNSW vector index backed by the `hnsw_rs` crate.
//!
//! The index is built offline and dumped with `hnsw_rs`'s own file format
//! (`<basename>.hnsw.graph` and `<basename>.hnsw.data`). This module only
//! reloads and queries it.

use std::path::Path;

use hnsw_rs::hnswio::HnswIo;
use hnsw_rs::prelude::*;
use tracing::{debug, info};

use super::{IndexError, IndexResult, Neighbor, VectorIndex};

/// Default search breadth used when none is configured.
pub const DEFAULT_EF_SEARCH: usize = 64;

/// Read-only HNSW index over `f32` vectors.
///
/// The distance metric is a type parameter; it must match the metric the
/// graph was built with. L2 is the default.
pub struct HnswIndex<D = DistL2>
where
    D: Distance<f32> + Default + Send + Sync + 'static,
{
    graph: Hnsw<'static, f32, D>,
    dimension: usize,
    ef_search: usize,
}

impl<D> HnswIndex<D>
where
    D: Distance<f32> + Default + Send + Sync + 'static,
{
    /// Reload an index dumped by `hnsw_rs`.
    ///
    /// # Arguments
    /// * `directory` - Directory holding the dump files
    /// * `basename` - Dump basename (files are `<basename>.hnsw.graph` / `.hnsw.data`)
    /// * `dimension` - Length of the stored vectors
    /// * `ef_search` - Search breadth; raised to `k` for larger queries
    ///
    /// # Errors
    /// Returns `IndexError::LoadError` if the dump is missing or unreadable
    pub fn load(
        directory: &Path,
        basename: &str,
        dimension: usize,
        ef_search: usize,
    ) -> IndexResult<Self> {
        for suffix in ["hnsw.graph", "hnsw.data"] {
            let path = directory.join(format!("{}.{}", basename, suffix));
            if !path.is_file() {
                return Err(IndexError::LoadError(format!(
                    "Index file not found: {}",
                    path.display()
                )));
            }
        }

        // The reloader owns the data the graph points into, so it has to live
        // as long as the graph, which is the whole process.
        let reloader: &'static mut HnswIo = Box::leak(Box::new(HnswIo::new(directory, basename)));
        let graph = reloader
            .load_hnsw::<f32, D>()
            .map_err(|e| IndexError::LoadError(e.to_string()))?;

        info!(
            "Loaded HNSW index {} from {} ({} vectors)",
            basename,
            directory.display(),
            graph.get_nb_point()
        );

        Ok(Self::from_graph(graph, dimension, ef_search))
    }

    /// Wrap an already built graph.
    pub fn from_graph(graph: Hnsw<'static, f32, D>, dimension: usize, ef_search: usize) -> Self {
        Self {
            graph,
            dimension,
            ef_search: ef_search.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl<D> VectorIndex for HnswIndex<D>
where
    D: Distance<f32> + Default + Send + Sync + 'static,
{
    fn nearest(&self, vector: &[f32], k: usize) -> IndexResult<Vec<Neighbor>> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let ef = self.ef_search.max(k);
        let hits = self.graph.search(vector, k, ef);
        debug!("HNSW search returned {} neighbors (k={}, ef={})", hits.len(), k, ef);

        Ok(hits
            .into_iter()
            .map(|n| Neighbor::new(n.d_id, n.distance))
            .collect())
    }

    fn len(&self) -> usize {
        self.graph.get_nb_point()
    }
}
