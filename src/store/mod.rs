//! Vector index abstraction.
//!
//! The index holds named collections of chunk vectors. A corpus version
//! lives in exactly one collection; re-ingestion drops the collection and
//! builds it again rather than patching it.

use crate::chunker::Chunk;
use crate::embedding::{cosine_similarity, squared_l2};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod local;

pub use local::LocalIndex;

/// Distance used to rank nearest neighbours. Smaller is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`.
    #[default]
    Cosine,
    /// Squared Euclidean distance.
    L2,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::L2 => squared_l2(a, b),
        }
    }
}

/// One vector plus the chunk it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

impl IndexRecord {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.index_id(),
            vector,
            chunk,
        }
    }
}

/// A nearest-neighbour match.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub chunk: Chunk,
    pub distance: f32,
}

/// Storage backend answering nearest-neighbour queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Drop a collection and all its vectors. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert records, replacing any with the same id.
    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> Result<()>;

    /// The `k` nearest records, ordered by ascending distance.
    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    /// Number of records in a collection. Errors if it does not exist.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Persist pending changes.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_distance() {
        let metric = DistanceMetric::Cosine;
        assert!(metric.distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((metric.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_distance() {
        assert!((DistanceMetric::L2.distance(&[0.0, 0.0], &[1.0, 1.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_record_id_from_chunk() {
        let chunk = Chunk {
            text: "fee".to_string(),
            filename: "pricing.md".to_string(),
            chunk_id: "1".to_string(),
            heading: "Pricing".to_string(),
        };
        let record = IndexRecord::new(chunk, vec![0.1, 0.2]);
        assert_eq!(record.id, "pricing.md_1");
    }
}
