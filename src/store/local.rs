//! File-backed flat vector index.
//!
//! Collections are held in memory and scanned exhaustively on query. When
//! opened with a path, [`VectorIndex::flush`] writes a snapshot through the
//! persistence layer and [`LocalIndex::open`] reads it back.

use super::{DistanceMetric, IndexRecord, QueryHit, VectorIndex};
use crate::error::{RagError, Result};
use crate::persistence::{
    IndexSnapshot, StoredCollection, StoredEntry, load_snapshot, save_snapshot, snapshot_exists,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Exhaustive-scan vector index with optional on-disk snapshot.
#[derive(Debug)]
pub struct LocalIndex {
    path: Option<PathBuf>,
    metric: DistanceMetric,
    collections: RwLock<HashMap<String, StoredCollection>>,
}

impl LocalIndex {
    /// Create an index that lives only in memory.
    pub fn in_memory(metric: DistanceMetric) -> Self {
        Self {
            path: None,
            metric,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Open the snapshot at `path`, or start empty if it does not exist yet.
    ///
    /// `metric` applies to collections created from now on; loaded collections
    /// keep the metric they were built with.
    pub fn open(path: &Path, metric: DistanceMetric) -> Result<Self> {
        let collections = if snapshot_exists(path) {
            let snapshot = load_snapshot(path)?;
            info!(
                "Opened index {} ({} collections)",
                path.display(),
                snapshot.collections.len()
            );
            snapshot
                .collections
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect()
        } else {
            debug!("No index at {}, starting empty", path.display());
            HashMap::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            metric,
            collections: RwLock::new(collections),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Names of all collections, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        let collections = self.collections.read().await;
        let mut names: Vec<_> = collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Copy of the current contents, collections sorted by name.
    pub async fn snapshot(&self) -> IndexSnapshot {
        let collections = self.collections.read().await;
        let mut collections: Vec<_> = collections.values().cloned().collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        IndexSnapshot { collections }
    }
}

fn missing(collection: &str) -> RagError {
    RagError::CollectionNotFound(collection.to_string())
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn create_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| StoredCollection::new(name, self.metric));
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.remove(name).is_some() {
            info!("Deleted existing collection: {}", name);
        }
        Ok(())
    }

    /// Insert or replace records by id. The batch is checked against the
    /// collection's dimensions first, so a mismatch leaves it unchanged.
    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        let Some(first) = records.first() else {
            return Ok(());
        };
        let expected = store.dimensions.unwrap_or(first.vector.len());
        if let Some(bad) = records.iter().find(|r| r.vector.len() != expected) {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: bad.vector.len(),
            });
        }
        store.dimensions = Some(expected);

        let mut positions: HashMap<String, usize> = store
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        for record in records {
            let entry = StoredEntry {
                id: record.id,
                vector: record.vector,
                chunk: record.chunk,
            };
            match positions.get(&entry.id) {
                Some(&i) => store.entries[i] = entry,
                None => {
                    positions.insert(entry.id.clone(), store.entries.len());
                    store.entries.push(entry);
                }
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;

        if let Some(expected) = store.dimensions {
            if vector.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut hits: Vec<QueryHit> = store
            .entries
            .iter()
            .map(|entry| QueryHit {
                id: entry.id.clone(),
                chunk: entry.chunk.clone(),
                distance: store.metric.distance(vector, &entry.vector),
            })
            .collect();

        // Stable sort keeps insertion order among equal distances.
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.entries.len())
            .ok_or_else(|| missing(collection))
    }

    async fn flush(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let snapshot = self.snapshot().await;
            save_snapshot(&snapshot, path)?;
            debug!("Flushed index to {}", path.display());
        }
        Ok(())
    }
}
