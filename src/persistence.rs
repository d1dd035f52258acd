//! Persistence layer for saving/loading vector index snapshots.
//!
//! Supports both JSON (human-readable) and bincode (efficient binary) formats.

use crate::chunker::Chunk;
use crate::error::{RagError, Result};
use crate::store::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A stored vector and its chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// One named collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCollection {
    pub name: String,
    pub metric: DistanceMetric,
    pub dimensions: Option<usize>,
    pub entries: Vec<StoredEntry>,
}

impl StoredCollection {
    pub fn new(name: impl Into<String>, metric: DistanceMetric) -> Self {
        Self {
            name: name.into(),
            metric,
            dimensions: None,
            entries: Vec::new(),
        }
    }
}

/// Everything the local index keeps on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub collections: Vec<StoredCollection>,
}

/// Save format for index snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json,
        }
    }
}

/// Save a snapshot, choosing the format from the file extension.
pub fn save_snapshot(snapshot: &IndexSnapshot, path: &Path) -> Result<()> {
    let format = SaveFormat::from_path(path);
    save_snapshot_with_format(snapshot, path, format)
}

/// Save a snapshot with a specific format.
pub fn save_snapshot_with_format(
    snapshot: &IndexSnapshot,
    path: &Path,
    format: SaveFormat,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
        }
    }

    let data = match format {
        SaveFormat::Json => serde_json::to_string_pretty(snapshot)
            .map_err(|e| RagError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::serde::encode_to_vec(snapshot, config)
                .map_err(|e| RagError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| RagError::io(path, e))?;

    Ok(())
}

/// Load a snapshot, choosing the format from the file extension.
pub fn load_snapshot(path: &Path) -> Result<IndexSnapshot> {
    let format = SaveFormat::from_path(path);
    load_snapshot_with_format(path, format)
}

/// Load a snapshot with a specific format.
pub fn load_snapshot_with_format(path: &Path, format: SaveFormat) -> Result<IndexSnapshot> {
    let data = fs::read(path).map_err(|e| RagError::io(path, e))?;

    let snapshot = match format {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| RagError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (snapshot, _): (IndexSnapshot, usize) =
                bincode::serde::decode_from_slice(&data, config)
                    .map_err(|e| RagError::Serialization(e.to_string()))?;
            snapshot
        }
    };

    Ok(snapshot)
}

/// Check if a snapshot file exists at the given path.
pub fn snapshot_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

/// Get the size of a snapshot file in bytes.
pub fn snapshot_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| RagError::io(path, e))?;
    Ok(metadata.len())
}
