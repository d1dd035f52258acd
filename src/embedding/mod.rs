//! Text embedding backends.
//!
//! The pipelines only see the [`Embedder`] trait. Two adapters ship with the
//! crate: [`HttpEmbedder`] for OpenAI-compatible `/v1/embeddings` endpoints and,
//! behind the `local-embeddings` feature, a candle-based sentence-transformers
//! model.

use crate::config::{Config, EmbeddingBackend};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::sync::Arc;

mod http;
#[cfg(feature = "local-embeddings")]
mod local;

pub use http::HttpEmbedder;
#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

/// A model that maps text to a fixed-length vector.
///
/// Implementations must be deterministic for a given model version.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving order.
    ///
    /// The default implementation calls [`Embedder::embed`] sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Model identifier, for logs and index metadata.
    fn model_name(&self) -> &str;
}

/// Build the embedder selected in the configuration.
pub fn from_config(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding.backend {
        EmbeddingBackend::Http => Ok(Arc::new(HttpEmbedder::new(
            config.embedding_api_base(),
            config.embedding_api_key(),
            &config.embedding.model,
        ))),
        #[cfg(feature = "local-embeddings")]
        EmbeddingBackend::Local => Ok(Arc::new(LocalEmbedder::load(&config.embedding.model)?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingBackend::Local => Err(RagError::Config(
            "embedding.backend 'local' requires building with --features local-embeddings"
                .to_string(),
        )),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Squared Euclidean distance between two vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
