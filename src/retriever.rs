//! Nearest-neighbour retrieval of chunks for a question.

use crate::chunker::Chunk;
use crate::embedding::Embedder;
use crate::error::{Result, Stage};
use crate::store::VectorIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A chunk returned for a question, with its distance from the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

impl RetrievedChunk {
    pub fn filename(&self) -> &str {
        &self.chunk.filename
    }
}

/// Embeds a question and asks the index for the closest chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Up to `k` chunks in the order the index returns them (closest first).
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let vector = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| e.at(Stage::Embedding))?;

        let hits = self
            .index
            .query(&self.collection, &vector, k)
            .await
            .map_err(|e| e.at(Stage::Index))?;

        debug!("Retrieved {} chunks for '{}'", hits.len(), question);

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                chunk: hit.chunk,
                distance: hit.distance,
            })
            .collect())
    }
}

/// Filenames of retrieved chunks, in rank order.
pub fn source_files(chunks: &[RetrievedChunk]) -> Vec<String> {
    chunks.iter().map(|c| c.chunk.filename.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::store::{DistanceMetric, IndexRecord, LocalIndex};
    use async_trait::async_trait;

    /// Maps a text to a 2-d vector by keyword.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("fail") {
                return Err(RagError::Embedding("boom".to_string()));
            }
            Ok(if text.contains("fee") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }

        fn model_name(&self) -> &str {
            "keyword"
        }
    }

    fn chunk(filename: &str, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            filename: filename.to_string(),
            chunk_id: "0".to_string(),
            heading: String::new(),
        }
    }

    async fn build_index() -> Arc<LocalIndex> {
        let index = Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine));
        index.create_collection("docs").await.unwrap();
        index
            .upsert(
                "docs",
                vec![
                    IndexRecord::new(chunk("safety.md", "Call 911"), vec![0.0, 1.0]),
                    IndexRecord::new(chunk("pricing.md", "Fee is 3%"), vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_retrieve_orders_by_distance() {
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), build_index().await, "docs");

        let results = retriever.retrieve("what is the fee", 5).await.unwrap();

        assert_eq!(source_files(&results), vec!["pricing.md", "safety.md"]);
        assert!(results[0].distance < results[1].distance);
    }

    #[tokio::test]
    async fn test_retrieve_respects_k() {
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), build_index().await, "docs");
        let results = retriever.retrieve("what is the fee", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_tagged_with_stage() {
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), build_index().await, "docs");
        let err = retriever.retrieve("fail please", 3).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Embedding));

        let retriever = Retriever::new(Arc::new(KeywordEmbedder), build_index().await, "missing");
        let err = retriever.retrieve("fee", 3).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Index));
    }
}
