//! Ingestion pipeline: load, chunk, embed, index.

use crate::chunker::{Chunk, MarkdownChunker};
use crate::document::{LoadFailure, load_documents};
use crate::embedding::Embedder;
use crate::error::{RagError, Result, Stage};
use crate::store::{IndexRecord, VectorIndex};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Texts sent to the embedder per call.
pub const EMBED_BATCH_SIZE: usize = 32;

/// What an ingestion run produced.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub collection: String,
    pub documents: usize,
    pub chunks: usize,
    pub failures: Vec<LoadFailure>,
}

/// Rebuilds a collection from a folder of markdown files.
pub struct Ingestor {
    chunker: MarkdownChunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl Ingestor {
    pub fn new(
        chunker: MarkdownChunker,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            collection: collection.into(),
        }
    }

    /// Replace the collection with the chunks of every document in `dir`.
    ///
    /// Embedding happens before the old collection is dropped, so a failed
    /// embedding call or vectors of mixed length leave the previous index
    /// intact.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        let corpus = load_documents(dir)?;
        if corpus.is_empty() {
            return Err(RagError::EmptyCorpus(dir.to_path_buf()));
        }
        info!(
            "Loaded {} documents from {} ({} skipped)",
            corpus.len(),
            dir.display(),
            corpus.failures.len()
        );

        let chunks = self.chunker.chunk_all(&corpus.documents);
        info!(
            "Created {} chunks (chunk size {})",
            chunks.len(),
            self.chunker.chunk_size()
        );

        let records = self.embed_chunks(chunks).await?;
        let chunk_count = records.len();

        self.index
            .delete_collection(&self.collection)
            .await
            .map_err(|e| e.at(Stage::Index))?;
        self.index
            .create_collection(&self.collection)
            .await
            .map_err(|e| e.at(Stage::Index))?;
        self.index
            .upsert(&self.collection, records)
            .await
            .map_err(|e| e.at(Stage::Index))?;
        self.index.flush().await.map_err(|e| e.at(Stage::Index))?;

        info!(
            "Stored {} chunks in collection '{}'",
            chunk_count, self.collection
        );

        Ok(IngestReport {
            collection: self.collection.clone(),
            documents: corpus.len(),
            chunks: chunk_count,
            failures: corpus.failures,
        })
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexRecord>> {
        let mut records = Vec::with_capacity(chunks.len());
        let total = chunks.len();

        let mut pending = chunks.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(EMBED_BATCH_SIZE).collect();
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();

            let vectors = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| e.at(Stage::Embedding))?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                ))
                .at(Stage::Embedding));
            }

            records.extend(
                batch
                    .into_iter()
                    .zip(vectors)
                    .map(|(chunk, vector)| IndexRecord::new(chunk, vector)),
            );
            debug!("Embedded {}/{} chunks", records.len(), total);
        }

        check_dimensions(&records).map_err(|e| e.at(Stage::Embedding))?;
        Ok(records)
    }
}

/// All vectors of one ingestion run must share a length.
fn check_dimensions(records: &[IndexRecord]) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let expected = first.vector.len();
    match records.iter().find(|r| r.vector.len() != expected) {
        Some(bad) => Err(RagError::DimensionMismatch {
            expected,
            actual: bad.vector.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DistanceMetric, LocalIndex};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Embeds by text length; counts batch calls.
    #[derive(Default)]
    struct LengthEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::Embedding("offline".to_string()))
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    /// Gives the "Hosts" chunk one extra dimension.
    struct RaggedEmbedder;

    #[async_trait]
    impl Embedder for RaggedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("Hosts") {
                Ok(vec![1.0, 0.0, 0.0])
            } else {
                Ok(vec![1.0, 0.0])
            }
        }

        fn model_name(&self) -> &str {
            "ragged"
        }
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pricing.md"),
            "# Pricing\n## Guests\nService fee 10-14%.\n## Hosts\nService fee 3%.\n",
        )
        .unwrap();
        fs::write(dir.path().join("company.md"), "# Company\nFounded in 2021.\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_ingest_builds_collection() {
        let dir = corpus();
        let index = Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine));
        let embedder = Arc::new(LengthEmbedder::default());
        let ingestor = Ingestor::new(
            MarkdownChunker::default(),
            embedder.clone(),
            index.clone(),
            "docs",
        );

        let report = ingestor.ingest_dir(dir.path()).await.unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.chunks, 3);
        assert!(report.failures.is_empty());
        assert_eq!(index.count("docs").await.unwrap(), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reingest_replaces_collection() {
        let dir = corpus();
        let index = Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine));
        let ingestor = Ingestor::new(
            MarkdownChunker::default(),
            Arc::new(LengthEmbedder::default()),
            index.clone(),
            "docs",
        );

        ingestor.ingest_dir(dir.path()).await.unwrap();
        fs::remove_file(dir.path().join("pricing.md")).unwrap();
        let report = ingestor.ingest_dir(dir.path()).await.unwrap();

        assert_eq!(report.chunks, 1);
        assert_eq!(index.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let ingestor = Ingestor::new(
            MarkdownChunker::default(),
            Arc::new(LengthEmbedder::default()),
            Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine)),
            "docs",
        );
        assert!(matches!(
            ingestor.ingest_dir(dir.path()).await,
            Err(RagError::EmptyCorpus(_))
        ));
    }

    #[tokio::test]
    async fn test_embedding_failure_keeps_old_collection() {
        let dir = corpus();
        let index = Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine));
        Ingestor::new(
            MarkdownChunker::default(),
            Arc::new(LengthEmbedder::default()),
            index.clone(),
            "docs",
        )
        .ingest_dir(dir.path())
        .await
        .unwrap();

        let broken = Ingestor::new(
            MarkdownChunker::default(),
            Arc::new(BrokenEmbedder),
            index.clone(),
            "docs",
        );
        let err = broken.ingest_dir(dir.path()).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Embedding));
        assert_eq!(index.count("docs").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_batches_of_32() {
        let dir = TempDir::new().unwrap();
        let body: String = (0..40).map(|i| format!("## S{i}\nline {i}\n")).collect();
        fs::write(dir.path().join("many.md"), body).unwrap();

        let embedder = Arc::new(LengthEmbedder::default());
        let ingestor = Ingestor::new(
            MarkdownChunker::default(),
            embedder.clone(),
            Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine)),
            "docs",
        );
        let report = ingestor.ingest_dir(dir.path()).await.unwrap();

        assert_eq!(report.chunks, 40);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mixed_dimensions_keep_old_collection() {
        let dir = corpus();
        let index = Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine));
        Ingestor::new(
            MarkdownChunker::default(),
            Arc::new(LengthEmbedder::default()),
            index.clone(),
            "docs",
        )
        .ingest_dir(dir.path())
        .await
        .unwrap();

        let ragged = Ingestor::new(
            MarkdownChunker::default(),
            Arc::new(RaggedEmbedder),
            index.clone(),
            "docs",
        );
        let err = ragged.ingest_dir(dir.path()).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Embedding));
        assert_eq!(index.count("docs").await.unwrap(), 3);
    }
}
