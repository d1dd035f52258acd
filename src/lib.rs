//! md-rag - Retrieval-augmented question answering over markdown documents.
//!
//! The crate chunks a folder of short markdown documents along their heading
//! structure, embeds the chunks into a vector index, answers questions from
//! the nearest chunks, and measures how well that works.
//!
//! # Overview
//!
//! Two pipelines share the same collaborators:
//! 1. **Ingestion**: load `*.md` files, chunk them by heading, embed, store
//! 2. **Evaluation**: retrieve per question, generate an answer, let an LLM
//!    judge it, and score retrieval with MRR / recall@k / hit rate
//!
//! The embedding model, vector index and language model sit behind the
//! [`Embedder`], [`VectorIndex`] and [`CompletionModel`] traits.
//!
//! # Quick Start
//!
//! ```no_run
//! use md_rag::{
//!     config::Config,
//!     context::RagContext,
//!     eval::{EvaluatorConfig, sample_test_set},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!     config.validate_llm()?;
//!     let data_dir = config.corpus.data_dir.clone();
//!
//!     let ctx = RagContext::from_config(config)?;
//!
//!     // Build the collection from the markdown folder
//!     let report = ctx.ingestor().ingest_dir(&data_dir).await?;
//!     println!("{} chunks from {} documents", report.chunks, report.documents);
//!
//!     // Ask one question
//!     let chunks = ctx.retriever().retrieve("What is the host fee?", 5).await?;
//!     let answer = ctx.generator().generate("What is the host fee?", &chunks).await?;
//!     println!("{}", answer);
//!
//!     // Evaluate the built-in test set
//!     let results = ctx
//!         .evaluator(EvaluatorConfig::default())
//!         .run(&sample_test_set())
//!         .await?;
//!     results.print_summary();
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **MarkdownChunker**: heading-aware, size-bounded chunking
//! - **Ingestor**: corpus folder to vector collection
//! - **Retriever**: nearest chunks for a question
//! - **AnswerGenerator**: answer from retrieved context only
//! - **Evaluator**: retrieval metrics plus LLM-judged answer quality

pub mod chunker;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod generator;
pub mod ingest;
pub mod llm;
pub mod persistence;
pub mod retriever;
pub mod store;

// Re-export commonly used types
pub use chunker::{Chunk, MarkdownChunker, Section};
pub use config::Config;
pub use context::RagContext;
pub use document::{Document, load_documents};
pub use embedding::Embedder;
pub use error::{RagError, Result, Stage};
pub use generator::AnswerGenerator;
pub use ingest::{IngestReport, Ingestor};
pub use llm::{CompletionModel, CompletionRequest, LlmClient};
pub use retriever::{RetrievedChunk, Retriever};
pub use store::{DistanceMetric, LocalIndex, VectorIndex};
