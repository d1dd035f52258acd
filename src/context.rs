//! Explicit collaborator context shared by the binaries.
//!
//! Holds the configuration and the three external collaborators behind
//! their traits, and hands out pipelines wired to them.

use crate::chunker::MarkdownChunker;
use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::error::Result;
use crate::eval::{Evaluator, EvaluatorConfig, LlmJudge};
use crate::generator::AnswerGenerator;
use crate::ingest::Ingestor;
use crate::llm::{CompletionModel, LlmClient};
use crate::retriever::Retriever;
use crate::store::{LocalIndex, VectorIndex};
use std::sync::Arc;
use tracing::debug;

pub struct RagContext {
    pub config: Config,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub llm: Arc<dyn CompletionModel>,
}

impl RagContext {
    /// Wire up the collaborators named in `config`.
    ///
    /// Validates the configuration first. The LLM settings are only checked
    /// by the commands that call the model.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let embedder = embedding::from_config(&config)?;
        let index = Arc::new(LocalIndex::open(
            &config.corpus.index_path,
            config.retrieval.metric,
        )?);
        let llm = Arc::new(LlmClient::new(config.llm.clone()));
        debug!(
            "Context ready: embedder={}, index={}",
            embedder.model_name(),
            config.corpus.index_path.display()
        );

        Ok(Self::new(config, embedder, index, llm))
    }

    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn CompletionModel>,
    ) -> Self {
        Self {
            config,
            embedder,
            index,
            llm,
        }
    }

    pub fn collection(&self) -> &str {
        &self.config.corpus.collection
    }

    pub fn chunker(&self) -> MarkdownChunker {
        MarkdownChunker::new(self.config.chunking.chunk_size)
    }

    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            self.chunker(),
            self.embedder.clone(),
            self.index.clone(),
            self.collection(),
        )
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.embedder.clone(), self.index.clone(), self.collection())
    }

    pub fn generator(&self) -> AnswerGenerator {
        AnswerGenerator::new(self.llm.clone(), &self.config.generation.assistant_name)
            .with_max_tokens(self.config.generation.max_tokens)
    }

    pub fn judge(&self) -> LlmJudge {
        LlmJudge::new(self.llm.clone())
    }

    pub fn evaluator(&self, config: EvaluatorConfig) -> Evaluator {
        Evaluator::new(
            config,
            self.index.clone(),
            self.retriever(),
            self.generator(),
            self.judge(),
        )
    }

    /// Persist anything the index still holds in memory.
    pub async fn shutdown(&self) -> Result<()> {
        self.index.flush().await
    }
}
