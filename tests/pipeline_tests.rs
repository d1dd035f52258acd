//! End-to-end ingest + evaluate runs with in-process collaborators.

use async_trait::async_trait;
use md_rag::chunker::MarkdownChunker;
use md_rag::config::Config;
use md_rag::context::RagContext;
use md_rag::embedding::Embedder;
use md_rag::error::{RagError, Result, Stage};
use md_rag::eval::{EvaluatorConfig, TestCase, TestSet};
use md_rag::ingest::Ingestor;
use md_rag::llm::{CompletionModel, CompletionRequest};
use md_rag::retriever::Retriever;
use md_rag::store::{DistanceMetric, LocalIndex, VectorIndex};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const DIMS: usize = 256;

/// Hashed bag-of-words embedding.
struct BagOfWords;

fn token_slot(token: &str) -> usize {
    let hash = token
        .bytes()
        .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
    (hash % DIMS as u64) as usize
}

#[async_trait]
impl Embedder for BagOfWords {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[token_slot(&token.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

/// Echoes a fixed answer and returns judge JSON; every `garble_every`-th
/// judge call gets prose instead.
struct ScriptedLlm {
    judge_calls: AtomicUsize,
    garble_every: Option<usize>,
    fail_generation: bool,
}

impl ScriptedLlm {
    fn new() -> Self {
        Self {
            judge_calls: AtomicUsize::new(0),
            garble_every: None,
            fail_generation: false,
        }
    }
}

#[async_trait]
impl CompletionModel for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if request.system.is_some() {
            if self.fail_generation {
                return Err(RagError::LlmApi("Request failed (503)".to_string()));
            }
            return Ok("Answer from context.".to_string());
        }

        let call = self.judge_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.garble_every {
            Some(n) if call % n == 0 => Ok("Looks fine to me.".to_string()),
            _ => Ok(r#"{"answer_relevance": 5, "answer_correctness": 4, "faithfulness": 5}"#
                .to_string()),
        }
    }
}

fn write_corpus(dir: &Path) {
    fs::write(
        dir.join("company.md"),
        "# Company\n## History\nStayEasy was founded in 2021 by Maria Rodriguez and James Chen.\n",
    )
    .unwrap();
    fs::write(
        dir.join("payments.md"),
        "# Payments\n## Payouts\nHost payouts are released 24 hours after check-in.\n\n\
         ## Methods\nWe accept Visa, Mastercard and PayPal.\n",
    )
    .unwrap();
    fs::write(
        dir.join("trust_safety.md"),
        "# Trust\n## Emergencies\nThe urgent safety line is 1-800-782-9111.\n",
    )
    .unwrap();
}

fn test_set() -> TestSet {
    let mut set = TestSet::new("integration");
    set.add_case(TestCase::new(
        "When was StayEasy founded?",
        "2021",
        "company.md",
    ));
    set.add_case(TestCase::new(
        "What is the urgent safety line?",
        "1-800-782-9111",
        "trust_safety.md",
    ));
    set.add_case(TestCase::new(
        "Which cards do you accept, Visa or Mastercard?",
        "Visa, Mastercard and PayPal",
        "payments.md",
    ));
    set
}

fn context(index: Arc<dyn VectorIndex>, llm: Arc<dyn CompletionModel>) -> RagContext {
    let mut config = Config::with_llm("http://localhost", "key", "test-model");
    config.corpus.collection = "docs".to_string();
    RagContext::new(config, Arc::new(BagOfWords), index, llm)
}

#[tokio::test]
async fn ingest_then_evaluate() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());

    let ctx = context(
        Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine)),
        Arc::new(ScriptedLlm::new()),
    );

    let ingest = ctx.ingestor().ingest_dir(dir.path()).await.unwrap();
    assert_eq!(ingest.documents, 3);
    assert_eq!(ingest.chunks, 4);

    let report = ctx
        .evaluator(EvaluatorConfig {
            top_k: 3,
            ..Default::default()
        })
        .run(&test_set())
        .await
        .unwrap();

    assert_eq!(report.summary.total_cases, 3);
    assert!(report.details.iter().all(|r| r.rank == 1));
    assert_eq!(report.summary.retrieval_metrics.mrr, 1.0);
    assert_eq!(report.summary.retrieval_metrics.recall_at_1, "3/3 (100.0%)");
    assert_eq!(report.summary.answer_quality_metrics.avg_correctness, 4.0);
    // 20 + 20 + 16 + 20 + 20
    assert_eq!(report.summary.overall_score, 96.0);
    assert!(report.details.iter().all(|r| r.retrieved_sources.len() == 3));
}

#[tokio::test]
async fn judge_parse_failure_is_recorded_and_run_continues() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());

    let llm = Arc::new(ScriptedLlm {
        garble_every: Some(2),
        ..ScriptedLlm::new()
    });
    let ctx = context(Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine)), llm);
    ctx.ingestor().ingest_dir(dir.path()).await.unwrap();

    let report = ctx
        .evaluator(EvaluatorConfig::default())
        .run(&test_set())
        .await
        .unwrap();

    assert_eq!(report.details.len(), 3);
    let failed = &report.details[1];
    assert!(failed.judge_error.is_some());
    assert_eq!(failed.judge_scores.relevance, 0);
    assert!(report.details[0].judge_error.is_none());
    assert_eq!(report.summary.judge_failures, 1);
    assert!((report.summary.answer_quality_metrics.avg_relevance - 3.33).abs() < 1e-9);
}

#[tokio::test]
async fn generation_failure_aborts_with_stage() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());

    let llm = Arc::new(ScriptedLlm {
        fail_generation: true,
        ..ScriptedLlm::new()
    });
    let ctx = context(Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine)), llm);
    ctx.ingestor().ingest_dir(dir.path()).await.unwrap();

    let err = ctx
        .evaluator(EvaluatorConfig::default())
        .run(&test_set())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Generation));
}

#[tokio::test]
async fn evaluating_before_ingest_fails_fast() {
    let ctx = context(
        Arc::new(LocalIndex::in_memory(DistanceMetric::Cosine)),
        Arc::new(ScriptedLlm::new()),
    );

    let err = ctx
        .evaluator(EvaluatorConfig::default())
        .run(&test_set())
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::CollectionNotFound(_)));
}

#[tokio::test]
async fn index_survives_reopen() {
    let corpus = TempDir::new().unwrap();
    write_corpus(corpus.path());
    let store = TempDir::new().unwrap();
    let path = store.path().join("vectors.bin");

    let index = Arc::new(LocalIndex::open(&path, DistanceMetric::Cosine).unwrap());
    Ingestor::new(
        MarkdownChunker::default(),
        Arc::new(BagOfWords),
        index,
        "docs",
    )
    .ingest_dir(corpus.path())
    .await
    .unwrap();

    let reopened = Arc::new(LocalIndex::open(&path, DistanceMetric::Cosine).unwrap());
    assert_eq!(reopened.count("docs").await.unwrap(), 4);

    let retriever = Retriever::new(Arc::new(BagOfWords), reopened, "docs");
    let results = retriever
        .retrieve("When do host payouts get released?", 1)
        .await
        .unwrap();
    assert_eq!(results[0].chunk.filename, "payments.md");
    assert_eq!(results[0].chunk.heading, "Payments > Payouts");
}
