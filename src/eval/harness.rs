//! Evaluation runner: retrieve, generate, judge and score each test case.

use super::dataset::{TestCase, TestSet};
use super::judge::LlmJudge;
use super::metrics::RankOutcome;
use super::report::{EvaluationRecord, EvaluationReport};
use crate::error::{RagError, Result};
use crate::generator::AnswerGenerator;
use crate::retriever::{Retriever, source_files};
use crate::store::VectorIndex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Configuration for an evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Maximum cases to evaluate (for quick testing).
    pub max_cases: Option<usize>,
    /// Print per-question details to stdout.
    pub verbose: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_cases: None,
            verbose: false,
        }
    }
}

/// Runs a test set through the full pipeline, one case at a time.
pub struct Evaluator {
    config: EvaluatorConfig,
    index: Arc<dyn VectorIndex>,
    retriever: Retriever,
    generator: AnswerGenerator,
    judge: LlmJudge,
}

impl Evaluator {
    pub fn new(
        config: EvaluatorConfig,
        index: Arc<dyn VectorIndex>,
        retriever: Retriever,
        generator: AnswerGenerator,
        judge: LlmJudge,
    ) -> Self {
        Self {
            config,
            index,
            retriever,
            generator,
            judge,
        }
    }

    /// Evaluate every case and aggregate the report.
    ///
    /// Fails before any per-case work if there are no cases, `top_k` is zero
    /// or the collection is missing. Any external-call failure aborts the run.
    pub async fn run(&self, test_set: &TestSet) -> Result<EvaluationReport> {
        let start_time = Instant::now();

        let cases: Vec<&TestCase> = match self.config.max_cases {
            Some(max) => test_set.cases.iter().take(max).collect(),
            None => test_set.cases.iter().collect(),
        };
        if cases.is_empty() {
            return Err(RagError::EmptyTestSet(test_set.name.clone()));
        }
        if self.config.top_k == 0 {
            return Err(RagError::Config(
                "top_k must be greater than zero".to_string(),
            ));
        }

        let collection = self.retriever.collection();
        let indexed = self.index.count(collection).await?;
        if indexed == 0 {
            warn!("Collection '{}' is empty; every case will miss", collection);
        }
        info!(
            "Evaluating {} cases against '{}' ({} chunks, top_k={})",
            cases.len(),
            collection,
            indexed,
            self.config.top_k
        );

        let mut records = Vec::with_capacity(cases.len());
        for (idx, case) in cases.iter().enumerate() {
            if self.config.verbose {
                println!("\n[{}/{}] {}", idx + 1, cases.len(), case.question);
            }

            let record = self.evaluate_case(case).await?;
            info!(
                "[{}/{}] {} rank={} scores={}/{}/{}",
                idx + 1,
                cases.len(),
                if record.hit { "HIT" } else { "MISS" },
                record.rank,
                record.judge_scores.relevance,
                record.judge_scores.correctness,
                record.judge_scores.faithfulness
            );
            if self.config.verbose {
                Self::print_record(&record);
            }

            records.push(record);
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        Ok(EvaluationReport::new(
            &test_set.name,
            self.config.top_k,
            records,
            elapsed,
        ))
    }

    /// Run one case through retrieval, generation and judging.
    pub async fn evaluate_case(&self, case: &TestCase) -> Result<EvaluationRecord> {
        let chunks = self
            .retriever
            .retrieve(&case.question, self.config.top_k)
            .await?;
        let retrieved_sources = source_files(&chunks);
        let outcome = RankOutcome::evaluate(&retrieved_sources, &case.expected_source);

        let generated_answer = self.generator.generate(&case.question, &chunks).await?;

        let verdict = self
            .judge
            .judge(
                &case.question,
                &case.expected_answer,
                &generated_answer,
                &chunks,
            )
            .await?;

        Ok(EvaluationRecord {
            question: case.question.clone(),
            expected_source: case.expected_source.clone(),
            expected_answer: case.expected_answer.clone(),
            retrieved_sources,
            hit: outcome.hit,
            rank: outcome.rank,
            reciprocal_rank: outcome.reciprocal_rank,
            generated_answer,
            judge_scores: verdict.scores,
            judge_error: verdict.error,
        })
    }

    fn print_record(record: &EvaluationRecord) {
        println!("  Retrieved: {:?}", record.retrieved_sources);
        println!(
            "  Expected source: {} -> {} (rank: {}, RR: {:.2})",
            record.expected_source,
            if record.hit { "HIT" } else { "MISS" },
            record.rank,
            record.reciprocal_rank
        );
        println!("  Expected: {}", record.expected_answer);
        println!("  Actual:   {}", record.generated_answer);
        println!(
            "  Scores -> Relevance: {}/5  Correctness: {}/5  Faithfulness: {}/5",
            record.judge_scores.relevance,
            record.judge_scores.correctness,
            record.judge_scores.faithfulness
        );
        if let Some(err) = &record.judge_error {
            println!("  Judge reply unusable: {}", err);
        }
    }
}
