//! Retrieval and answer-quality evaluation.
//!
//! This module provides:
//! - Test sets (built-in sample and JSON files)
//! - LLM-as-judge answer scoring
//! - Ranked-retrieval metrics (MRR, recall@k, hit rate) and the overall score
//! - The evaluation runner and its JSON report

pub mod dataset;
pub mod harness;
pub mod judge;
pub mod metrics;
pub mod report;

pub use dataset::{TestCase, TestSet, sample_test_set};
pub use harness::{Evaluator, EvaluatorConfig};
pub use judge::{JudgeScores, JudgeVerdict, LlmJudge};
pub use metrics::{QualityMetrics, RankOutcome, RecallAt, RetrievalMetrics, overall_score};
pub use report::{DEFAULT_REPORT_PATH, EvaluationRecord, EvaluationReport, EvaluationSummary};
