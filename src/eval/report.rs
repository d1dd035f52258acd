//! Evaluation records and the JSON report.

use super::judge::JudgeScores;
use super::metrics::{QualityMetrics, RankOutcome, RetrievalMetrics, overall_score};
use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default report location.
pub const DEFAULT_REPORT_PATH: &str = "evaluation_results.json";

/// Everything observed for one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub expected_source: String,
    pub expected_answer: String,
    /// Filenames of the retrieved chunks, in rank order.
    pub retrieved_sources: Vec<String>,
    pub hit: bool,
    /// 1-based, 0 on a miss.
    pub rank: usize,
    pub reciprocal_rank: f64,
    pub generated_answer: String,
    pub judge_scores: JudgeScores,
    /// Set when the judge reply could not be parsed and scores were zeroed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_error: Option<String>,
}

impl EvaluationRecord {
    pub fn outcome(&self) -> RankOutcome {
        RankOutcome {
            hit: self.hit,
            rank: self.rank,
            reciprocal_rank: self.reciprocal_rank,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSummary {
    pub recall_at_1: String,
    pub recall_at_3: String,
    pub recall_at_5: String,
    pub recall_at_1_rate: f64,
    pub recall_at_3_rate: f64,
    pub recall_at_5_rate: f64,
    pub mrr: f64,
    pub hit_rate: f64,
}

impl RetrievalSummary {
    fn from_metrics(metrics: &RetrievalMetrics) -> Self {
        let at = |k: usize| {
            metrics
                .recall_at(k)
                .map(|r| (r.display(), round_to(r.fraction(), 4)))
                .unwrap_or_default()
        };
        let (recall_at_1, recall_at_1_rate) = at(1);
        let (recall_at_3, recall_at_3_rate) = at(3);
        let (recall_at_5, recall_at_5_rate) = at(5);

        Self {
            recall_at_1,
            recall_at_3,
            recall_at_5,
            recall_at_1_rate,
            recall_at_3_rate,
            recall_at_5_rate,
            mrr: round_to(metrics.mrr, 4),
            hit_rate: round_to(metrics.hit_rate(), 4),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub test_set: String,
    pub total_cases: usize,
    pub top_k: usize,
    pub retrieval_metrics: RetrievalSummary,
    pub answer_quality_metrics: QualityMetrics,
    /// Records whose judge reply was unusable.
    pub judge_failures: usize,
    /// 0-100.
    pub overall_score: f64,
    pub total_time_secs: f64,
}

/// Summary plus per-question details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub summary: EvaluationSummary,
    pub details: Vec<EvaluationRecord>,
}

impl EvaluationReport {
    /// Aggregate finished records.
    pub fn new(
        test_set: &str,
        top_k: usize,
        details: Vec<EvaluationRecord>,
        total_time_secs: f64,
    ) -> Self {
        let outcomes: Vec<RankOutcome> = details.iter().map(|r| r.outcome()).collect();
        let scores: Vec<JudgeScores> = details.iter().map(|r| r.judge_scores).collect();

        let retrieval = RetrievalMetrics::from_outcomes(&outcomes);
        let quality = QualityMetrics::from_scores(&scores);
        let overall = overall_score(&retrieval, &quality);

        let summary = EvaluationSummary {
            test_set: test_set.to_string(),
            total_cases: details.len(),
            top_k,
            retrieval_metrics: RetrievalSummary::from_metrics(&retrieval),
            answer_quality_metrics: QualityMetrics {
                avg_relevance: round_to(quality.avg_relevance, 2),
                avg_correctness: round_to(quality.avg_correctness, 2),
                avg_faithfulness: round_to(quality.avg_faithfulness, 2),
            },
            judge_failures: details.iter().filter(|r| r.judge_error.is_some()).count(),
            overall_score: round_to(overall, 1),
            total_time_secs: round_to(total_time_secs, 2),
        };

        Self { summary, details }
    }

    /// Write pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        fs::write(path, content).map_err(|e| RagError::io(path, e))?;
        Ok(())
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        let s = &self.summary;
        let r = &s.retrieval_metrics;
        let q = &s.answer_quality_metrics;

        println!("\n========== Evaluation Results ==========");
        println!("Test set: {}", s.test_set);
        println!("Total test cases: {}", s.total_cases);
        println!("Top-k: {}", s.top_k);
        println!("----------------------------------------");
        println!("Recall@1:  {}", r.recall_at_1);
        println!("Recall@3:  {}", r.recall_at_3);
        println!("Recall@5:  {}", r.recall_at_5);
        println!("MRR:       {:.4}", r.mrr);
        println!("Hit rate:  {:.1}%", r.hit_rate * 100.0);
        println!("----------------------------------------");
        println!("Avg answer relevance:   {:.2}/5", q.avg_relevance);
        println!("Avg answer correctness: {:.2}/5", q.avg_correctness);
        println!("Avg faithfulness:       {:.2}/5", q.avg_faithfulness);
        if s.judge_failures > 0 {
            println!("Unparseable judge replies: {}", s.judge_failures);
        }
        println!("----------------------------------------");
        println!("OVERALL SCORE: {:.1}/100", s.overall_score);
        println!("Total time: {:.1}s", s.total_time_secs);
        println!("========================================\n");
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
