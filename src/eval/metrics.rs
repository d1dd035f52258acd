//! Ranked-retrieval metrics and the overall score.

use super::judge::JudgeScores;
use serde::{Deserialize, Serialize};

/// Where the expected source landed in one retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOutcome {
    pub hit: bool,
    /// 1-based rank of the first matching file, 0 on a miss.
    pub rank: usize,
    pub reciprocal_rank: f64,
}

impl RankOutcome {
    pub fn evaluate(retrieved: &[String], expected: &str) -> Self {
        let rank = rank_of(retrieved, expected);
        Self {
            hit: rank > 0,
            rank,
            reciprocal_rank: reciprocal_rank(rank),
        }
    }

    /// Whether the expected source is among the first `n` results.
    pub fn within(&self, n: usize) -> bool {
        self.hit && self.rank <= n
    }
}

/// 1-based position of the first occurrence of `expected`, or 0.
pub fn rank_of(retrieved: &[String], expected: &str) -> usize {
    retrieved
        .iter()
        .position(|f| f == expected)
        .map_or(0, |i| i + 1)
}

pub fn reciprocal_rank(rank: usize) -> f64 {
    if rank == 0 { 0.0 } else { 1.0 / rank as f64 }
}

/// Mean of reciprocal ranks; 0 for no cases.
pub fn mean_reciprocal_rank(reciprocal_ranks: &[f64]) -> f64 {
    mean(reciprocal_ranks.iter().copied(), reciprocal_ranks.len())
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}

/// Count of cases with the expected source within the first `n`, plus
/// the matching fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecallAt {
    pub k: usize,
    pub hits: usize,
    pub total: usize,
}

impl RecallAt {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }

    /// "hits/total (pct%)".
    pub fn display(&self) -> String {
        format!("{}/{} ({:.1}%)", self.hits, self.total, self.fraction() * 100.0)
    }
}

/// Cutoffs reported as recall@n.
pub const RECALL_CUTOFFS: [usize; 3] = [1, 3, 5];

/// Aggregate retrieval quality over a test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub total: usize,
    pub hits: usize,
    pub recall: Vec<RecallAt>,
    pub mrr: f64,
}

impl RetrievalMetrics {
    pub fn from_outcomes(outcomes: &[RankOutcome]) -> Self {
        let total = outcomes.len();
        let recall = RECALL_CUTOFFS
            .iter()
            .map(|&k| RecallAt {
                k,
                hits: outcomes.iter().filter(|o| o.within(k)).count(),
                total,
            })
            .collect();
        let rrs: Vec<f64> = outcomes.iter().map(|o| o.reciprocal_rank).collect();

        Self {
            total,
            hits: outcomes.iter().filter(|o| o.hit).count(),
            recall,
            mrr: mean_reciprocal_rank(&rrs),
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }

    pub fn recall_at(&self, k: usize) -> Option<&RecallAt> {
        self.recall.iter().find(|r| r.k == k)
    }
}

/// Mean judge scores, each on the 0-5 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub avg_relevance: f64,
    pub avg_correctness: f64,
    pub avg_faithfulness: f64,
}

impl QualityMetrics {
    /// Averages over all records, zeroed judge failures included.
    pub fn from_scores(scores: &[JudgeScores]) -> Self {
        let n = scores.len();
        Self {
            avg_relevance: mean(scores.iter().map(|s| s.relevance as f64), n),
            avg_correctness: mean(scores.iter().map(|s| s.correctness as f64), n),
            avg_faithfulness: mean(scores.iter().map(|s| s.faithfulness as f64), n),
        }
    }
}

/// Equal-weight blend of five [0,1] quantities, scaled to 0-100.
pub fn overall_score(retrieval: &RetrievalMetrics, quality: &QualityMetrics) -> f64 {
    20.0 * retrieval.mrr
        + 20.0 * (quality.avg_relevance / 5.0)
        + 20.0 * (quality.avg_correctness / 5.0)
        + 20.0 * (quality.avg_faithfulness / 5.0)
        + 20.0 * retrieval.hit_rate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mrr_example() {
        let outcomes = vec![
            RankOutcome::evaluate(&files(&["a", "b"]), "a"),
            RankOutcome::evaluate(&files(&["x", "a"]), "a"),
        ];
        assert_eq!(outcomes[0].reciprocal_rank, 1.0);
        assert_eq!(outcomes[1].reciprocal_rank, 0.5);

        let metrics = RetrievalMetrics::from_outcomes(&outcomes);
        assert!((metrics.mrr - 0.75).abs() < 1e-9);
        assert_eq!(metrics.hits, 2);
    }

    #[test]
    fn test_rank_uses_first_occurrence() {
        let retrieved = files(&["x", "a", "a", "y"]);
        assert_eq!(rank_of(&retrieved, "a"), 2);
        assert_eq!(rank_of(&retrieved, "z"), 0);
        assert_eq!(reciprocal_rank(0), 0.0);
    }

    #[test]
    fn test_miss() {
        let outcome = RankOutcome::evaluate(&files(&["x", "y"]), "a");
        assert!(!outcome.hit);
        assert_eq!(outcome.rank, 0);
        assert!(!outcome.within(5));
    }

    #[test]
    fn test_recall_is_monotonic() {
        let outcomes = vec![
            RankOutcome::evaluate(&files(&["a"]), "a"),
            RankOutcome::evaluate(&files(&["x", "y", "a"]), "a"),
            RankOutcome::evaluate(&files(&["x", "y", "z", "w", "a"]), "a"),
            RankOutcome::evaluate(&files(&["x"]), "a"),
        ];
        let metrics = RetrievalMetrics::from_outcomes(&outcomes);

        let r1 = metrics.recall_at(1).unwrap().fraction();
        let r3 = metrics.recall_at(3).unwrap().fraction();
        let r5 = metrics.recall_at(5).unwrap().fraction();
        assert!(r1 <= r3 && r3 <= r5);
        assert!(r5 <= metrics.hit_rate());
        assert_eq!(metrics.recall_at(3).unwrap().display(), "2/4 (50.0%)");
    }

    #[test]
    fn test_quality_averages_include_zeros() {
        let scores = vec![
            JudgeScores {
                relevance: 5,
                correctness: 4,
                faithfulness: 5,
            },
            JudgeScores::default(),
        ];
        let quality = QualityMetrics::from_scores(&scores);
        assert_eq!(quality.avg_relevance, 2.5);
        assert_eq!(quality.avg_correctness, 2.0);
    }

    #[test]
    fn test_overall_score_bounds() {
        let perfect = RetrievalMetrics::from_outcomes(&[RankOutcome::evaluate(&files(&["a"]), "a")]);
        let quality = QualityMetrics {
            avg_relevance: 5.0,
            avg_correctness: 5.0,
            avg_faithfulness: 5.0,
        };
        assert!((overall_score(&perfect, &quality) - 100.0).abs() < 1e-9);

        let empty = RetrievalMetrics::from_outcomes(&[]);
        assert_eq!(overall_score(&empty, &QualityMetrics::default()), 0.0);
    }
}
