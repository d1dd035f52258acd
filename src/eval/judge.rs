//! LLM-as-Judge scoring of generated answers.

use crate::error::{RagError, Result, Stage};
use crate::generator::build_context;
use crate::llm::{CompletionModel, CompletionRequest, Prompts};
use crate::retriever::RetrievedChunk;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

const JUDGE_TEMPERATURE: f32 = 0.0;
const JUDGE_MAX_TOKENS: u32 = 100;
const SCORE_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Three 1-5 scores for one answer. All zero when the judge reply was unusable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeScores {
    #[serde(rename = "answer_relevance")]
    pub relevance: u8,
    #[serde(rename = "answer_correctness")]
    pub correctness: u8,
    pub faithfulness: u8,
}

/// Scores plus the reason they were zeroed, if they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub scores: JudgeScores,
    pub error: Option<String>,
}

impl JudgeVerdict {
    fn scored(scores: JudgeScores) -> Self {
        Self {
            scores,
            error: None,
        }
    }

    fn unparseable(reason: String) -> Self {
        Self {
            scores: JudgeScores::default(),
            error: Some(reason),
        }
    }
}

/// LLM-as-Judge for answer quality.
pub struct LlmJudge {
    model: Arc<dyn CompletionModel>,
}

impl LlmJudge {
    /// Create a new judge over the given model.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Score `actual_answer` against the expectation and the retrieved context.
    ///
    /// A reply that cannot be parsed yields zero scores and an error note;
    /// a failed call is returned as an error tagged with the judge stage.
    pub async fn judge(
        &self,
        question: &str,
        expected_answer: &str,
        actual_answer: &str,
        chunks: &[RetrievedChunk],
    ) -> Result<JudgeVerdict> {
        let context = build_context(chunks);
        let prompt = Prompts::render_judge_answer(question, expected_answer, actual_answer, &context);
        let request = CompletionRequest::new(prompt)
            .with_temperature(JUDGE_TEMPERATURE)
            .with_max_tokens(JUDGE_MAX_TOKENS);

        let response = self
            .model
            .complete(request)
            .await
            .map_err(|e| e.at(Stage::Judge))?;

        Ok(match Self::parse_scores(&response) {
            Ok(scores) => JudgeVerdict::scored(scores),
            Err(e) => {
                warn!("Judge reply unusable for '{}': {}", question, e);
                JudgeVerdict::unparseable(e.to_string())
            }
        })
    }

    /// Parse judge response JSON. Every score must be an integer in 1..=5.
    pub fn parse_scores(response: &str) -> Result<JudgeScores> {
        let json_str = Self::extract_json(response);

        #[derive(Deserialize)]
        struct RawScores {
            answer_relevance: i64,
            answer_correctness: i64,
            faithfulness: i64,
        }

        let raw: RawScores = serde_json::from_str(&json_str).map_err(|e| {
            RagError::LlmParse(format!(
                "Failed to parse judge response: {}. Response: {}",
                e, response
            ))
        })?;

        Ok(JudgeScores {
            relevance: checked_score("answer_relevance", raw.answer_relevance)?,
            correctness: checked_score("answer_correctness", raw.answer_correctness)?,
            faithfulness: checked_score("faithfulness", raw.faithfulness)?,
        })
    }

    /// Extract JSON from response.
    fn extract_json(response: &str) -> String {
        let response = response.trim();

        if response.starts_with("```") {
            if let Some(end) = response.rfind("```") {
                let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
                if end > start {
                    return response[start..end].trim().to_string();
                }
            }
        }

        if let Some(start) = response.find('{') {
            if let Some(end) = response.rfind('}') {
                if end > start {
                    return response[start..=end].to_string();
                }
            }
        }

        response.to_string()
    }
}

fn checked_score(field: &str, value: i64) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|score| SCORE_RANGE.contains(score))
        .ok_or_else(|| {
            RagError::LlmParse(format!(
                "Judge score {} = {} is outside {}..={}",
                field,
                value,
                SCORE_RANGE.start(),
                SCORE_RANGE.end()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionModel for Canned {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            assert_eq!(request.max_tokens, JUDGE_MAX_TOKENS);
            assert!(request.system.is_none());
            Ok(self.0.to_string())
        }
    }

    struct Down;

    #[async_trait]
    impl CompletionModel for Down {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            Err(RagError::Http("connection refused".to_string()))
        }
    }

    #[test]
    fn test_parse_scores() {
        let response = r#"{"answer_relevance": 5, "answer_correctness": 4, "faithfulness": 3}"#;
        let scores = LlmJudge::parse_scores(response).unwrap();

        assert_eq!(
            scores,
            JudgeScores {
                relevance: 5,
                correctness: 4,
                faithfulness: 3
            }
        );
    }

    #[test]
    fn test_parse_fenced_and_prose() {
        let fenced = "```json\n{\"answer_relevance\": 4, \"answer_correctness\": 4, \"faithfulness\": 5}\n```";
        assert_eq!(LlmJudge::parse_scores(fenced).unwrap().faithfulness, 5);

        let prose = "Here you go: {\"answer_relevance\": 2, \"answer_correctness\": 1, \"faithfulness\": 3} Thanks";
        assert_eq!(LlmJudge::parse_scores(prose).unwrap().relevance, 2);
    }

    #[test]
    fn test_scores_outside_range_rejected() {
        let response = r#"{"answer_relevance": 0, "answer_correctness": 9, "faithfulness": 4.6}"#;
        assert!(matches!(
            LlmJudge::parse_scores(response),
            Err(RagError::LlmParse(_))
        ));

        let bounds = r#"{"answer_relevance": 1, "answer_correctness": 5, "faithfulness": 3}"#;
        assert_eq!(LlmJudge::parse_scores(bounds).unwrap().correctness, 5);
    }

    #[tokio::test]
    async fn test_invalid_scores_score_zero() {
        for reply in [
            r#"{"answer_relevance": 0, "answer_correctness": 4, "faithfulness": 4}"#,
            r#"{"answer_relevance": 4, "answer_correctness": 9, "faithfulness": 4}"#,
            r#"{"answer_relevance": 4, "answer_correctness": 4, "faithfulness": 4.6}"#,
        ] {
            let judge = LlmJudge::new(Arc::new(Canned(reply)));
            let verdict = judge.judge("q", "e", "a", &[]).await.unwrap();

            assert_eq!(verdict.scores, JudgeScores::default(), "{reply}");
            assert!(verdict.error.is_some(), "{reply}");
        }
    }

    #[test]
    fn test_scores_serialize_with_metric_names() {
        let json = serde_json::to_value(JudgeScores {
            relevance: 1,
            correctness: 2,
            faithfulness: 3,
        })
        .unwrap();
        assert_eq!(json["answer_relevance"], 1);
        assert_eq!(json["answer_correctness"], 2);
        assert_eq!(json["faithfulness"], 3);
    }

    #[tokio::test]
    async fn test_unparseable_reply_scores_zero() {
        let judge = LlmJudge::new(Arc::new(Canned("I think it was pretty good!")));
        let verdict = judge.judge("q", "expected", "actual", &[]).await.unwrap();

        assert_eq!(verdict.scores, JudgeScores::default());
        assert!(verdict.error.is_some());
    }

    #[tokio::test]
    async fn test_missing_field_scores_zero() {
        let judge = LlmJudge::new(Arc::new(Canned(r#"{"answer_relevance": 5}"#)));
        let verdict = judge.judge("q", "e", "a", &[]).await.unwrap();
        assert_eq!(verdict.scores.relevance, 0);
        assert!(verdict.error.is_some());
    }

    #[tokio::test]
    async fn test_transport_error_is_tagged() {
        let judge = LlmJudge::new(Arc::new(Down));
        let err = judge.judge("q", "e", "a", &[]).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Judge));
    }
}
