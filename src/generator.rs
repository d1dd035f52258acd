//! Answer generation from retrieved context.

use crate::error::{Result, Stage};
use crate::llm::{CompletionModel, CompletionRequest, Prompts};
use crate::retriever::RetrievedChunk;
use std::sync::Arc;
use tracing::debug;

/// Separator placed between chunk texts in a prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Sampling settings for answer generation.
pub const EVAL_TEMPERATURE: f32 = 0.0;
pub const INTERACTIVE_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_ANSWER_TOKENS: u32 = 500;

/// Join chunk texts in rank order.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Asks the language model to answer from retrieved context only.
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn CompletionModel>,
    assistant_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn CompletionModel>, assistant_name: impl Into<String>) -> Self {
        Self {
            model,
            assistant_name: assistant_name.into(),
            temperature: EVAL_TEMPERATURE,
            max_tokens: DEFAULT_ANSWER_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The request sent for `question` over `chunks`.
    pub fn request(&self, question: &str, chunks: &[RetrievedChunk]) -> CompletionRequest {
        let context = build_context(chunks);
        CompletionRequest::new(Prompts::render_answer_question(
            &self.assistant_name,
            question,
            &context,
        ))
        .with_system(Prompts::render_answer_system(&self.assistant_name))
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens)
    }

    /// Generate an answer. A failed call is not retried.
    pub async fn generate(&self, question: &str, chunks: &[RetrievedChunk]) -> Result<String> {
        let request = self.request(question, chunks);
        debug!(
            "Generating answer from {} chunks ({} prompt chars)",
            chunks.len(),
            request.user.chars().count()
        );

        let answer = self
            .model
            .complete(request)
            .await
            .map_err(|e| e.at(Stage::Generation))?;
        Ok(answer.trim().to_string())
    }
}
