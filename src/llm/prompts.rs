//! LLM prompts for answer generation and judging.
//!
//! Templates use `{placeholder}` markers filled with `str::replace`.

/// Sentence the assistant uses when the context does not cover the question.
pub const NO_ANSWER: &str = "I don't have information about that.";

/// Collection of prompts used by the generator and the judge.
pub struct Prompts;

impl Prompts {
    /// System prompt for the support assistant.
    pub fn answer_system() -> &'static str {
        "You are a helpful {assistant} customer support assistant. Answer questions directly and precisely, prioritizing the most specific facts from the provided context."
    }

    /// User prompt for answering a question from retrieved context.
    pub fn answer_question() -> &'static str {
        r#"You are a helpful customer support assistant for {assistant}.

INSTRUCTIONS:
- Answer the question based ONLY on the context provided below.
- Be specific and direct. Lead with the most important fact that answers the question.
- Include specific numbers, timeframes, and requirements from the context.
- If the answer is not in the context, say "{no_answer}"

CONTEXT:
{context}

QUESTION: {question}

ANSWER:"#
    }

    /// Prompt asking the judge for three 1-5 scores as strict JSON.
    pub fn judge_answer() -> &'static str {
        r#"You are an evaluation judge for a RAG system. Score the following on a scale of 1-5.

QUESTION: {question}

EXPECTED ANSWER: {expected_answer}

ACTUAL ANSWER: {actual_answer}

RETRIEVED CONTEXT:
{context}

Score these three metrics (1=worst, 5=best):

1. **Answer Relevance**: Does the actual answer address the question?
2. **Answer Correctness**: Does the actual answer match the expected answer in meaning?
3. **Faithfulness**: Is the actual answer supported by the retrieved context (no hallucination)?

Respond in this exact JSON format only, no other text:
{"answer_relevance": <1-5>, "answer_correctness": <1-5>, "faithfulness": <1-5>}"#
    }

    /// Fill the system prompt for a named assistant.
    pub fn render_answer_system(assistant: &str) -> String {
        Self::answer_system().replace("{assistant}", assistant)
    }

    /// Fill the answer prompt. Context goes in last so text inside it is
    /// never mistaken for a placeholder.
    pub fn render_answer_question(assistant: &str, question: &str, context: &str) -> String {
        Self::answer_question()
            .replace("{assistant}", assistant)
            .replace("{no_answer}", NO_ANSWER)
            .replace("{question}", question)
            .replace("{context}", context)
    }

    /// Fill the judge prompt.
    pub fn render_judge_answer(
        question: &str,
        expected_answer: &str,
        actual_answer: &str,
        context: &str,
    ) -> String {
        Self::judge_answer()
            .replace("{question}", question)
            .replace("{expected_answer}", expected_answer)
            .replace("{actual_answer}", actual_answer)
            .replace("{context}", context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_are_not_empty() {
        assert!(!Prompts::answer_system().is_empty());
        assert!(!Prompts::answer_question().is_empty());
        assert!(!Prompts::judge_answer().is_empty());
    }

    #[test]
    fn test_render_answer_question() {
        let prompt = Prompts::render_answer_question("StayEasy", "What is the fee?", "Fee is 3%.");

        assert!(prompt.contains("assistant for StayEasy."));
        assert!(prompt.contains("QUESTION: What is the fee?"));
        assert!(prompt.contains("CONTEXT:\nFee is 3%."));
        assert!(prompt.contains(NO_ANSWER));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_render_judge_keeps_json_shape() {
        let prompt = Prompts::render_judge_answer("q", "expected", "actual", "ctx");

        assert!(prompt.contains("EXPECTED ANSWER: expected"));
        assert!(prompt.contains("ACTUAL ANSWER: actual"));
        assert!(prompt.contains(r#"{"answer_relevance": <1-5>"#));
    }

    #[test]
    fn test_system_prompt_names_assistant() {
        assert!(Prompts::render_answer_system("Acme").starts_with("You are a helpful Acme"));
    }
}
