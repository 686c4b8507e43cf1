//! Grounded answer generation.

use super::context::format_context_for_prompt;
use super::generator::{Generator, Prompt};
use crate::config::{Prompts, RagSettings, GROUNDING_INSTRUCTION, REFUSAL_INSTRUCTION};
use crate::error::{Result, TubeqaError};
use crate::vector_store::RetrievalResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answers a question from retrieved context with a single model call.
///
/// Holds no conversation state; every call is independent.
pub struct AnswerEngine {
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    answer_language: String,
}

impl AnswerEngine {
    /// Create an engine with default prompts answering in English.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            prompts: Prompts::default(),
            answer_language: "English".to_string(),
        }
    }

    /// Create an engine configured from settings.
    pub fn from_settings(generator: Arc<dyn Generator>, settings: &RagSettings, prompts: Prompts) -> Self {
        Self::new(generator)
            .with_prompts(prompts)
            .with_answer_language(&settings.answer_language)
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the language answers are written in.
    pub fn with_answer_language(mut self, language: &str) -> Self {
        self.answer_language = language.to_string();
        self
    }

    pub fn answer_language(&self) -> &str {
        &self.answer_language
    }

    /// Assemble the prompt for `question` over `context`.
    ///
    /// The grounding and refusal instructions are always present verbatim, even
    /// when a custom template omits them.
    pub fn build_prompt(&self, question: &str, context: &RetrievalResult) -> Prompt {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(context));
        vars.insert("answer_language".to_string(), self.answer_language.clone());

        let system = self
            .prompts
            .render_with_custom(&self.prompts.answer.system, &vars);
        let mut user = self
            .prompts
            .render_with_custom(&self.prompts.answer.user, &vars);

        for instruction in [GROUNDING_INSTRUCTION, REFUSAL_INSTRUCTION] {
            if !user.contains(instruction) {
                user.push_str("\n\n");
                user.push_str(instruction);
            }
        }

        Prompt { system, user }
    }

    /// Generate an answer to `question` grounded in `context`.
    #[instrument(skip(self, context), fields(chunks = context.len(), model = %self.generator.model()))]
    pub async fn answer(&self, question: &str, context: &RetrievalResult) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TubeqaError::InvalidInput("question is empty".to_string()));
        }

        info!("Answering question: {}", question);
        let prompt = self.build_prompt(question, context);
        let answer = self.generator.generate(&prompt).await?;

        debug!("Answer has {} characters", answer.len());
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnswerPrompts;
    use crate::testing::StubGenerator;
    use crate::vector_store::ScoredChunk;

    fn context(texts: &[&str]) -> RetrievalResult {
        RetrievalResult::new(
            texts
                .iter()
                .enumerate()
                .map(|(index, t)| ScoredChunk {
                    index,
                    content: t.to_string(),
                    score: 1.0 - index as f32 * 0.1,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_prompt_contains_context_question_and_instructions() {
        let generator = Arc::new(StubGenerator::replying("Cats."));
        let engine = AnswerEngine::new(generator.clone());

        let answer = engine
            .answer(
                "what is this video about?",
                &context(&["the video is about cats", "cats sleep a lot"]),
            )
            .await
            .unwrap();
        assert_eq!(answer, "Cats.");

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        let user = &prompts[0].user;
        assert!(user.contains("the video is about cats\n\ncats sleep a lot"));
        assert!(user.contains("Question: what is this video about?"));
        assert!(user.contains(GROUNDING_INSTRUCTION));
        assert!(user.contains(REFUSAL_INSTRUCTION));
        assert!(user.contains("in English ONLY"));
    }

    #[tokio::test]
    async fn test_refusal_instruction_present_without_relevant_context() {
        let generator = Arc::new(StubGenerator::replying("I don't know."));
        let engine = AnswerEngine::new(generator.clone()).with_answer_language("Norwegian");

        let answer = engine
            .answer("who won the 1998 world cup?", &context(&["cats sleep a lot"]))
            .await
            .unwrap();
        assert_eq!(answer, "I don't know.");

        let user = &generator.prompts()[0].user;
        assert!(user.contains(REFUSAL_INSTRUCTION));
        assert!(user.contains("Norwegian"));
    }

    #[tokio::test]
    async fn test_custom_template_gets_instructions_appended() {
        let generator = Arc::new(StubGenerator::replying("ok"));
        let mut prompts = Prompts::default();
        prompts.answer = AnswerPrompts {
            system: "Be brief.".to_string(),
            user: "{{context}}\n\nQ: {{question}}".to_string(),
        };
        let engine = AnswerEngine::new(generator.clone()).with_prompts(prompts);

        engine.answer("why?", &context(&["because"])).await.unwrap();

        let prompt = &generator.prompts()[0];
        assert_eq!(prompt.system, "Be brief.");
        assert!(prompt.user.starts_with("because\n\nQ: why?"));
        assert!(prompt.user.contains(GROUNDING_INSTRUCTION));
        assert!(prompt.user.ends_with(REFUSAL_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates_after_one_call() {
        let generator = Arc::new(StubGenerator::failing_times(5, true));
        let engine = AnswerEngine::new(generator.clone());

        let err = engine
            .answer("anything?", &context(&["text"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TubeqaError::Generation { .. }));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let generator = Arc::new(StubGenerator::replying("unused"));
        let engine = AnswerEngine::new(generator.clone());
        assert!(matches!(
            engine.answer("   ", &context(&["text"])).await,
            Err(TubeqaError::InvalidInput(_))
        ));
        assert_eq!(generator.calls(), 0);
    }
}
