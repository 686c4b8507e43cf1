//! Generative model collaborator.

use crate::config::RagSettings;
use crate::error::{Result, TubeqaError};
use crate::openai::{create_client, generation_error};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// A fully rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Trait for text generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for the prompt.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Model name, for logging.
    fn model(&self) -> &str;
}

/// OpenAI chat completions backend.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    /// Create a generator for `model`.
    pub fn new(model: &str, temperature: f32) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature,
        })
    }

    /// Create a generator from settings.
    pub fn from_settings(settings: &RagSettings) -> Result<Self> {
        Self::new(&settings.model, settings.temperature)
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.clone())
                .build()
                .map_err(generation_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user.clone())
                .build()
                .map_err(generation_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(generation_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(generation_error)?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| TubeqaError::Generation {
                message: "Empty response from model".to_string(),
                retryable: false,
            })?
            .clone();

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_from_settings() {
        let settings = RagSettings::default();
        let generator = OpenAIGenerator::from_settings(&settings).unwrap();
        assert_eq!(generator.model(), "gpt-4o-mini");
        assert_eq!(generator.temperature, 0.0);
    }
}
