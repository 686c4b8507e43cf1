//! Configuration module for tubeqa.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, GROUNDING_INSTRUCTION, REFUSAL_INSTRUCTION};
pub use settings::{
    CatalogBackend, ChunkingSettings, EmbeddingSettings, GeneralSettings, IndexSettings,
    PromptSettings, RagSettings, Settings, YoutubeSettings,
};
