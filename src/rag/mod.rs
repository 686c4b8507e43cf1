//! Retrieval-augmented answering.
//!
//! Turns a question plus retrieved transcript chunks into a grounded answer:
//! context block, then prompt, then one model call.

pub mod context;
mod engine;
mod generator;

pub use context::{format_context_for_display, format_context_for_prompt};
pub use engine::AnswerEngine;
pub use generator::{Generator, OpenAIGenerator, Prompt};
