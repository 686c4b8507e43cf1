//! tubeqa - Question answering over YouTube transcripts
//!
//! Fetches a video's transcript, splits it into overlapping chunks, embeds them into
//! a per-video vector index stored on disk, and answers questions with a language
//! model that is restricted to the retrieved chunks.
//!
//! # Architecture
//!
//! - `video_source` - Video references, transcript and metadata providers
//! - `transcript` - Normalized transcript segments
//! - `chunking` - Boundary-aware overlapping text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Per-video indexes, retrieval and the index store
//! - `catalog` - Video title catalog (JSON file or SQLite)
//! - `rag` - Grounded answer generation
//! - `session` - The prepare/answer workflow
//! - `config` - Settings and prompt templates
//!
//! # Example
//!
//! ```rust,no_run
//! use tubeqa::config::Settings;
//! use tubeqa::session::RagSession;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut session = RagSession::from_settings(&settings)?;
//!
//!     let video = session.prepare_video(Some("https://youtu.be/dQw4w9WgXcQ")).await?;
//!     println!("{} ({})", video.title, video.origin);
//!
//!     let answer = session.answer("What is this video about?").await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod lock;
pub mod openai;
pub mod rag;
pub mod session;
pub mod transcript;
pub mod vector_store;
pub mod video_source;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, Result, TubeqaError};
