//! Forget command implementation.

use super::{preflight_or_report, report};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::vector_store::VectorIndexStore;
use crate::video_source::VideoId;
use anyhow::Result;
use std::sync::Arc;

/// Run the forget command.
pub async fn run_forget(reference: &str, settings: Settings) -> Result<()> {
    preflight_or_report(Operation::Manage, &settings)?;

    let id = VideoId::parse(reference).map_err(report)?;
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding).map_err(report)?);
    let store = VectorIndexStore::from_settings(&settings, embedder).map_err(report)?;

    let title = store.title(&id).map_err(report)?;
    if store.delete(&id).await.map_err(report)? {
        Output::success(&format!(
            "Deleted index for \"{}\"",
            title.unwrap_or_else(|| id.to_string())
        ));
    } else {
        Output::warning(&format!("No saved index for {}", id));
    }

    Ok(())
}
