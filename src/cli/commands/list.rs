//! List command implementation.

use super::report;
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::vector_store::VectorIndexStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding).map_err(report)?);
    let store = VectorIndexStore::from_settings(&settings, embedder).map_err(report)?;

    let mut videos = store.list_all().map_err(report)?;
    if videos.is_empty() {
        Output::info("No videos indexed yet. Use 'tubeqa prepare <URL>' to add one.");
        return Ok(());
    }
    videos.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

    let latest = store.most_recent().map_err(report)?;

    Output::header(&format!("Saved Videos ({})", videos.len()));
    println!();
    for (title, id) in &videos {
        Output::video_info(title, id.as_str(), latest.as_ref() == Some(id));
    }
    println!();
    Output::kv("Index directory", &store.index_dir().display().to_string());

    Ok(())
}
