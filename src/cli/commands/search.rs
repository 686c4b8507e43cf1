//! Search command implementation.

use super::{activate, preflight_or_report, report};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::session::RagSession;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    video: Option<&str>,
    top_k: Option<usize>,
    settings: Settings,
) -> Result<()> {
    preflight_or_report(Operation::Ask, &settings)?;

    let mut session = RagSession::from_settings(&settings).map_err(report)?;
    activate(&mut session, video, None).await?;

    let k = top_k.unwrap_or(session.top_k());
    let spinner = Output::spinner("Searching...");
    let result = session.retrieve(query, k).await;
    spinner.finish_and_clear();

    let result = result.map_err(report)?;
    if result.is_empty() {
        Output::warning("No matching chunks found.");
        return Ok(());
    }

    Output::success(&format!("Top {} chunks", result.len()));
    for (rank, chunk) in result.chunks.iter().enumerate() {
        Output::search_result(rank + 1, chunk.index, chunk.score, &chunk.content);
    }

    Ok(())
}
