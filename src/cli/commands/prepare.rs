//! Prepare command implementation.

use super::{preflight_or_report, report};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::session::RagSession;
use anyhow::Result;

/// Run the prepare command.
pub async fn run_prepare(reference: &str, force: bool, settings: Settings) -> Result<()> {
    preflight_or_report(Operation::Prepare, &settings)?;

    let mut session = RagSession::from_settings(&settings).map_err(report)?;

    let spinner = Output::spinner(if force {
        "Rebuilding index..."
    } else {
        "Fetching transcript and building index..."
    });
    let result = if force {
        session.rebuild_video(reference).await
    } else {
        session.prepare_video(Some(reference)).await
    };
    spinner.finish_and_clear();

    let prepared = result.map_err(report)?;
    Output::prepared(&prepared);

    if prepared.was_created() {
        Output::info("Ask a question with: tubeqa ask \"<question>\"");
    }

    Ok(())
}
