//! Ask command implementation.

use super::{activate, preflight_or_report, report};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::session::RagSession;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    video: Option<&str>,
    title: Option<&str>,
    settings: Settings,
) -> Result<()> {
    preflight_or_report(Operation::Ask, &settings)?;

    let mut session = RagSession::from_settings(&settings).map_err(report)?;
    activate(&mut session, video, title).await?;

    let spinner = Output::spinner("Thinking...");
    let result = session.answer_with_retry(question).await;
    spinner.finish_and_clear();

    let answer = result.map_err(report)?;
    println!("\n{}\n", answer);

    Ok(())
}
