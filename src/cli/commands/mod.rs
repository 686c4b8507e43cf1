//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod forget;
mod list;
mod prepare;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use forget::run_forget;
pub use list::run_list;
pub use prepare::run_prepare;
pub use search::run_search;

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{Result, TubeqaError};
use crate::session::{PreparedVideo, RagSession};

/// Run pre-flight checks, printing the failure before returning it.
fn preflight_or_report(operation: Operation, settings: &Settings) -> Result<()> {
    preflight::check(operation, settings).inspect_err(Output::failure)
}

/// Make `session` ready for the video named by `--video` or `--title`,
/// falling back to the most recently indexed one.
async fn activate(
    session: &mut RagSession,
    video: Option<&str>,
    title: Option<&str>,
) -> Result<PreparedVideo> {
    let spinner = Output::spinner("Preparing video...");
    let result = match (video, title) {
        (_, Some(title)) => session.select(title),
        (Some(reference), None) => session.prepare_video(Some(reference)).await,
        (None, None) => session.prepare_video(None).await,
    };
    spinner.finish_and_clear();

    let prepared = result.inspect_err(Output::failure)?;
    Output::prepared(&prepared);
    Ok(prepared)
}

/// Print a library error and convert it for the command layer.
fn report(err: TubeqaError) -> anyhow::Error {
    Output::failure(&err);
    err.into()
}
