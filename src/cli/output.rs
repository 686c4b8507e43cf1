//! CLI output formatting utilities.

use crate::error::{ErrorKind, TubeqaError};
use crate::session::{IndexOrigin, PreparedVideo};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print an error followed by a hint specific to its kind.
    pub fn failure(err: &TubeqaError) {
        Self::error(&err.to_string());
        if let Some(hint) = hint(err.kind()) {
            eprintln!("   {}", style(hint).dim());
        }
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a saved video.
    pub fn video_info(title: &str, id: &str, latest: bool) {
        let marker = if latest {
            style(" (most recent)").green().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {} ({}){}",
            style("*").cyan(),
            style(title).bold(),
            style(id).dim(),
            marker
        );
    }

    /// Print the status line after a video was prepared.
    pub fn prepared(video: &PreparedVideo) {
        let msg = match video.origin {
            IndexOrigin::Created => format!(
                "Indexed \"{}\" ({} chunks)",
                video.title, video.chunk_count
            ),
            IndexOrigin::Existing => format!("Loaded existing index for \"{}\"", video.title),
            IndexOrigin::AutoLoaded => format!("Auto-loaded most recent video \"{}\"", video.title),
            IndexOrigin::Selected => format!("Loaded saved video \"{}\"", video.title),
        };
        Self::success(&msg);
        Self::kv("Video", &video.video_id.watch_url());
    }

    /// Print one retrieved chunk.
    pub fn search_result(rank: usize, chunk_index: usize, score: f32, content: &str) {
        println!(
            "\n{} #{} chunk {} (score: {:.2})",
            style(">>").green(),
            rank,
            style(chunk_index).cyan(),
            score
        );
        println!("   {}", content_preview(content, 300));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Suggested next step for each error class.
fn hint(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::InvalidReference => Some(
            "Use a youtube.com/watch?v= URL, a youtu.be link or the 11-character video ID.",
        ),
        ErrorKind::TranscriptsDisabled => {
            Some("Transcripts are turned off for this video. Try a different video.")
        }
        ErrorKind::TranscriptUnavailable => Some(
            "No usable transcript in the configured languages (youtube.languages). Retry later or try another video.",
        ),
        ErrorKind::NoPriorVideo => Some("Nothing indexed yet. Run 'tubeqa prepare <URL>' first."),
        ErrorKind::NotReady => Some("Prepare a video before asking questions."),
        ErrorKind::IndexNotFound => Some("Run 'tubeqa list' to see saved videos."),
        ErrorKind::IndexBuild => Some("Run 'tubeqa prepare <URL> --force' to rebuild the index."),
        ErrorKind::Generation => Some("Check OPENAI_API_KEY and your account quota, then retry."),
        ErrorKind::Other => None,
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content,
    }
}
