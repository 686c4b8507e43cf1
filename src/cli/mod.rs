//! CLI module for tubeqa.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// tubeqa - Ask questions about YouTube videos
///
/// Fetches a video's transcript, indexes it locally and answers questions using
/// only what was said in the video.
#[derive(Parser, Debug)]
#[command(name = "tubeqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a video, or reuse its existing index
    Prepare {
        /// YouTube URL or 11-character video ID
        reference: String,

        /// Discard any existing index and build it again
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question about a video (defaults to the most recently indexed one)
    Ask {
        /// The question to ask
        question: String,

        /// YouTube URL or video ID to ask about
        #[arg(long, conflicts_with = "title")]
        video: Option<String>,

        /// Title of a saved video to ask about
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Start an interactive question session
    Chat {
        /// YouTube URL or video ID to chat about
        #[arg(long, conflicts_with = "title")]
        video: Option<String>,

        /// Title of a saved video to chat about
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Show the transcript chunks most relevant to a query
    Search {
        /// Search query
        query: String,

        /// YouTube URL or video ID to search (defaults to the most recent one)
        #[arg(long)]
        video: Option<String>,

        /// Number of chunks to show (defaults to rag.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// List saved videos
    List,

    /// Delete a saved video index
    Forget {
        /// YouTube URL or video ID
        reference: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_title() {
        let cli = Cli::try_parse_from(["tubeqa", "ask", "what is it about?", "--title", "Cat Facts"])
            .unwrap();
        match cli.command {
            Commands::Ask {
                question,
                video,
                title,
            } => {
                assert_eq!(question, "what is it about?");
                assert!(video.is_none());
                assert_eq!(title.as_deref(), Some("Cat Facts"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_video_and_title_conflict() {
        assert!(Cli::try_parse_from([
            "tubeqa", "ask", "q", "--video", "abc12345678", "--title", "t"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_prepare_force() {
        let cli = Cli::try_parse_from(["tubeqa", "-vv", "prepare", "https://youtu.be/abc12345678", "--force"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Prepare { force: true, .. }));
    }
}
