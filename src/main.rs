//! tubeqa CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubeqa::cli::{commands, Cli, Commands};
use tubeqa::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(PathBuf::from);

    // Load configuration
    let settings = match &config_path {
        Some(path) => Settings::load_from(Some(path))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tubeqa={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.index_dir())?;

    // Execute command
    match &cli.command {
        Commands::Prepare { reference, force } => {
            commands::run_prepare(reference, *force, settings).await?;
        }

        Commands::Ask {
            question,
            video,
            title,
        } => {
            commands::run_ask(question, video.as_deref(), title.as_deref(), settings).await?;
        }

        Commands::Chat { video, title } => {
            commands::run_chat(video.as_deref(), title.as_deref(), settings).await?;
        }

        Commands::Search {
            query,
            video,
            top_k,
        } => {
            commands::run_search(query, video.as_deref(), *top_k, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Forget { reference } => {
            commands::run_forget(reference, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
