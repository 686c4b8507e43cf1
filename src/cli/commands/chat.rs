//! Interactive question session.
//!
//! Every question is answered independently from the active video. The exchange
//! history is kept only for `history` display and is never sent to the model.

use super::{activate, preflight_or_report, report};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::session::RagSession;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(video: Option<&str>, title: Option<&str>, settings: Settings) -> Result<()> {
    preflight_or_report(Operation::Ask, &settings)?;

    let mut session = RagSession::from_settings(&settings).map_err(report)?;
    activate(&mut session, video, title).await?;

    println!("\n{}", style("tubeqa chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. 'load <URL>' switches video, 'history' shows this session.").dim()
    );

    let mut history: Vec<(String, String)> = Vec::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            history.clear();
            Output::info("History cleared.");
            continue;
        }

        if input.eq_ignore_ascii_case("history") {
            for (question, answer) in &history {
                println!("{} {}", style("Q:").green().bold(), question);
                println!("{} {}\n", style("A:").cyan().bold(), answer);
            }
            continue;
        }

        if let Some(reference) = input.strip_prefix("load ") {
            // Keep the current video if the new one fails to load.
            let _ = activate(&mut session, Some(reference.trim()), None).await;
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = session.answer_with_retry(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                println!("\n{} {}\n", style("tubeqa:").cyan().bold(), answer);
                history.push((input.to_string(), answer));
            }
            Err(e) => Output::failure(&e),
        }
    }

    Ok(())
}
