//! Stage and publish commands

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::Stylize;
use anstream::println;
use chrono::Utc;
use release_train::error::Result;
use release_train::executor::{ReleaseContext, ReleaseMode};
use release_train::prompt::TerminalPrompt;
use release_train::tool;
use release_train::types::CompletionState;
use std::path::Path;
use tokio::sync::watch;
use tracing::debug;

/// Run one release action, either only staging it or through publishing
pub async fn run_release(path: &Path, token: &str, mode: ReleaseMode) -> Result<CompletionState> {
    let ctx = CommandContext::new(path)?;
    let forge = ctx.forge(token)?;
    let progress = CliProgress::new();

    // First Ctrl-C cancels the run cooperatively, a second one exits
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("cancellation requested");
            let _ = cancel_tx.send(true);
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let release = ReleaseContext {
        git: &ctx.git,
        forge: &forge,
        registry: &ctx.registry,
        builder: &ctx.builder,
        prompt: &TerminalPrompt,
        progress: &progress,
        config: &ctx.config.release,
        next_branch: &ctx.config.github.main_branch,
        project_dir: &ctx.project_dir,
        token,
        mode,
        cancel: cancel_rx,
        now: Utc::now(),
    };

    let state = tool::run(&release).await;
    listener.abort();

    println!();
    match state {
        CompletionState::Success => match mode {
            ReleaseMode::StageOnly => println!(
                "{}",
                "Release staged. Once its pull requests are merged, run `publish` to publish it."
                    .success()
            ),
            ReleaseMode::Publish => println!("{}", "Release action has completed successfully.".success()),
        },
        CompletionState::ManuallyAborted => {
            println!("{}", "Release action has been manually aborted.".warn());
        }
        CompletionState::FatalError => {}
    }
    Ok(state)
}
