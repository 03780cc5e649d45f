//! release-train CLI

mod cli;

use anstream::eprintln;
use clap::{ArgAction, Parser, Subcommand};
use cli::style::Stylize;
use release_train::error::{Error, Result};
use release_train::executor::ReleaseMode;
use release_train::types::CompletionState;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "release-train")]
#[command(about = "Stage and publish releases across active release trains")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the repository (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// GitHub token (falls back to the TOKEN environment variable)
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    github_token: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage a release: bump the version and open the staging pull request
    Stage,

    /// Publish a release: stage, wait for the merge, build and publish
    Publish,

    /// Show the active release trains and the actions available for them
    Info,

    /// Point a dist-tag at a version for every configured package
    SetDistTag {
        /// Dist-tag to set (e.g. "latest" or "v10-lts")
        tag: String,
        /// Version the dist-tag should point to
        version: String,
    },

    /// Build the release packages of the checked-out revision
    Build {
        /// Print the built packages as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn require_token(token: Option<String>) -> Result<String> {
    token
        .or_else(|| std::env::var("TOKEN").ok())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            Error::Config(
                "No GitHub token set. Pass --github-token or set the GITHUB_TOKEN \
                 environment variable to a token with repository access."
                    .to_string(),
            )
        })
}

async fn run(cli: Cli) -> Result<CompletionState> {
    let path = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Stage => {
            let token = require_token(cli.github_token)?;
            cli::run_release(&path, &token, ReleaseMode::StageOnly).await
        }
        Commands::Publish => {
            let token = require_token(cli.github_token)?;
            cli::run_release(&path, &token, ReleaseMode::Publish).await
        }
        Commands::Info => {
            let token = require_token(cli.github_token)?;
            cli::run_info(&path, &token).await?;
            Ok(CompletionState::Success)
        }
        Commands::SetDistTag { tag, version } => {
            cli::run_set_dist_tag(&path, &tag, &version).await?;
            Ok(CompletionState::Success)
        }
        Commands::Build { json } => {
            cli::run_build(&path, json).await?;
            Ok(CompletionState::Success)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(state) => ExitCode::from(state.exit_code()),
        Err(e) => {
            eprintln!("{} {e}", "Error:".error());
            ExitCode::FAILURE
        }
    }
}
