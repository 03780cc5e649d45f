//! Build command - build the release packages of the checked-out revision

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, spinner_style};
use anstream::println;
use indicatif::ProgressBar;
use release_train::builder::PackageBuilder;
use release_train::error::Result;
use std::path::Path;
use std::time::Duration;

/// Build the release packages and list them
pub async fn run_build(path: &Path, json: bool) -> Result<()> {
    let ctx = CommandContext::new(path)?;

    if json {
        let packages = ctx.builder.build().await?;
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message("Building release packages...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    let result = ctx.builder.build().await;
    spinner.finish_and_clear();

    let packages = result?;
    println!("{} Built {} package(s)", check(), packages.len());
    for package in &packages {
        println!(
            "  {} {}",
            package.name.emphasis(),
            package.output_path.display().to_string().muted()
        );
    }
    Ok(())
}
