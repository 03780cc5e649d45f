//! Info command - show the active release trains

use crate::cli::context::CommandContext;
use crate::cli::style::Stylize;
use anstream::println;
use release_train::actions::active_actions;
use release_train::error::Result;
use release_train::registry::is_version_published;
use release_train::tool::describe_active_release_trains;
use release_train::trains::fetch_active_release_trains;
use std::path::Path;

/// Print the active release trains and the actions that apply to them
pub async fn run_info(path: &Path, token: &str) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    let forge = ctx.forge(token)?;

    let trains = fetch_active_release_trains(&forge, &ctx.config.github.main_branch).await?;
    let next_published = is_version_published(
        &ctx.registry,
        ctx.config.release.primary_package()?,
        &trains.next.version,
    )
    .await?;

    let mut lines = describe_active_release_trains(&trains, next_published).into_iter();
    if let Some(heading) = lines.next() {
        println!("{}", heading.emphasis());
    }
    for line in lines {
        println!("{line}");
    }

    println!();
    println!("{}", "Available release actions:".emphasis());
    for action in active_actions(&trains) {
        println!("  {} {}", "•".accent(), action.describe(&trains, next_published));
    }
    Ok(())
}
