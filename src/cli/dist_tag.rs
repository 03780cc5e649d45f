//! Set-dist-tag command

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use release_train::error::{Error, Result};
use release_train::registry::PackageRegistry;
use release_train::version::Version;
use std::path::Path;

/// Point `tag` at `version` for every configured package
pub async fn run_set_dist_tag(path: &Path, tag: &str, version: &str) -> Result<()> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(Error::Config("dist-tag must not be empty".to_string()));
    }
    let version = Version::parse(version)?;
    let ctx = CommandContext::new(path)?;

    for package in &ctx.config.release.npm_packages {
        ctx.registry.set_dist_tag(package, tag, &version).await?;
        println!(
            "{} Set {} dist-tag of {} to {}",
            check(),
            tag.accent(),
            package.emphasis(),
            format!("v{version}").accent()
        );
    }
    Ok(())
}
