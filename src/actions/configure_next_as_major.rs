//! Turn the upcoming minor of the primary development train into a major
//!
//! Right after a feature-freeze split the primary branch carries
//! `{major}.{minor+1}.0-next.0`, which has not been released. Until it is,
//! the upcoming release may still become a major instead.

use super::version_hint;
use crate::error::Result;
use crate::executor::ReleaseContext;
use crate::types::ActiveReleaseTrains;
use crate::version::calculator::bump_major_for_next_cycle;
use crate::version::{Prerelease, PrereleaseTag};

pub(super) fn is_active(trains: &ActiveReleaseTrains) -> bool {
    let version = &trains.next.version;
    version.minor != 0 && version.prerelease == Some(Prerelease::new(PrereleaseTag::Next, 0))
}

pub(super) fn describe(trains: &ActiveReleaseTrains) -> String {
    format!(
        "Configure the \"{}\" branch to be released as major{}.",
        trains.next.branch_name,
        version_hint(Ok(bump_major_for_next_cycle(&trains.next.version)))
    )
}

/// Only stages the version bump; nothing is published
pub(super) async fn perform(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    let version = bump_major_for_next_cycle(&trains.next.version);
    let pr = ctx
        .stage_version_for_branch_and_create_pull_request(&version, &trains.next.branch_name)
        .await?;
    ctx.progress
        .on_message(&format!(
            "The \"{}\" branch will be released as v{version} once {} is merged.",
            trains.next.branch_name, pr.url
        ))
        .await;
    Ok(())
}
