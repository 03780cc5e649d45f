//! Stable release of the release-candidate train
//!
//! When the stable release is a new major, the previous latest train moves
//! into long-term support: its packages get the `v{major}-lts` dist-tag.

use super::{release_candidate_train, version_hint};
use crate::error::Result;
use crate::executor::{ReleaseContext, StageOutcome};
use crate::lts::lts_dist_tag_for_major;
use crate::types::ActiveReleaseTrains;
use crate::version::calculator::promote_to_stable;
use crate::version::{PrereleaseTag, Version};

fn new_version(trains: &ActiveReleaseTrains) -> Result<Version> {
    promote_to_stable(&release_candidate_train(trains)?.version)
}

/// Only release-candidates are promoted; feature-freeze goes through
/// a release-candidate first
pub(super) fn is_active(trains: &ActiveReleaseTrains) -> bool {
    trains
        .release_candidate
        .as_ref()
        .is_some_and(|rc| rc.version.prerelease_tag() == Some(PrereleaseTag::Rc))
}

pub(super) fn describe(trains: &ActiveReleaseTrains) -> String {
    format!(
        "Cut a stable release for the release-candidate branch{}.",
        version_hint(new_version(trains))
    )
}

pub(super) async fn perform(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    let branch = &release_candidate_train(trains)?.branch_name;
    let version = new_version(trains)?;

    if let StageOutcome::AwaitingMerge(_) = ctx.stage_and_await_merge(&version, branch).await? {
        return Ok(());
    }
    ctx.build_and_publish(&version, branch, "latest").await?;

    if version.is_major() {
        let previous = trains.latest.version;
        ctx.set_dist_tag_for_packages(&lts_dist_tag_for_major(previous.major), &previous)
            .await?;
    }

    ctx.cherry_pick_changelog_into_next_branch(&version, branch)
        .await?;
    Ok(())
}
