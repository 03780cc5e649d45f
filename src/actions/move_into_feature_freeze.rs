//! Branch the primary development train off into feature-freeze
//!
//! The new `{major}.{minor}.x` branch starts from the tip of the primary
//! branch and releases the next prerelease of its version. Afterwards the
//! primary branch moves on to the following minor through a separate pull
//! request that also carries the new release notes.
//!
//! When only staging, the primary branch pull request is opened right away
//! without release notes. The notes are cherry-picked once the staged
//! version is published.

use super::version_hint;
use crate::error::Result;
use crate::executor::{ReleaseContext, StageOutcome};
use crate::project::{PACKAGE_JSON_PATH, update_project_version};
use crate::types::ActiveReleaseTrains;
use crate::version::Version;
use crate::version::calculator::{bump_minor_for_next_cycle, bump_prerelease};

fn new_version(trains: &ActiveReleaseTrains) -> Result<Version> {
    bump_prerelease(&trains.next.version)
}

/// Commit message for moving the primary branch to a new development cycle
pub fn next_branch_bump_commit_message(version: &Version) -> String {
    format!("release: bump the next branch to v{version}")
}

/// Only one feature-freeze/release-candidate train may exist at a time
pub(super) const fn is_active(trains: &ActiveReleaseTrains) -> bool {
    trains.release_candidate.is_none()
}

pub(super) fn describe(trains: &ActiveReleaseTrains) -> String {
    format!(
        "Move the \"{}\" branch into feature-freeze phase{}.",
        trains.next.branch_name,
        version_hint(new_version(trains))
    )
}

pub(super) async fn perform(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    let version = new_version(trains)?;
    let branch = version.version_branch_name();

    create_version_branch_from_next(trains, ctx, &branch).await?;

    if let StageOutcome::AwaitingMerge(_) = ctx.stage_and_await_merge(&version, &branch).await? {
        return create_next_branch_update_pull_request(trains, ctx, None).await;
    }
    ctx.build_and_publish(&version, &branch, "next").await?;
    create_next_branch_update_pull_request(trains, ctx, Some((&version, &branch))).await
}

async fn create_version_branch_from_next(
    trains: &ActiveReleaseTrains,
    ctx: &ReleaseContext<'_>,
    branch: &str,
) -> Result<()> {
    let next_branch = &trains.next.branch_name;
    ctx.verify_passing_status(next_branch).await?;
    ctx.checkout_upstream_branch(next_branch)?;
    ctx.git.create_branch(branch)?;
    ctx.push_head_to_branch(ctx.forge.repo(), branch, false)
        .await?;
    ctx.progress
        .on_success(&format!("Version branch \"{branch}\" created."))
        .await;
    Ok(())
}

/// Open the pull request moving the primary branch to the next cycle,
/// cherry-picking the notes of `released` (version and branch) if given
async fn create_next_branch_update_pull_request(
    trains: &ActiveReleaseTrains,
    ctx: &ReleaseContext<'_>,
    released: Option<(&Version, &str)>,
) -> Result<()> {
    let next_branch = &trains.next.branch_name;
    let new_next = bump_minor_for_next_cycle(&trains.next.version);
    let message = next_branch_bump_commit_message(&new_next);

    ctx.checkout_upstream_branch(next_branch)?;
    update_project_version(ctx.project_dir, &new_next)?;
    // The version bump gets its own commit so the cherry-picked changelog
    // stays recognizable
    ctx.create_commit(&message, &[PACKAGE_JSON_PATH]).await?;

    let mut body = format!(
        "The previous \"next\" release-train has moved into the feature-freeze phase. \
         This PR updates the \"{next_branch}\" branch to the subsequent release-train."
    );
    if let Some((released, released_branch)) = released
        && ctx
            .create_cherry_pick_release_notes_commit(released, released_branch)
            .await?
    {
        body.push_str(&format!(
            "\n\nAlso this PR cherry-picks the changelog for v{released} into the \
             \"{next_branch}\" branch so that the changelog is up to date."
        ));
    }

    let pr = ctx
        .push_head_to_fork_and_create_pull_request(
            next_branch,
            &format!("next-release-train-{new_next}"),
            &format!("Update next branch to reflect new release-train \"v{new_next}\"."),
            &body,
        )
        .await?;
    ctx.progress
        .on_success(&format!(
            "Pull request for updating the \"{next_branch}\" branch has been created: {}",
            pr.url
        ))
        .await;
    Ok(())
}
