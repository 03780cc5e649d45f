//! Release run orchestration
//!
//! One run: check the working copy, resolve the active release trains, let
//! the operator pick an action, perform it and put the working copy back on
//! the branch or revision it started from.
//!
//! A publish run also offers versions that an earlier stage-only run staged
//! and whose pull request has been merged since.

use crate::actions::{ReleaseAction, active_actions};
use crate::error::{Error, Result};
use crate::executor::{ReleaseContext, ReleaseMode};
use crate::git::GitClient;
use crate::lts::find_lts_branches;
use crate::registry::is_version_published;
use crate::trains::{fetch_active_release_trains, get_version_of_branch};
use crate::types::{ActiveReleaseTrains, CompletionState, StagedRelease, TrainPhase};
use crate::version::Version;
use tracing::{debug, error, warn};

/// An entry of the release menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseChoice {
    /// Publish a version staged by an earlier stage-only run
    PublishStaged(StagedRelease),
    /// Perform a release action
    Action(ReleaseAction),
}

/// Restores the working copy to a recorded revision when dropped
pub struct CheckoutGuard<'a> {
    git: &'a dyn GitClient,
    revision: String,
}

impl<'a> CheckoutGuard<'a> {
    /// Record the current branch or revision of the working copy
    pub fn record(git: &'a dyn GitClient) -> Result<Self> {
        let revision = git.current_branch_or_revision()?;
        Ok(Self { git, revision })
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        // Release steps leave version and changelog edits on a detached
        // upstream checkout
        if let Err(e) = self.git.restore(&self.revision) {
            warn!(revision = %self.revision, error = %e, "could not restore working copy");
        }
    }
}

/// Run one release action end to end
pub async fn run(ctx: &ReleaseContext<'_>) -> CompletionState {
    let result = run_inner(ctx).await;
    classify_outcome(ctx, result).await
}

async fn run_inner(ctx: &ReleaseContext<'_>) -> Result<()> {
    if ctx.git.has_uncommitted_changes()? {
        return Err(Error::FatalAction(
            "There are changes which are not committed and should be discarded.".to_string(),
        ));
    }

    let _restore = CheckoutGuard::record(ctx.git)?;

    let trains = fetch_active_release_trains(ctx.forge, ctx.next_branch).await?;
    let next_published = print_active_release_trains(ctx, &trains).await?;

    let staged = match ctx.mode {
        ReleaseMode::Publish => find_staged_releases(ctx, &trains).await?,
        ReleaseMode::StageOnly => Vec::new(),
    };
    match prompt_for_release_action(ctx, &trains, next_published, staged)? {
        ReleaseChoice::PublishStaged(release) => ctx.publish_staged_release(&release).await,
        ReleaseChoice::Action(action) => action.perform(&trains, ctx).await,
    }
}

async fn classify_outcome(ctx: &ReleaseContext<'_>, result: Result<()>) -> CompletionState {
    match result {
        Ok(()) => CompletionState::Success,
        Err(Error::UserAborted) => {
            ctx.progress
                .on_warning("Release action has been aborted manually.")
                .await;
            CompletionState::ManuallyAborted
        }
        Err(Error::FatalAction(message)) => {
            ctx.progress.on_error(&message).await;
            ctx.progress
                .on_error("Release action has been aborted due to fatal errors. See above.")
                .await;
            CompletionState::FatalError
        }
        Err(e) => {
            error!(error = ?e, "unexpected error during release");
            ctx.progress
                .on_error(&format!("An unexpected error occurred: {e}\n{e:?}"))
                .await;
            CompletionState::FatalError
        }
    }
}

/// Ask the operator which staged version to publish or which of the active
/// actions to perform
pub fn prompt_for_release_action(
    ctx: &ReleaseContext<'_>,
    trains: &ActiveReleaseTrains,
    next_published: bool,
    staged: Vec<StagedRelease>,
) -> Result<ReleaseChoice> {
    let mut choices: Vec<ReleaseChoice> =
        staged.into_iter().map(ReleaseChoice::PublishStaged).collect();
    choices.extend(active_actions(trains).into_iter().map(ReleaseChoice::Action));

    let labels: Vec<String> = choices
        .iter()
        .map(|choice| match choice {
            ReleaseChoice::PublishStaged(release) => release.describe(),
            ReleaseChoice::Action(action) => action.describe(trains, next_published),
        })
        .collect();
    let selected = ctx
        .prompt
        .select("Please select the type of release you want to perform.", &labels)?;
    if selected < choices.len() {
        Ok(choices.swap_remove(selected))
    } else {
        Err(Error::Internal(format!("release action {selected} is out of range")))
    }
}

/// Versions whose staging commit heads an upstream branch but which have not
/// been published.
///
/// Release trains are checked first, then LTS branches that exist upstream.
pub async fn find_staged_releases(
    ctx: &ReleaseContext<'_>,
    trains: &ActiveReleaseTrains,
) -> Result<Vec<StagedRelease>> {
    let mut candidates: Vec<StagedRelease> = Vec::new();
    let mut add = |branch: &str, version: Version, dist_tag: &str| {
        candidates.push(StagedRelease {
            branch: branch.to_string(),
            version,
            dist_tag: dist_tag.to_string(),
        });
    };
    if let Some(rc) = &trains.release_candidate {
        add(&rc.branch_name, rc.version, "next");
    }
    add(&trains.latest.branch_name, trains.latest.version, "latest");
    add(&trains.next.branch_name, trains.next.version, "next");

    let primary_package = ctx.config.primary_package()?;
    match find_lts_branches(ctx.registry, primary_package, ctx.now).await {
        Ok(lts) => {
            for branch in lts.active.into_iter().chain(lts.inactive) {
                if candidates.iter().any(|c| c.branch == branch.name)
                    || !ctx.forge.branch_exists(ctx.forge.repo(), &branch.name).await?
                {
                    continue;
                }
                let version = get_version_of_branch(ctx.forge, &branch.name).await?;
                candidates.push(StagedRelease {
                    branch: branch.name,
                    version,
                    dist_tag: branch.dist_tag,
                });
            }
        }
        Err(e) => warn!(error = %e, "not checking LTS branches for staged releases"),
    }

    let mut staged = Vec::new();
    for candidate in candidates {
        if is_version_published(ctx.registry, primary_package, &candidate.version).await? {
            continue;
        }
        let sha = ctx.forge.get_branch_head(&candidate.branch).await?;
        if ctx.is_staging_commit(&candidate.version, &sha).await? {
            debug!(branch = %candidate.branch, version = %candidate.version, "found staged release");
            staged.push(candidate);
        }
    }
    Ok(staged)
}

/// Print the active release trains and the state of the primary train.
///
/// Returns whether the version of the primary train has been published.
pub async fn print_active_release_trains(
    ctx: &ReleaseContext<'_>,
    trains: &ActiveReleaseTrains,
) -> Result<bool> {
    let next_published = is_version_published(
        ctx.registry,
        ctx.config.primary_package()?,
        &trains.next.version,
    )
    .await?;
    for line in describe_active_release_trains(trains, next_published) {
        ctx.progress.on_message(&line).await;
    }
    Ok(next_published)
}

/// Lines describing the active release trains
pub fn describe_active_release_trains(
    trains: &ActiveReleaseTrains,
    next_published: bool,
) -> Vec<String> {
    let mut lines = vec!["Currently active release branches in the project:".to_string()];

    if let Some(rc) = &trains.release_candidate {
        let phase = rc.phase().unwrap_or(TrainPhase::FeatureFreeze);
        lines.push(format!(
            " • {} contains changes for an upcoming {}, currently in {phase} phase.",
            rc.branch_name,
            release_type(rc.version.is_major())
        ));
        lines.push(format!(
            "   Most recent pre-release for this branch is \"v{}\".",
            rc.version
        ));
    }

    lines.push(format!(
        " • {} contains changes for the most recent patch.",
        trains.latest.branch_name
    ));
    lines.push(format!(
        "   Most recent patch version for this branch is \"v{}\".",
        trains.latest.version
    ));

    lines.push(format!(
        " • {} contains changes for a {} currently in active development.",
        trains.next.branch_name,
        release_type(trains.next.version.is_major())
    ));
    if next_published {
        lines.push(format!(
            "   Most recent pre-release version for this branch is \"v{}\".",
            trains.next.version
        ));
    } else {
        lines.push(format!(
            "   Version is currently set to \"v{}\", but has not been published.",
            trains.next.version
        ));
    }
    lines
}

const fn release_type(is_major: bool) -> &'static str {
    if is_major { "major" } else { "minor" }
}
