//! Further prerelease of the feature-freeze/release-candidate train

use super::{release_candidate_train, version_hint};
use crate::error::Result;
use crate::executor::ReleaseContext;
use crate::types::ActiveReleaseTrains;
use crate::version::Version;
use crate::version::calculator::bump_prerelease;

fn new_version(trains: &ActiveReleaseTrains) -> Result<Version> {
    bump_prerelease(&release_candidate_train(trains)?.version)
}

pub(super) const fn is_active(trains: &ActiveReleaseTrains) -> bool {
    trains.release_candidate.is_some()
}

pub(super) fn describe(trains: &ActiveReleaseTrains) -> String {
    let phase = trains
        .release_candidate_phase()
        .map(|phase| format!(" \"{phase}\""))
        .unwrap_or_default();
    format!(
        "Cut a new next pre-release for the{phase} branch{}.",
        version_hint(new_version(trains))
    )
}

pub(super) async fn perform(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    let branch = &release_candidate_train(trains)?.branch_name;
    ctx.release(&new_version(trains)?, branch, "next").await
}
