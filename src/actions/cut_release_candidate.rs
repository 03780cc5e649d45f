//! First release-candidate of the feature-freeze train

use super::{release_candidate_train, version_hint};
use crate::error::Result;
use crate::executor::ReleaseContext;
use crate::types::ActiveReleaseTrains;
use crate::version::calculator::promote_to_rc;
use crate::version::{PrereleaseTag, Version};

fn new_version(trains: &ActiveReleaseTrains) -> Result<Version> {
    promote_to_rc(&release_candidate_train(trains)?.version)
}

pub(super) fn is_active(trains: &ActiveReleaseTrains) -> bool {
    trains
        .release_candidate
        .as_ref()
        .is_some_and(|rc| rc.version.prerelease_tag() == Some(PrereleaseTag::Next))
}

pub(super) fn describe(trains: &ActiveReleaseTrains) -> String {
    format!(
        "Cut a first release-candidate for the feature-freeze branch{}.",
        version_hint(new_version(trains))
    )
}

pub(super) async fn perform(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    let branch = &release_candidate_train(trains)?.branch_name;
    ctx.release(&new_version(trains)?, branch, "next").await
}
