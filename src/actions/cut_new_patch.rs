//! Patch release of the latest train

use super::version_hint;
use crate::error::Result;
use crate::executor::ReleaseContext;
use crate::types::ActiveReleaseTrains;
use crate::version::Version;
use crate::version::calculator::bump_patch;

fn new_version(trains: &ActiveReleaseTrains) -> Version {
    bump_patch(&trains.latest.version)
}

/// Patches can always be cut for the latest train
pub(super) const fn is_active(_trains: &ActiveReleaseTrains) -> bool {
    true
}

pub(super) fn describe(trains: &ActiveReleaseTrains) -> String {
    format!(
        "Cut a new patch release for the \"{}\" branch{}.",
        trains.latest.branch_name,
        version_hint(Ok(new_version(trains)))
    )
}

pub(super) async fn perform(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    ctx.release(&new_version(trains), &trains.latest.branch_name, "latest")
        .await
}
