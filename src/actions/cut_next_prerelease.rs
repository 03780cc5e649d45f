//! Prerelease of the primary development train
//!
//! While a feature-freeze/release-candidate train exists it owns the `next`
//! dist-tag, so this action is only offered without one.

use super::version_hint;
use crate::error::Result;
use crate::executor::ReleaseContext;
use crate::registry::is_version_published;
use crate::types::ActiveReleaseTrains;
use crate::version::calculator::next_development_prerelease;

pub(super) const fn is_active(trains: &ActiveReleaseTrains) -> bool {
    trains.release_candidate.is_none()
}

pub(super) fn describe(trains: &ActiveReleaseTrains, next_published: bool) -> String {
    format!(
        "Cut a new next pre-release for the \"{}\" branch{}.",
        trains.next.branch_name,
        version_hint(next_development_prerelease(&trains.next.version, next_published))
    )
}

pub(super) async fn perform(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    let current = &trains.next.version;
    let published =
        is_version_published(ctx.registry, ctx.config.primary_package()?, current).await?;
    let version = next_development_prerelease(current, published)?;
    if !published {
        ctx.progress
            .on_message(&format!(
                "v{current} has not been published yet, releasing it without a version bump."
            ))
            .await;
    }

    ctx.release(&version, &trains.next.branch_name, "next")
        .await
}
