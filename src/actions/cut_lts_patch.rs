//! Patch release of a long-term support branch
//!
//! LTS branches come from registry dist-tags, which is too expensive for the
//! activation check. The action is always offered and the operator picks the
//! branch once it runs.

use crate::error::{Error, Result};
use crate::executor::ReleaseContext;
use crate::lts::find_lts_branches;
use crate::types::{ActiveReleaseTrains, LtsBranch};
use crate::version::calculator::bump_patch;

/// Menu entry leading to the inactive LTS branches
pub const INACTIVE_LTS_CHOICE: &str = "Inactive old LTS versions (not recommended)";

/// Menu entry for an LTS branch
pub fn lts_branch_choice(branch: &LtsBranch) -> String {
    format!("v{} (from {})", branch.version.major, branch.name)
}

pub(super) const fn is_active(_trains: &ActiveReleaseTrains) -> bool {
    true
}

pub(super) fn describe(_trains: &ActiveReleaseTrains) -> String {
    "Cut a new release for an active LTS branch.".to_string()
}

pub(super) async fn perform(_trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
    let branch = prompt_for_target_lts_branch(ctx).await?;
    let version = bump_patch(&branch.version);
    ctx.release(&version, &branch.name, &branch.dist_tag).await
}

async fn prompt_for_target_lts_branch(ctx: &ReleaseContext<'_>) -> Result<LtsBranch> {
    let mut branches =
        find_lts_branches(ctx.registry, ctx.config.primary_package()?, ctx.now).await?;
    if branches.active.is_empty() && branches.inactive.is_empty() {
        return Err(Error::FatalAction(
            "No LTS branches have been published to the registry.".to_string(),
        ));
    }

    // Inactive branches stay selectable for exceptional patches
    let mut choices: Vec<String> = branches.active.iter().map(lts_branch_choice).collect();
    if !branches.inactive.is_empty() {
        choices.push(INACTIVE_LTS_CHOICE.to_string());
    }

    let selected = ctx.prompt.select(
        "Please select a version for which you want to cut a LTS patch",
        &choices,
    )?;
    if selected < branches.active.len() {
        return Ok(branches.active.swap_remove(selected));
    }

    let choices: Vec<String> = branches.inactive.iter().map(lts_branch_choice).collect();
    let selected = ctx.prompt.select(
        "Please select an inactive LTS version for which you want to cut a LTS patch",
        &choices,
    )?;
    if selected < branches.inactive.len() {
        Ok(branches.inactive.swap_remove(selected))
    } else {
        Err(Error::Internal(format!("LTS selection {selected} is out of range")))
    }
}
