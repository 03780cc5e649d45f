//! Version arithmetic for release-train phase transitions
//!
//! Every function here is pure: it takes the current version of a train and
//! returns the version the transition produces. Transitions that make no
//! sense for the given version fail with [`Error::InvalidTransition`]; those
//! indicate an action was offered for a train it does not apply to.

use super::{Prerelease, PrereleaseTag, Version};
use crate::error::{Error, Result};

/// Next patch release, prerelease cleared
pub const fn bump_patch(version: &Version) -> Version {
    Version::new(version.major, version.minor, version.patch + 1)
}

/// Increment the trailing number of the current prerelease
pub fn bump_prerelease(version: &Version) -> Result<Version> {
    let Some(pre) = version.prerelease else {
        return Err(Error::InvalidTransition(format!(
            "cannot bump the prerelease of stable version {version}"
        )));
    };
    Ok(Version {
        prerelease: Some(Prerelease::new(pre.tag, pre.number + 1)),
        ..*version
    })
}

/// Move a feature-freeze version into the release-candidate phase
pub fn promote_to_rc(version: &Version) -> Result<Version> {
    if version.prerelease_tag() != Some(PrereleaseTag::Next) {
        return Err(Error::InvalidTransition(format!(
            "only feature-freeze versions can become a release-candidate, got {version}"
        )));
    }
    Ok(version.with_prerelease(PrereleaseTag::Rc, 0))
}

/// Drop the release-candidate label
pub fn promote_to_stable(version: &Version) -> Result<Version> {
    if version.prerelease_tag() != Some(PrereleaseTag::Rc) {
        return Err(Error::InvalidTransition(format!(
            "only release-candidates can be promoted to stable, got {version}"
        )));
    }
    Ok(Version::new(version.major, version.minor, version.patch))
}

/// First version of the development cycle after a feature-freeze split
pub const fn bump_minor_for_next_cycle(version: &Version) -> Version {
    Version::new(version.major, version.minor + 1, 0).with_prerelease(PrereleaseTag::Next, 0)
}

/// First version of the next major development cycle
pub const fn bump_major_for_next_cycle(version: &Version) -> Version {
    Version::new(version.major + 1, 0, 0).with_prerelease(PrereleaseTag::Next, 0)
}

/// Version for a new prerelease of the primary development train.
///
/// Right after a feature-freeze split the primary branch carries a version
/// that was never published. Releasing a bumped version then would ship no
/// new commits, so the unpublished version is released as is.
pub fn next_development_prerelease(version: &Version, is_published: bool) -> Result<Version> {
    if is_published {
        bump_prerelease(version)
    } else {
        Ok(*version)
    }
}
