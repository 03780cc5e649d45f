//! Release action catalog
//!
//! The set of release actions is closed. Each action decides from the
//! resolved release trains alone whether it applies, so activation never
//! performs I/O. Anything expensive (LTS discovery, registry lookups) happens
//! inside `perform`.

mod configure_next_as_major;
mod cut_lts_patch;
mod cut_new_patch;
mod cut_next_prerelease;
mod cut_release_candidate;
mod cut_release_candidate_prerelease;
mod cut_stable;
mod move_into_feature_freeze;

use crate::error::{Error, Result};
use crate::executor::ReleaseContext;
use crate::types::{ActiveReleaseTrains, ReleaseTrain};
use crate::version::Version;
use tracing::info;

pub use cut_lts_patch::{INACTIVE_LTS_CHOICE, lts_branch_choice};
pub use move_into_feature_freeze::next_branch_bump_commit_message;

/// A release action the operator can choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseAction {
    /// Promote the release-candidate train to stable
    CutStable,
    /// Move the feature-freeze train into the release-candidate phase
    CutReleaseCandidate,
    /// Cut another prerelease of the feature-freeze/release-candidate train
    CutReleaseCandidatePrerelease,
    /// Cut a patch release of the latest train
    CutNewPatch,
    /// Cut a prerelease of the primary development train
    CutNextPrerelease,
    /// Branch the primary development train off into feature-freeze
    MoveIntoFeatureFreeze,
    /// Turn the upcoming minor of the primary development train into a major
    ConfigureNextAsMajor,
    /// Cut a patch release of a long-term support branch
    CutLongTermSupportPatch,
}

impl ReleaseAction {
    /// All actions, in the order they are offered
    pub const ALL: [Self; 8] = [
        Self::CutStable,
        Self::CutReleaseCandidate,
        Self::CutReleaseCandidatePrerelease,
        Self::CutNewPatch,
        Self::CutNextPrerelease,
        Self::MoveIntoFeatureFreeze,
        Self::ConfigureNextAsMajor,
        Self::CutLongTermSupportPatch,
    ];

    /// Whether the action applies to the given release trains
    pub fn is_active(self, trains: &ActiveReleaseTrains) -> bool {
        match self {
            Self::CutStable => cut_stable::is_active(trains),
            Self::CutReleaseCandidate => cut_release_candidate::is_active(trains),
            Self::CutReleaseCandidatePrerelease => {
                cut_release_candidate_prerelease::is_active(trains)
            }
            Self::CutNewPatch => cut_new_patch::is_active(trains),
            Self::CutNextPrerelease => cut_next_prerelease::is_active(trains),
            Self::MoveIntoFeatureFreeze => move_into_feature_freeze::is_active(trains),
            Self::ConfigureNextAsMajor => configure_next_as_major::is_active(trains),
            Self::CutLongTermSupportPatch => cut_lts_patch::is_active(trains),
        }
    }

    /// Human-readable description shown in the action menu.
    ///
    /// `next_published` tells whether the version of the primary train is
    /// already in the registry.
    pub fn describe(self, trains: &ActiveReleaseTrains, next_published: bool) -> String {
        match self {
            Self::CutStable => cut_stable::describe(trains),
            Self::CutReleaseCandidate => cut_release_candidate::describe(trains),
            Self::CutReleaseCandidatePrerelease => {
                cut_release_candidate_prerelease::describe(trains)
            }
            Self::CutNewPatch => cut_new_patch::describe(trains),
            Self::CutNextPrerelease => cut_next_prerelease::describe(trains, next_published),
            Self::MoveIntoFeatureFreeze => move_into_feature_freeze::describe(trains),
            Self::ConfigureNextAsMajor => configure_next_as_major::describe(trains),
            Self::CutLongTermSupportPatch => cut_lts_patch::describe(trains),
        }
    }

    /// Run the action
    pub async fn perform(self, trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> Result<()> {
        info!(action = ?self, "performing release action");
        match self {
            Self::CutStable => cut_stable::perform(trains, ctx).await,
            Self::CutReleaseCandidate => cut_release_candidate::perform(trains, ctx).await,
            Self::CutReleaseCandidatePrerelease => {
                cut_release_candidate_prerelease::perform(trains, ctx).await
            }
            Self::CutNewPatch => cut_new_patch::perform(trains, ctx).await,
            Self::CutNextPrerelease => cut_next_prerelease::perform(trains, ctx).await,
            Self::MoveIntoFeatureFreeze => move_into_feature_freeze::perform(trains, ctx).await,
            Self::ConfigureNextAsMajor => configure_next_as_major::perform(trains, ctx).await,
            Self::CutLongTermSupportPatch => cut_lts_patch::perform(trains, ctx).await,
        }
    }
}

/// Actions that apply to the given release trains, in menu order
pub fn active_actions(trains: &ActiveReleaseTrains) -> Vec<ReleaseAction> {
    ReleaseAction::ALL
        .into_iter()
        .filter(|action| action.is_active(trains))
        .collect()
}

/// Release-candidate train of `trains`, for actions only active when one exists
fn release_candidate_train(trains: &ActiveReleaseTrains) -> Result<&ReleaseTrain> {
    trains.release_candidate.as_ref().ok_or_else(|| {
        Error::InvalidTransition(
            "no feature-freeze or release-candidate train is active".to_string(),
        )
    })
}

/// Version suffix for descriptions, empty when the version cannot be computed
fn version_hint(version: Result<Version>) -> String {
    version.map(|v| format!(" (v{v})")).unwrap_or_default()
}
