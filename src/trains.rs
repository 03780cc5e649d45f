//! Active release train resolution
//!
//! Determines the `next`, `latest` and optional feature-freeze/release-candidate
//! trains from the branches of the upstream repository and the versions
//! recorded at their tips.

use crate::error::{Error, Result};
use crate::platform::ForgeService;
use crate::project::{PACKAGE_JSON_PATH, read_package_version};
use crate::types::{ActiveReleaseTrains, ReleaseTrain};
use crate::version::Version;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static VERSION_BRANCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.x$").expect("valid regex"));

/// A `{major}.{minor}.x` branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBranch {
    /// Branch name
    pub name: String,
    /// Major version encoded in the name
    pub major: u64,
    /// Minor version encoded in the name
    pub minor: u64,
}

/// Parse a `{major}.{minor}.x` branch name
pub fn parse_version_branch(name: &str) -> Option<VersionBranch> {
    let caps = VERSION_BRANCH.captures(name)?;
    Some(VersionBranch {
        name: name.to_string(),
        major: caps[1].parse().ok()?,
        minor: caps[2].parse().ok()?,
    })
}

/// Version branches among `branches`, newest first
pub fn version_branches_newest_first<S: AsRef<str>>(branches: &[S]) -> Vec<VersionBranch> {
    let mut found: Vec<VersionBranch> = branches
        .iter()
        .filter_map(|b| parse_version_branch(b.as_ref()))
        .collect();
    found.sort_by(|a, b| (b.major, b.minor).cmp(&(a.major, a.minor)));
    found
}

/// Version recorded in `package.json` at the tip of an upstream branch
pub async fn get_version_of_branch(forge: &dyn ForgeService, branch: &str) -> Result<Version> {
    let content = forge.get_file_contents(branch, PACKAGE_JSON_PATH).await?;
    read_package_version(&content).map_err(|e| {
        Error::AmbiguousBranchState(format!("cannot read version of branch \"{branch}\": {e}"))
    })
}

/// Resolve the active release trains of the upstream repository
pub async fn fetch_active_release_trains(
    forge: &dyn ForgeService,
    next_branch: &str,
) -> Result<ActiveReleaseTrains> {
    let next_version = get_version_of_branch(forge, next_branch).await?;
    let next = ReleaseTrain::new(next_branch, next_version);
    debug!(branch = next_branch, version = %next_version, "resolved next train");

    let branches = forge.list_branches().await?;
    let mut release_candidate: Option<ReleaseTrain> = None;
    let mut latest: Option<ReleaseTrain> = None;

    for branch in version_branches_newest_first(&branches) {
        let version = get_version_of_branch(forge, &branch.name).await?;
        debug!(branch = %branch.name, %version, "inspecting version branch");

        if version.major != branch.major || version.minor != branch.minor {
            return Err(Error::AmbiguousBranchState(format!(
                "branch \"{}\" carries version {version}, which does not match its name",
                branch.name
            )));
        }
        if version >= next.version {
            return Err(Error::AmbiguousBranchState(format!(
                "version branch \"{}\" ({version}) is not older than the \"{next_branch}\" \
                 branch ({})",
                branch.name, next.version
            )));
        }

        if version.is_stable() {
            latest = Some(ReleaseTrain::new(branch.name, version));
            break;
        }

        if let Some(existing) = &release_candidate {
            return Err(Error::AmbiguousBranchState(format!(
                "found two release-candidate branches: \"{}\" and \"{}\"",
                existing.branch_name, branch.name
            )));
        }
        release_candidate = Some(ReleaseTrain::new(branch.name, version));
    }

    let latest = latest.ok_or_else(|| {
        Error::AmbiguousBranchState(
            "unable to determine the latest release-train: no stable version branch".to_string(),
        )
    })?;

    if let Some(rc) = &release_candidate
        && rc.version.major < latest.version.major
    {
        return Err(Error::AmbiguousBranchState(format!(
            "release-candidate {} is older than latest {}",
            rc.version, latest.version
        )));
    }

    Ok(ActiveReleaseTrains {
        latest,
        next,
        release_candidate,
    })
}
