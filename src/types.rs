//! Core types for release-train

use crate::version::{PrereleaseTag, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A release train: one branch plus the version it currently carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTrain {
    /// Branch name (`{major}.{minor}.x` for version branches)
    pub branch_name: String,
    /// Version recorded at the branch tip
    pub version: Version,
}

impl ReleaseTrain {
    /// Create a release train
    pub fn new(branch_name: impl Into<String>, version: Version) -> Self {
        Self {
            branch_name: branch_name.into(),
            version,
        }
    }

    /// Phase of a train that carries a prerelease
    pub fn phase(&self) -> Option<TrainPhase> {
        self.version.prerelease_tag().map(|tag| match tag {
            PrereleaseTag::Next => TrainPhase::FeatureFreeze,
            PrereleaseTag::Rc => TrainPhase::ReleaseCandidate,
        })
    }
}

/// Sub-phase of a branched-off release train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainPhase {
    /// Branched off, before the first release-candidate
    FeatureFreeze,
    /// Release-candidate, promotable to stable
    ReleaseCandidate,
}

impl std::fmt::Display for TrainPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeatureFreeze => write!(f, "feature-freeze"),
            Self::ReleaseCandidate => write!(f, "release-candidate"),
        }
    }
}

/// The release trains that are active at the start of a run
///
/// Recomputed from branch state on every run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveReleaseTrains {
    /// Most recent stable train (the patch branch)
    pub latest: ReleaseTrain,
    /// Primary development train
    pub next: ReleaseTrain,
    /// Train in feature-freeze or release-candidate phase, if any
    pub release_candidate: Option<ReleaseTrain>,
}

impl ActiveReleaseTrains {
    /// Phase of the feature-freeze/release-candidate train, if one exists
    pub fn release_candidate_phase(&self) -> Option<TrainPhase> {
        self.release_candidate.as_ref().and_then(ReleaseTrain::phase)
    }
}

/// A long-term support branch discovered from registry dist-tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LtsBranch {
    /// Branch name (`{major}.{minor}.x`)
    pub name: String,
    /// Most recent version published for this branch
    pub version: Version,
    /// Dist-tag pointing at `version`
    pub dist_tag: String,
}

/// LTS branches split by whether support is still active
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LtsBranches {
    /// Branches within their support window, most recent major first
    pub active: Vec<LtsBranch>,
    /// Branches past their support window, most recent major first
    pub inactive: Vec<LtsBranch>,
}

/// A package produced by the external builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPackage {
    /// Package name in the registry
    pub name: String,
    /// Directory containing the publishable package
    pub output_path: PathBuf,
}

/// A version whose staging pull request was merged but which has not been
/// published yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRelease {
    /// Upstream branch carrying the staging commit
    pub branch: String,
    /// Staged version
    pub version: Version,
    /// Dist-tag the version is published under
    pub dist_tag: String,
}

impl StagedRelease {
    /// Menu entry for publishing the staged version
    pub fn describe(&self) -> String {
        format!(
            "Publish the staged v{} release of the \"{}\" branch.",
            self.version, self.branch
        )
    }
}

/// A staged pull request awaiting merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestHandle {
    /// Pull request number
    pub id: u64,
    /// Web URL for the pull request
    pub url: String,
}

/// Host of the public GitHub instance
pub const GITHUB_HOST: &str = "github.com";

fn default_host() -> String {
    GITHUB_HOST.to_string()
}

/// A repository on the forge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeRepo {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Host serving the repository
    #[serde(default = "default_host")]
    pub host: String,
}

impl ForgeRepo {
    /// Create a reference to a repository on github.com
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            host: default_host(),
        }
    }

    /// Same repository on another host
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Whether the repository lives on the public GitHub instance
    pub fn is_public_github(&self) -> bool {
        self.host == GITHUB_HOST
    }

    /// Git URL for pushing/fetching, authenticated with the given token
    pub fn git_url(&self, token: &str) -> String {
        format!(
            "https://x-access-token:{token}@{}/{}/{}.git",
            self.host, self.owner, self.name
        )
    }

    /// Web URL listing the recent commits of a branch
    pub fn commits_url(&self, branch: &str) -> String {
        format!(
            "https://{}/{}/{}/commits/{branch}",
            self.host, self.owner, self.name
        )
    }
}

impl std::fmt::Display for ForgeRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Combined CI status of a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinedStatus {
    /// All required checks passed
    Success,
    /// Some checks are still running
    Pending,
    /// At least one check failed
    Failure,
}

impl std::fmt::Display for CombinedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Pending => write!(f, "pending"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open and awaiting merge
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Registry metadata of a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Dist-tag name to version string
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// Version string (plus `created`/`modified`) to publish time
    #[serde(rename = "time", default)]
    pub publish_times: HashMap<String, DateTime<Utc>>,
}

impl PackageMetadata {
    /// Whether the given version has been published
    pub fn is_published(&self, version: &Version) -> bool {
        self.publish_times.contains_key(&version.to_string())
    }
}

/// Result of a full orchestrator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// The action completed
    Success,
    /// The action failed and was aborted
    FatalError,
    /// The operator aborted the action
    ManuallyAborted,
}

impl CompletionState {
    /// Process exit code for this outcome
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success | Self::ManuallyAborted => 0,
            Self::FatalError => 1,
        }
    }
}
