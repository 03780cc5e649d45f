//! Error types for release-train

use thiserror::Error;

/// Errors surfaced by release-train
#[derive(Debug, Error)]
pub enum Error {
    /// The operator declined a required confirmation
    #[error("release action was aborted by the operator")]
    UserAborted,

    /// An external operation failed in a way that invalidates the release.
    ///
    /// The details have already been reported to the operator, so callers
    /// should only print the message.
    #[error("{0}")]
    FatalAction(String),

    /// A version transition was requested that the calculator cannot perform
    #[error("invalid version transition: {0}")]
    InvalidTransition(String),

    /// Branch state does not describe a consistent set of release trains
    #[error("ambiguous branch state: {0}")]
    AmbiguousBranchState(String),

    /// A version string could not be interpreted
    #[error("invalid version: {0}")]
    Version(String),

    /// GitHub API error
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Git command failed
    #[error("git error: {0}")]
    Git(String),

    /// Package registry error
    #[error("registry error: {0}")]
    Registry(String),

    /// Building release packages failed
    #[error("build error: {0}")]
    Build(String),

    /// Configuration is missing or invalid
    #[error("config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Octocrab error
    #[error("GitHub API error: {0}")]
    Octocrab(#[from] octocrab::Error),

    /// Internal invariant broken
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error is the distinguished "operator aborted" signal
    pub const fn is_user_aborted(&self) -> bool {
        matches!(self, Self::UserAborted)
    }

    /// Whether the error is a known, already-reported release failure
    pub const fn is_fatal_action(&self) -> bool {
        matches!(self, Self::FatalAction(_))
    }
}

/// Result alias for release-train
pub type Result<T> = std::result::Result<T, Error>;
