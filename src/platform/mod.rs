//! Forge services
//!
//! Provides the interface to the code forge hosting the released repository.

mod github;

pub use github::GitHubService;

use crate::error::Result;
use crate::types::{CombinedStatus, ForgeRepo, PrState, PullRequestHandle};
use async_trait::async_trait;

/// Forge service trait for branch, status, pull request and release operations
///
/// The orchestration code only talks to the forge through this trait, so a
/// fake can stand in for the real API in tests.
#[async_trait]
pub trait ForgeService: Send + Sync {
    /// The upstream repository being released
    fn repo(&self) -> &ForgeRepo;

    /// SHA of the commit at the tip of an upstream branch
    async fn get_branch_head(&self, branch: &str) -> Result<String>;

    /// Names of all upstream branches
    async fn list_branches(&self) -> Result<Vec<String>>;

    /// Whether a branch exists in the given repository
    async fn branch_exists(&self, repo: &ForgeRepo, branch: &str) -> Result<bool>;

    /// Contents of a file at the tip of an upstream branch
    async fn get_file_contents(&self, branch: &str, path: &str) -> Result<String>;

    /// Combined CI status for a commit
    async fn get_combined_status(&self, sha: &str) -> Result<CombinedStatus>;

    /// Full message of a commit
    async fn get_commit_message(&self, sha: &str) -> Result<String>;

    /// Open a pull request against an upstream branch.
    ///
    /// `head` uses the `owner:branch` form so the branch may live in a fork.
    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle>;

    /// Current state of a pull request
    async fn get_pull_request_state(&self, id: u64) -> Result<PrState>;

    /// Create a lightweight tag pointing at a commit
    async fn create_tag(&self, name: &str, sha: &str) -> Result<()>;

    /// Create a forge release for an existing tag
    async fn create_release(&self, tag: &str, body: &str, prerelease: bool) -> Result<()>;

    /// Forks of the upstream repository owned by the authenticated user
    async fn list_owned_forks(&self) -> Result<Vec<ForgeRepo>>;
}
