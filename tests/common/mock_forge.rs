//! Mock forge service for testing

#![allow(dead_code)]

use async_trait::async_trait;
use release_train::error::{Error, Result};
use release_train::platform::ForgeService;
use release_train::types::{CombinedStatus, ForgeRepo, PrState, PullRequestHandle};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call record for `create_pull_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrCall {
    pub base: String,
    pub head: String,
    pub title: String,
    pub body: String,
}

/// Call record for `create_release`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReleaseCall {
    pub tag: String,
    pub body: String,
    pub prerelease: bool,
}

/// Simple mock forge service for testing
///
/// Features:
/// - Auto-incrementing PR numbers
/// - Merging a PR moves the base branch head to a commit carrying the PR title
/// - Call tracking for verification
/// - Configurable files, statuses and PR state sequences
/// - Error injection for failure path testing
pub struct MockForgeService {
    repo: ForgeRepo,
    next_pr_number: AtomicU64,
    files: Mutex<HashMap<(String, String), String>>,
    branches: Mutex<Vec<String>>,
    branch_heads: Mutex<HashMap<String, String>>,
    commit_messages: Mutex<HashMap<String, String>>,
    statuses: Mutex<HashMap<String, CombinedStatus>>,
    forks: Mutex<Vec<ForgeRepo>>,
    fork_branches: Mutex<HashSet<String>>,
    pr_states: Mutex<VecDeque<PrState>>,
    open_prs: Mutex<HashMap<u64, CreatePrCall>>,
    // Call tracking
    create_pr_calls: Mutex<Vec<CreatePrCall>>,
    create_tag_calls: Mutex<Vec<(String, String)>>,
    create_release_calls: Mutex<Vec<CreateReleaseCall>>,
    pr_state_calls: Mutex<Vec<u64>>,
    // Error injection
    error_on_create_pr: Mutex<Option<String>>,
    error_on_create_tag: Mutex<Option<String>>,
}

impl MockForgeService {
    /// Create a mock for `angular/dev-infra` with one fork owned by `release-bot`
    pub fn new() -> Self {
        Self::with_repo(ForgeRepo::new("angular", "dev-infra"))
    }

    /// Create a mock for the given upstream repository
    pub fn with_repo(repo: ForgeRepo) -> Self {
        let fork = ForgeRepo::new("release-bot", repo.name.clone());
        Self {
            repo,
            next_pr_number: AtomicU64::new(1),
            files: Mutex::new(HashMap::new()),
            branches: Mutex::new(Vec::new()),
            branch_heads: Mutex::new(HashMap::new()),
            commit_messages: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            forks: Mutex::new(vec![fork]),
            fork_branches: Mutex::new(HashSet::new()),
            pr_states: Mutex::new(VecDeque::new()),
            open_prs: Mutex::new(HashMap::new()),
            create_pr_calls: Mutex::new(Vec::new()),
            create_tag_calls: Mutex::new(Vec::new()),
            create_release_calls: Mutex::new(Vec::new()),
            pr_state_calls: Mutex::new(Vec::new()),
            error_on_create_pr: Mutex::new(None),
            error_on_create_tag: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `create_pull_request` return an error
    pub fn fail_create_pr(&self, msg: &str) {
        *self.error_on_create_pr.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `create_tag` return an error
    pub fn fail_create_tag(&self, msg: &str) {
        *self.error_on_create_tag.lock().unwrap() = Some(msg.to_string());
    }

    // === Response configuration ===

    /// Add a branch whose `package.json` carries `version`
    pub fn add_branch(&self, branch: &str, version: &str) {
        self.set_branch_version(branch, version);
        self.branches.lock().unwrap().push(branch.to_string());
        self.set_branch_head(branch, &format!("{branch}-head"));
    }

    /// Set the version in `package.json` at the tip of a branch
    pub fn set_branch_version(&self, branch: &str, version: &str) {
        self.set_file(
            branch,
            "package.json",
            &format!("{{\n  \"name\": \"root\",\n  \"version\": \"{version}\"\n}}\n"),
        );
    }

    /// Set the head commit of a branch without listing the branch.
    ///
    /// Stands in for branches the run itself pushes upstream.
    pub fn set_branch_head(&self, branch: &str, sha: &str) {
        self.branch_heads
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
    }

    /// Set the message of a commit
    pub fn set_commit_message(&self, sha: &str, message: &str) {
        self.commit_messages
            .lock()
            .unwrap()
            .insert(sha.to_string(), message.to_string());
    }

    /// Merge an open pull request: its base branch head moves to a commit
    /// named `merged-pr-{id}` whose message is the pull request title
    pub fn merge_pull_request(&self, id: u64) {
        let Some(pr) = self.open_prs.lock().unwrap().remove(&id) else {
            return;
        };
        let sha = format!("merged-pr-{id}");
        self.set_branch_head(&pr.base, &sha);
        self.set_commit_message(&sha, &pr.title);
    }

    /// Set the contents of a file at the tip of a branch
    pub fn set_file(&self, branch: &str, path: &str, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert((branch.to_string(), path.to_string()), contents.to_string());
    }

    /// Set the combined status of a commit (default: success)
    pub fn set_status(&self, sha: &str, status: CombinedStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(sha.to_string(), status);
    }

    /// States returned by successive `get_pull_request_state` calls.
    ///
    /// The last state repeats; without any, pull requests are merged.
    pub fn set_pr_states(&self, states: &[PrState]) {
        *self.pr_states.lock().unwrap() = states.iter().copied().collect();
    }

    /// Mark a branch name as taken in the fork
    pub fn add_fork_branch(&self, branch: &str) {
        self.fork_branches
            .lock()
            .unwrap()
            .insert(branch.to_string());
    }

    /// Remove all forks of the authenticated user
    pub fn clear_forks(&self) {
        self.forks.lock().unwrap().clear();
    }

    // === Call inspection ===

    pub fn get_create_pr_calls(&self) -> Vec<CreatePrCall> {
        self.create_pr_calls.lock().unwrap().clone()
    }

    pub fn get_create_tag_calls(&self) -> Vec<(String, String)> {
        self.create_tag_calls.lock().unwrap().clone()
    }

    pub fn get_create_release_calls(&self) -> Vec<CreateReleaseCall> {
        self.create_release_calls.lock().unwrap().clone()
    }

    pub fn pr_state_call_count(&self) -> usize {
        self.pr_state_calls.lock().unwrap().len()
    }

    // === Assertion helpers ===

    /// Assert pull requests were opened against exactly these bases, in order
    pub fn assert_pr_bases(&self, expected: &[&str]) {
        let bases: Vec<String> = self
            .get_create_pr_calls()
            .into_iter()
            .map(|c| c.base)
            .collect();
        assert_eq!(bases, expected, "pull request bases mismatch");
    }

    /// Assert no pull request was opened
    pub fn assert_no_prs(&self) {
        let calls = self.get_create_pr_calls();
        assert!(calls.is_empty(), "expected no pull requests, got {calls:?}");
    }

    fn next_pr_state(&self) -> PrState {
        let mut states = self.pr_states.lock().unwrap();
        if states.len() > 1 {
            states.pop_front().unwrap_or(PrState::Merged)
        } else {
            states.front().copied().unwrap_or(PrState::Merged)
        }
    }
}

impl Default for MockForgeService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForgeService for MockForgeService {
    fn repo(&self) -> &ForgeRepo {
        &self.repo
    }

    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        self.branch_heads
            .lock()
            .unwrap()
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::GitHubApi(format!("branch not found: {branch}")))
    }

    async fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.lock().unwrap().clone())
    }

    async fn branch_exists(&self, repo: &ForgeRepo, branch: &str) -> Result<bool> {
        if *repo == self.repo {
            return Ok(self.branch_heads.lock().unwrap().contains_key(branch));
        }
        Ok(self.fork_branches.lock().unwrap().contains(branch))
    }

    async fn get_file_contents(&self, branch: &str, path: &str) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(&(branch.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| Error::GitHubApi(format!("{path} not found on {branch}")))
    }

    async fn get_combined_status(&self, sha: &str) -> Result<CombinedStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(sha)
            .copied()
            .unwrap_or(CombinedStatus::Success))
    }

    async fn get_commit_message(&self, sha: &str) -> Result<String> {
        Ok(self
            .commit_messages
            .lock()
            .unwrap()
            .get(sha)
            .cloned()
            .unwrap_or_else(|| "fix: unrelated change".to_string()))
    }

    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle> {
        if let Some(msg) = self.error_on_create_pr.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }
        let call = CreatePrCall {
            base: base.to_string(),
            head: head.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        };
        self.create_pr_calls.lock().unwrap().push(call.clone());

        if let Some((_, branch)) = head.split_once(':') {
            self.add_fork_branch(branch);
        }

        let id = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        self.open_prs.lock().unwrap().insert(id, call);
        Ok(PullRequestHandle {
            id,
            url: format!("https://github.com/{}/pull/{id}", self.repo),
        })
    }

    async fn get_pull_request_state(&self, id: u64) -> Result<PrState> {
        self.pr_state_calls.lock().unwrap().push(id);
        let state = self.next_pr_state();

        if state == PrState::Merged {
            self.merge_pull_request(id);
        }
        Ok(state)
    }

    async fn create_tag(&self, name: &str, sha: &str) -> Result<()> {
        if let Some(msg) = self.error_on_create_tag.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }
        self.create_tag_calls
            .lock()
            .unwrap()
            .push((name.to_string(), sha.to_string()));
        Ok(())
    }

    async fn create_release(&self, tag: &str, body: &str, prerelease: bool) -> Result<()> {
        self.create_release_calls
            .lock()
            .unwrap()
            .push(CreateReleaseCall {
                tag: tag.to_string(),
                body: body.to_string(),
                prerelease,
            });
        Ok(())
    }

    async fn list_owned_forks(&self) -> Result<Vec<ForgeRepo>> {
        Ok(self.forks.lock().unwrap().clone())
    }
}
