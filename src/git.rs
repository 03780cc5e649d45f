//! Version-control plumbing
//!
//! The working copy is driven through the system `git` binary. Every
//! operation is a synchronous process invocation; failures carry the
//! captured stderr.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Local working copy operations needed by release actions
pub trait GitClient: Send + Sync {
    /// Fetch a ref from a remote into `FETCH_HEAD`
    fn fetch(&self, remote: &str, refspec: &str) -> Result<()>;

    /// Check out a branch or revision, optionally detached
    fn checkout(&self, rev: &str, detach: bool) -> Result<()>;

    /// Abort any in-progress operation, discard local changes to tracked
    /// files and check out a branch or revision
    fn restore(&self, rev: &str) -> Result<()>;

    /// Create (or reset) a local branch at `HEAD` and switch to it
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Push a refspec to a remote
    fn push(&self, remote: &str, refspec: &str, force: bool) -> Result<()>;

    /// Stage the given files and commit them as one commit
    fn commit(&self, message: &str, files: &[&str]) -> Result<()>;

    /// Current branch name, or the commit SHA when detached
    fn current_branch_or_revision(&self) -> Result<String>;

    /// Whether the working copy has uncommitted changes
    fn has_uncommitted_changes(&self) -> Result<bool>;
}

/// Git backend using system git
pub struct SystemGit {
    /// Repository working tree root
    work_tree: PathBuf,
}

impl SystemGit {
    /// Open a git repository containing `path`
    pub fn open(path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(|e| Error::Git(format!("Failed to execute git rev-parse: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "{} is not a git repository: {}",
                path.display(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Self {
            work_tree: PathBuf::from(stdout.trim()),
        })
    }

    /// Repository working tree root
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn git_cmd(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.work_tree);
        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd
    }

    /// Run git with the given arguments, returning stdout
    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(args = ?redact(args), "running git");
        let output = self
            .git_cmd()
            .args(args)
            .output()
            .map_err(|e| Error::Git(format!("Failed to execute git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed: {}",
                redact(args).join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Commands aborting an operation that leaves the working copy mid-way
const IN_PROGRESS_ABORTS: [&[&str]; 4] = [
    &["cherry-pick", "--abort"],
    &["rebase", "--abort"],
    &["am", "--abort"],
    &["merge", "--abort"],
];

/// Strip credentials from URL arguments before they reach logs
fn redact(args: &[&str]) -> Vec<String> {
    args.iter()
        .map(|arg| match (arg.find("://"), arg.find('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://<redacted>{}", &arg[..scheme_end], &arg[at..])
            }
            _ => (*arg).to_string(),
        })
        .collect()
}

impl GitClient for SystemGit {
    fn fetch(&self, remote: &str, refspec: &str) -> Result<()> {
        self.run(&["fetch", "-q", remote, refspec]).map(drop)
    }

    fn checkout(&self, rev: &str, detach: bool) -> Result<()> {
        if detach {
            self.run(&["checkout", "-q", "--detach", rev]).map(drop)
        } else {
            self.run(&["checkout", "-q", rev]).map(drop)
        }
    }

    fn restore(&self, rev: &str) -> Result<()> {
        for abort in IN_PROGRESS_ABORTS {
            // Fails when the operation is not in progress
            if self.run(abort).is_ok() {
                debug!(command = abort[0], "aborted in-progress operation");
            }
        }
        self.run(&["reset", "-q", "--hard"])?;
        self.checkout(rev, false)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        self.run(&["checkout", "-q", "-B", name]).map(drop)
    }

    fn push(&self, remote: &str, refspec: &str, force: bool) -> Result<()> {
        if force {
            self.run(&["push", "-q", "--force-with-lease", remote, refspec])
                .map(drop)
        } else {
            self.run(&["push", "-q", remote, refspec]).map(drop)
        }
    }

    fn commit(&self, message: &str, files: &[&str]) -> Result<()> {
        let mut add = vec!["add", "--"];
        add.extend_from_slice(files);
        self.run(&add)?;

        let mut commit = vec!["commit", "-q", "--no-verify", "-m", message, "--"];
        commit.extend_from_slice(files);
        self.run(&commit).map(drop)
    }

    fn current_branch_or_revision(&self) -> Result<String> {
        let branch = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = branch.trim();
        if branch == "HEAD" {
            // Detached HEAD
            return Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string());
        }
        Ok(branch.to_string())
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        let status = self.run(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!status.trim().is_empty())
    }
}
