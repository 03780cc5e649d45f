//! Staged release protocol
//!
//! Every release action composes the same steps, in order:
//!
//! 1. Stage: bump the version and changelog on a release branch, push the
//!    commit to a fork and open a pull request
//! 2. Await merge: poll the pull request until it is merged
//! 3. Build: check out the merged commit and build the release packages
//! 4. Publish: publish every package to the registry, one after another
//! 5. Cherry-pick: bring the release notes into the primary branch
//!
//! A failing step aborts the remaining ones. Steps talk to the outside world
//! only through the capabilities held by [`ReleaseContext`].

use crate::builder::PackageBuilder;
use crate::config::ReleaseConfig;
use crate::error::{Error, Result};
use crate::git::GitClient;
use crate::lts::lts_dist_tag_for_major;
use crate::platform::ForgeService;
use crate::progress::ProgressCallback;
use crate::project::{
    CHANGELOG_PATH, PACKAGE_JSON_PATH, extract_changelog_section, prepend_changelog_section,
    read_changelog_section, read_project_version, render_changelog_section,
    update_project_version,
};
use crate::prompt::{Prompt, confirm_or_abort};
use crate::registry::PackageRegistry;
use crate::types::{
    BuiltPackage, CombinedStatus, ForgeRepo, PrState, PullRequestHandle, StagedRelease,
};
use crate::version::Version;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How far the protocol runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Stop once the staging pull request is open
    StageOnly,
    /// Run every step through publishing
    Publish,
}

/// Result of the staging step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage-only mode: the pull request is open and left to the operator
    AwaitingMerge(PullRequestHandle),
    /// The staging pull request has been merged
    Merged,
}

/// Capabilities and settings shared by every step of a release run
pub struct ReleaseContext<'a> {
    /// Local working copy
    pub git: &'a dyn GitClient,
    /// Upstream forge
    pub forge: &'a dyn ForgeService,
    /// Package registry
    pub registry: &'a dyn PackageRegistry,
    /// Release output builder
    pub builder: &'a dyn PackageBuilder,
    /// Operator prompts
    pub prompt: &'a dyn Prompt,
    /// Operator-facing progress
    pub progress: &'a dyn ProgressCallback,
    /// Release settings
    pub config: &'a ReleaseConfig,
    /// Branch of the primary development train
    pub next_branch: &'a str,
    /// Root of the local working copy
    pub project_dir: &'a Path,
    /// Forge token used for authenticated git remotes
    pub token: &'a str,
    /// How far the protocol runs
    pub mode: ReleaseMode,
    /// Flips to `true` when the operator cancels the run
    pub cancel: watch::Receiver<bool>,
    /// Reference time for changelog dates and LTS windows
    pub now: DateTime<Utc>,
}

impl ReleaseContext<'_> {
    fn upstream(&self) -> &ForgeRepo {
        self.forge.repo()
    }

    fn upstream_url(&self) -> String {
        self.upstream().git_url(self.token)
    }

    /// Fail with [`Error::UserAborted`] once the run was cancelled
    pub fn ensure_not_cancelled(&self) -> Result<()> {
        if *self.cancel.borrow() {
            Err(Error::UserAborted)
        } else {
            Ok(())
        }
    }

    // === Stage ===

    /// Verify that the tip of an upstream branch passes its status checks.
    ///
    /// The operator may override a failing or pending status. Declining the
    /// override is fatal for a failing status and an abort for a pending one.
    pub async fn verify_passing_status(&self, branch: &str) -> Result<()> {
        let sha = self.forge.get_branch_head(branch).await?;
        let status = self.forge.get_combined_status(&sha).await?;
        let commits_url = self.upstream().commits_url(branch);
        debug!(%branch, %sha, %status, "checked combined status");

        match status {
            CombinedStatus::Success => {
                self.progress
                    .on_success("Upstream commit is passing all status checks.")
                    .await;
                Ok(())
            }
            CombinedStatus::Failure => {
                self.progress
                    .on_error(&format!(
                        "Commit \"{sha}\" does not pass all status checks. \
                         Please have a look at: {commits_url}"
                    ))
                    .await;
                if self
                    .prompt
                    .confirm("Do you want to ignore the status checks and proceed?", false)?
                {
                    self.progress
                        .on_warning("Upstream commit is failing checks, but status has been forcibly ignored.")
                        .await;
                    Ok(())
                } else {
                    Err(Error::FatalAction(format!(
                        "Commit \"{sha}\" on \"{branch}\" is failing its status checks"
                    )))
                }
            }
            CombinedStatus::Pending => {
                self.progress
                    .on_warning(&format!(
                        "Commit \"{sha}\" still has pending status checks. \
                         Please have a look at: {commits_url}"
                    ))
                    .await;
                if self
                    .prompt
                    .confirm("Do you want to ignore the status checks and proceed?", false)?
                {
                    self.progress
                        .on_warning("Upstream commit is pending checks, but status has been forcibly ignored.")
                        .await;
                    Ok(())
                } else {
                    Err(Error::UserAborted)
                }
            }
        }
    }

    /// Check out the tip of an upstream branch in detached state
    pub fn checkout_upstream_branch(&self, branch: &str) -> Result<()> {
        self.git.fetch(&self.upstream_url(), branch)?;
        self.git.checkout("FETCH_HEAD", true)
    }

    /// Write a new version to `package.json` and prepend its changelog section
    pub async fn update_project_version_and_changelog(&self, version: &Version) -> Result<()> {
        update_project_version(self.project_dir, version)?;
        self.progress
            .on_success(&format!("Updated project version to {version}"))
            .await;

        let notes = self.generate_release_notes(version).await?;
        let section = render_changelog_section(version, self.now.date_naive(), &notes);
        prepend_changelog_section(self.project_dir, version, &section)?;
        self.progress
            .on_success(&format!("Updated the changelog to capture changes for \"{version}\"."))
            .await;
        Ok(())
    }

    async fn generate_release_notes(&self, version: &Version) -> Result<String> {
        let Some(command) = self.config.changelog_command_for(version) else {
            return Ok(String::new());
        };
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config("release.changelog_command is empty".to_string()))?;

        debug!(%program, ?args, "generating release notes");
        let output = Command::new(program)
            .args(args)
            .current_dir(self.project_dir)
            .output()
            .await?;
        if !output.status.success() {
            self.progress
                .on_error(&format!("Could not generate release notes for {version}"))
                .await;
            return Err(Error::FatalAction(format!(
                "Release notes command exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Stage a version on an upstream branch and open the staging pull request
    pub async fn stage_version_for_branch_and_create_pull_request(
        &self,
        version: &Version,
        branch: &str,
    ) -> Result<PullRequestHandle> {
        self.ensure_not_cancelled()?;
        self.verify_passing_status(branch).await?;
        self.checkout_upstream_branch(branch)?;
        self.update_project_version_and_changelog(version).await?;

        self.progress
            .on_warning("Please review the changelog and ensure that the log contains only changes that apply to the public API surface.")
            .await;
        confirm_or_abort(self.prompt, "Do you want to proceed and commit the changes?")?;

        let message = self.config.release_commit_message(version);
        self.create_commit(&message, &[PACKAGE_JSON_PATH, CHANGELOG_PATH])
            .await?;
        self.progress
            .on_success(&format!("Created release commit for: \"{version}\"."))
            .await;

        let pr = self
            .push_head_to_fork_and_create_pull_request(
                branch,
                &format!("release-stage-{version}"),
                &message,
                &format!("Sets the version of the \"{branch}\" branch to {version} and updates the changelog."),
            )
            .await?;
        self.progress
            .on_success(&format!(
                "Pull request for updating the \"{branch}\" branch has been created: {}",
                pr.url
            ))
            .await;
        Ok(pr)
    }

    /// Commit `files` of the working copy
    pub async fn create_commit(&self, message: &str, files: &[&str]) -> Result<()> {
        if let Err(e) = self.git.commit(message, files) {
            self.progress
                .on_error(&format!("Could not create commit \"{message}\"."))
                .await;
            return Err(Error::FatalAction(format!(
                "Creating commit \"{message}\" failed: {e}"
            )));
        }
        Ok(())
    }

    /// Push the checked-out commit to `branch` of `repo`
    pub async fn push_head_to_branch(&self, repo: &ForgeRepo, branch: &str, force: bool) -> Result<()> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        if let Err(e) = self.git.push(&repo.git_url(self.token), &refspec, force) {
            self.progress
                .on_error(&format!("Could not push the \"{branch}\" branch to {repo}."))
                .await;
            return Err(Error::FatalAction(format!(
                "Pushing \"{branch}\" to {repo} failed: {e}"
            )));
        }
        Ok(())
    }

    /// Fork of the upstream repository owned by the authenticated user
    pub async fn get_fork_of_authenticated_user(&self) -> Result<ForgeRepo> {
        self.forge.list_owned_forks().await?.into_iter().next().ok_or_else(|| {
            Error::FatalAction(format!(
                "Unable to find fork for currently authenticated user. \
                 Please ensure you created a fork of: {}.",
                self.upstream()
            ))
        })
    }

    /// First free branch name in `fork`, starting with `proposed`
    pub async fn find_available_fork_branch(&self, fork: &ForgeRepo, proposed: &str) -> Result<String> {
        let mut name = proposed.to_string();
        let mut suffix = 0;
        while self.forge.branch_exists(fork, &name).await? {
            suffix += 1;
            name = format!("{proposed}-{suffix}");
        }
        Ok(name)
    }

    /// Push the checked-out commit to a fresh fork branch and open a pull
    /// request for it against an upstream branch
    pub async fn push_head_to_fork_and_create_pull_request(
        &self,
        target_branch: &str,
        proposed_fork_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle> {
        let fork = self.get_fork_of_authenticated_user().await?;
        let branch = self
            .find_available_fork_branch(&fork, proposed_fork_branch)
            .await?;

        self.push_head_to_branch(&fork, &branch, true).await?;
        info!(fork = %fork, %branch, "pushed staging branch");

        self.forge
            .create_pull_request(target_branch, &format!("{}:{branch}", fork.owner), title, body)
            .await
    }

    // === Await merge ===

    /// Poll a pull request until it is merged.
    ///
    /// A pull request closed without merge, or a cancelled run, aborts.
    pub async fn wait_for_pull_request_to_be_merged(&self, pr: &PullRequestHandle) -> Result<()> {
        self.progress
            .on_wait_start(&format!(
                "Waiting for pull request #{} to be merged: {}",
                pr.id, pr.url
            ))
            .await;
        let result = self.poll_until_merged(pr).await;
        self.progress.on_wait_end().await;

        match &result {
            Ok(()) => {
                self.progress
                    .on_success(&format!("Pull request #{} has been merged.", pr.id))
                    .await;
            }
            Err(Error::UserAborted) => {
                self.progress
                    .on_warning(&format!(
                        "Stopped waiting for pull request #{}. It will not be published.",
                        pr.id
                    ))
                    .await;
            }
            Err(_) => {}
        }
        result
    }

    async fn poll_until_merged(&self, pr: &PullRequestHandle) -> Result<()> {
        let mut cancel = self.cancel.clone();
        loop {
            self.ensure_not_cancelled()?;
            match self.forge.get_pull_request_state(pr.id).await? {
                PrState::Merged => return Ok(()),
                PrState::Closed => {
                    warn!(pr = pr.id, "pull request closed without merge");
                    return Err(Error::UserAborted);
                }
                PrState::Open => {
                    debug!(pr = pr.id, "pull request not merged yet");
                    if sleep_or_cancel(&mut cancel, self.config.poll_interval()).await {
                        return Err(Error::UserAborted);
                    }
                }
            }
        }
    }

    /// Stage a version and, unless only staging, wait for the merge
    pub async fn stage_and_await_merge(&self, version: &Version, branch: &str) -> Result<StageOutcome> {
        let pr = self
            .stage_version_for_branch_and_create_pull_request(version, branch)
            .await?;
        match self.mode {
            ReleaseMode::StageOnly => Ok(StageOutcome::AwaitingMerge(pr)),
            ReleaseMode::Publish => {
                self.wait_for_pull_request_to_be_merged(&pr).await?;
                Ok(StageOutcome::Merged)
            }
        }
    }

    // === Build and publish ===

    /// Build the merged staging commit of `branch` and publish its packages
    pub async fn build_and_publish(
        &self,
        version: &Version,
        branch: &str,
        dist_tag: &str,
    ) -> Result<Vec<BuiltPackage>> {
        self.ensure_not_cancelled()?;
        let sha = self.forge.get_branch_head(branch).await?;
        self.verify_staging_commit(version, &sha).await?;

        self.git.fetch(&self.upstream_url(), branch)?;
        self.git.checkout(&sha, true)?;

        self.builder.install_dependencies().await.map_err(|e| {
            Error::FatalAction(format!("Could not install dependencies for {version}: {e}"))
        })?;
        let packages = match self.builder.build().await {
            Ok(packages) => packages,
            Err(e) => {
                self.progress
                    .on_error("Release output could not be built.")
                    .await;
                return Err(Error::FatalAction(format!("Release output could not be built: {e}")));
            }
        };
        self.progress
            .on_success("Built release output for all packages.")
            .await;

        self.verify_package_versions(version, &packages).await?;
        self.create_forge_release(version, &sha).await?;

        for package in &packages {
            self.publish_built_package(package, dist_tag).await?;
        }
        self.progress
            .on_success(&format!("Published all packages to \"{dist_tag}\"."))
            .await;
        Ok(packages)
    }

    /// Whether commit `sha` is the staging commit of `version`
    pub async fn is_staging_commit(&self, version: &Version, sha: &str) -> Result<bool> {
        let expected = self.config.release_commit_message(version);
        let message = self.forge.get_commit_message(sha).await?;
        Ok(message.starts_with(&expected))
    }

    async fn verify_staging_commit(&self, version: &Version, sha: &str) -> Result<()> {
        if self.is_staging_commit(version, sha).await? {
            return Ok(());
        }
        self.progress
            .on_error(&format!(
                "Latest commit of the branch is not the staging commit for {version}."
            ))
            .await;
        Err(Error::FatalAction(format!(
            "Commit {sha} is not the staging commit \"{}\"",
            self.config.release_commit_message(version)
        )))
    }

    async fn verify_package_versions(&self, version: &Version, packages: &[BuiltPackage]) -> Result<()> {
        for package in packages {
            let built = read_project_version(&package.output_path)?;
            if built != *version {
                self.progress
                    .on_error(&format!(
                        "Built package \"{}\" has version {built}, expected {version}.",
                        package.name
                    ))
                    .await;
                return Err(Error::FatalAction(format!(
                    "Built package \"{}\" does not match the staged version {version}",
                    package.name
                )));
            }
        }
        Ok(())
    }

    async fn create_forge_release(&self, version: &Version, sha: &str) -> Result<()> {
        let tag = version.to_string();
        let notes = match read_changelog_section(self.project_dir, version) {
            Ok(notes) => notes.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not read release notes for forge release");
                String::new()
            }
        };
        self.forge.create_tag(&tag, sha).await?;
        self.forge
            .create_release(&tag, &notes, !version.is_stable())
            .await?;
        self.progress
            .on_success(&format!("Created release for \"{version}\" on the forge."))
            .await;
        Ok(())
    }

    async fn publish_built_package(&self, package: &BuiltPackage, dist_tag: &str) -> Result<()> {
        debug!(package = %package.name, %dist_tag, "publishing");
        match self.registry.publish(&package.output_path, dist_tag).await {
            Ok(()) => {
                self.progress
                    .on_success(&format!("Successfully published \"{}\".", package.name))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.progress
                    .on_error(&format!("Could not publish \"{}\".", package.name))
                    .await;
                Err(Error::FatalAction(format!(
                    "Publishing \"{}\" failed: {e}",
                    package.name
                )))
            }
        }
    }

    /// Point a dist-tag at `version` for every configured package
    pub async fn set_dist_tag_for_packages(&self, dist_tag: &str, version: &Version) -> Result<()> {
        for package in &self.config.npm_packages {
            if let Err(e) = self.registry.set_dist_tag(package, dist_tag, version).await {
                self.progress
                    .on_error(&format!(
                        "Could not set \"{dist_tag}\" dist-tag for \"{package}\"."
                    ))
                    .await;
                return Err(Error::FatalAction(format!(
                    "Setting dist-tag \"{dist_tag}\" for \"{package}\" failed: {e}"
                )));
            }
            self.progress
                .on_success(&format!(
                    "Set \"{dist_tag}\" dist-tag for \"{package}\" to {version}."
                ))
                .await;
        }
        Ok(())
    }

    // === Cherry-pick ===

    /// Changelog section of `version` at the tip of an upstream branch, if
    /// it can be found
    pub async fn release_notes_for(&self, version: &Version, branch: &str) -> Option<String> {
        let changelog = match self.forge.get_file_contents(branch, CHANGELOG_PATH).await {
            Ok(changelog) => changelog,
            Err(e) => {
                warn!(error = %e, %branch, "could not fetch changelog");
                return None;
            }
        };
        extract_changelog_section(&changelog, version)
    }

    /// Commit the release notes of `version`, taken from `released_branch`,
    /// to the changelog of the checked-out revision.
    ///
    /// Returns `false` when no release notes could be found.
    pub async fn create_cherry_pick_release_notes_commit(
        &self,
        version: &Version,
        released_branch: &str,
    ) -> Result<bool> {
        let Some(notes) = self.release_notes_for(version, released_branch).await else {
            self.progress
                .on_warning(&format!(
                    "Could not cherry-pick release notes for v{version}. \
                     Please copy them manually into \"{}\".",
                    self.next_branch
                ))
                .await;
            return Ok(false);
        };
        prepend_changelog_section(self.project_dir, version, &notes)?;
        self.create_commit(&changelog_cherry_pick_message(version), &[CHANGELOG_PATH])
            .await?;
        Ok(true)
    }

    /// Prepend the release notes of `version` to the primary branch's
    /// changelog through a pull request.
    ///
    /// Nothing happens when `released_branch` is the primary branch. Missing
    /// release notes only produce a warning.
    pub async fn cherry_pick_changelog_into_next_branch(
        &self,
        version: &Version,
        released_branch: &str,
    ) -> Result<Option<PullRequestHandle>> {
        if released_branch == self.next_branch {
            return Ok(None);
        }

        self.checkout_upstream_branch(self.next_branch)?;
        if !self
            .create_cherry_pick_release_notes_commit(version, released_branch)
            .await?
        {
            return Ok(None);
        }

        let pr = self
            .push_head_to_fork_and_create_pull_request(
                self.next_branch,
                &format!("changelog-cherry-pick-{version}"),
                &changelog_cherry_pick_message(version),
                &format!(
                    "Cherry-picks the changelog from the \"{released_branch}\" branch to the \"{}\" branch.",
                    self.next_branch
                ),
            )
            .await?;
        self.progress
            .on_success(&format!(
                "Pull request for cherry-picking the changelog into \"{}\" has been created: {}",
                self.next_branch, pr.url
            ))
            .await;
        Ok(Some(pr))
    }

    // === Composite ===

    /// Build, publish and cherry-pick a version whose staging pull request
    /// was merged after a stage-only run.
    ///
    /// A new stable major moves the version the registry still reports as
    /// `latest` into long-term support.
    pub async fn publish_staged_release(&self, staged: &StagedRelease) -> Result<()> {
        let version = &staged.version;
        let outgoing = if version.is_stable() && version.is_major() {
            self.latest_published_version()
                .await?
                .filter(|previous| previous.major < version.major)
        } else {
            None
        };

        self.build_and_publish(version, &staged.branch, &staged.dist_tag)
            .await?;
        if let Some(previous) = outgoing {
            self.set_dist_tag_for_packages(&lts_dist_tag_for_major(previous.major), &previous)
                .await?;
        }
        self.cherry_pick_changelog_into_next_branch(version, &staged.branch)
            .await?;
        Ok(())
    }

    async fn latest_published_version(&self) -> Result<Option<Version>> {
        let metadata = self
            .registry
            .fetch_package_metadata(self.config.primary_package()?)
            .await?;
        metadata
            .dist_tags
            .get("latest")
            .map(|latest| Version::parse(latest))
            .transpose()
    }

    /// Run the whole protocol for one version on one branch
    pub async fn release(&self, version: &Version, branch: &str, dist_tag: &str) -> Result<()> {
        if let StageOutcome::AwaitingMerge(_) = self.stage_and_await_merge(version, branch).await? {
            return Ok(());
        }
        self.build_and_publish(version, branch, dist_tag).await?;
        self.cherry_pick_changelog_into_next_branch(version, branch)
            .await?;
        Ok(())
    }
}

/// Commit message for bringing a release's notes into another branch
pub fn changelog_cherry_pick_message(version: &Version) -> String {
    format!("docs: release notes for the v{version} release")
}

/// Sleep for `interval`; returns `true` if the run was cancelled meanwhile
async fn sleep_or_cancel(cancel: &mut watch::Receiver<bool>, interval: Duration) -> bool {
    let changed = tokio::select! {
        () = tokio::time::sleep(interval) => return false,
        changed = cancel.changed() => changed,
    };
    match changed {
        Ok(()) => *cancel.borrow(),
        Err(_) => {
            // No sender left, so the run can no longer be cancelled
            tokio::time::sleep(interval).await;
            false
        }
    }
}
