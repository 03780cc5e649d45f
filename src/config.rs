//! Project configuration loaded from `.release-train.toml`

use crate::error::{Error, Result};
use crate::types::ForgeRepo;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filename of the project configuration
pub const CONFIG_FILE: &str = ".release-train.toml";

/// Placeholder replaced by the version in commit messages and commands
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Complete project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Forge repository settings
    pub github: GithubConfig,
    /// Release settings
    pub release: ReleaseConfig,
}

/// Forge repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Primary development branch
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    /// GitHub Enterprise host (`None` for github.com)
    #[serde(default)]
    pub host: Option<String>,
}

impl GithubConfig {
    /// Upstream repository, on the enterprise host when one is set
    pub fn repo(&self) -> ForgeRepo {
        let repo = ForgeRepo::new(&self.owner, &self.name);
        match &self.host {
            Some(host) => repo.with_host(host),
            None => repo,
        }
    }
}

/// Release settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Packages released by the project; the first one is queried for
    /// publication status and LTS dist-tags
    pub npm_packages: Vec<String>,
    /// Command printing the built packages as JSON
    pub build_command: Vec<String>,
    /// Command installing dependencies before a build
    #[serde(default)]
    pub install_command: Option<Vec<String>>,
    /// Command printing release notes for `{version}`
    #[serde(default)]
    pub changelog_command: Option<Vec<String>>,
    /// Custom registry URL
    #[serde(default)]
    pub registry_url: Option<String>,
    /// Commit message template for version bumps
    #[serde(default = "default_release_commit_message")]
    pub release_commit_message: String,
    /// Seconds between pull request merge checks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_main_branch() -> String {
    "master".to_string()
}

fn default_release_commit_message() -> String {
    "release: cut the v{version} release".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    30
}

impl ReleaseConfig {
    /// Commit message for staging `version`
    pub fn release_commit_message(&self, version: &Version) -> String {
        self.release_commit_message
            .replace(VERSION_PLACEHOLDER, &version.to_string())
    }

    /// Delay between pull request merge checks
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Package queried for publication status and dist-tags
    pub fn primary_package(&self) -> Result<&str> {
        self.npm_packages
            .first()
            .map(String::as_str)
            .ok_or_else(|| Error::Config("no npm packages configured".to_string()))
    }

    /// Changelog command with `{version}` substituted
    pub fn changelog_command_for(&self, version: &Version) -> Option<Vec<String>> {
        self.changelog_command.as_ref().map(|command| {
            command
                .iter()
                .map(|arg| arg.replace(VERSION_PLACEHOLDER, &version.to_string()))
                .collect()
        })
    }
}

impl Config {
    /// Check the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.github.owner.trim().is_empty() || self.github.name.trim().is_empty() {
            errors.push("github.owner and github.name must be set".to_string());
        }
        if self.github.main_branch.trim().is_empty() {
            errors.push("github.main_branch must not be empty".to_string());
        }
        if self.release.npm_packages.is_empty() {
            errors.push("release.npm_packages must list at least one package".to_string());
        }
        if self.release.build_command.is_empty() {
            errors.push("release.build_command must not be empty".to_string());
        }
        if self.release.install_command.as_ref().is_some_and(Vec::is_empty) {
            errors.push("release.install_command must not be empty when set".to_string());
        }
        if self.release.changelog_command.as_ref().is_some_and(Vec::is_empty) {
            errors.push("release.changelog_command must not be empty when set".to_string());
        }
        if let Some(url) = &self.release.registry_url
            && let Err(e) = url::Url::parse(url)
        {
            errors.push(format!("release.registry_url \"{url}\" is invalid: {e}"));
        }
        if !self.release.release_commit_message.contains(VERSION_PLACEHOLDER) {
            errors.push(format!(
                "release.release_commit_message must contain {VERSION_PLACEHOLDER}"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }
}

/// Get path to the configuration file of a project
pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE)
}

/// Load and validate the configuration of a project
pub fn load_config(project_dir: &Path) -> Result<Config> {
    let path = config_path(project_dir);

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

    config.validate()?;
    Ok(config)
}
