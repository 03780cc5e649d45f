//! Shared command context for CLI commands
//!
//! Extracts the setup shared by the stage, publish, info, set-dist-tag and
//! build commands.

use release_train::builder::CommandBuilder;
use release_train::config::{Config, load_config};
use release_train::error::Result;
use release_train::git::SystemGit;
use release_train::platform::GitHubService;
use release_train::registry::NpmRegistry;
use std::path::{Path, PathBuf};

/// Shared context for CLI commands
///
/// Opens the working copy, loads `.release-train.toml` and creates the
/// registry and builder bridges. The forge service needs a token and is
/// created on demand via [`CommandContext::forge`].
pub struct CommandContext {
    /// Local git working copy
    pub git: SystemGit,
    /// Root of the working copy
    pub project_dir: PathBuf,
    /// Project configuration
    pub config: Config,
    /// Package registry
    pub registry: NpmRegistry,
    /// Release output builder
    pub builder: CommandBuilder,
}

impl CommandContext {
    /// Create a new command context for the repository containing `path`
    pub fn new(path: &Path) -> Result<Self> {
        let git = SystemGit::open(path)?;
        let project_dir = git.work_tree().to_path_buf();

        let config = load_config(&project_dir)?;
        let registry = NpmRegistry::new(config.release.registry_url.clone())?;
        let builder = CommandBuilder::new(
            &project_dir,
            config.release.build_command.clone(),
            config.release.install_command.clone(),
        );

        Ok(Self {
            git,
            project_dir,
            config,
            registry,
            builder,
        })
    }

    /// Forge service for the configured upstream repository
    pub fn forge(&self, token: &str) -> Result<GitHubService> {
        GitHubService::new(token, self.config.github.repo())
    }
}
