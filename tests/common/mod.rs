//! Shared test support

#![allow(dead_code)]

mod fakes;
mod mock_forge;

pub use fakes::{FakeBuilder, FakeGit, FakeRegistry, RecordingProgress, ScriptedPrompt, SetDistTagCall};
pub use mock_forge::{CreatePrCall, CreateReleaseCall, MockForgeService};

use chrono::{DateTime, TimeZone, Utc};
use release_train::config::ReleaseConfig;
use release_train::executor::{ReleaseContext, ReleaseMode};
use release_train::progress::NoopProgress;
use release_train::project::{read_project_version, update_project_version};
use release_train::types::{ActiveReleaseTrains, ReleaseTrain};
use release_train::version::Version;
use std::fs;
use tempfile::TempDir;
use tokio::sync::watch;

/// Packages every test project releases
pub const PACKAGES: [&str; 2] = ["@angular/pkg1", "@angular/pkg2"];

/// Parse a version literal
pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

/// Build a release train
pub fn train(branch: &str, version: &str) -> ReleaseTrain {
    ReleaseTrain::new(branch, v(version))
}

/// Build active release trains with `master` as the primary branch
pub fn trains(latest: (&str, &str), next: &str, rc: Option<(&str, &str)>) -> ActiveReleaseTrains {
    ActiveReleaseTrains {
        latest: train(latest.0, latest.1),
        next: train("master", next),
        release_candidate: rc.map(|(branch, version)| train(branch, version)),
    }
}

/// Release settings used by the test harness
pub fn release_config() -> ReleaseConfig {
    ReleaseConfig {
        npm_packages: PACKAGES.iter().map(|p| (*p).to_string()).collect(),
        build_command: vec!["yarn".to_string(), "build".to_string()],
        install_command: None,
        changelog_command: None,
        registry_url: None,
        release_commit_message: "release: cut the v{version} release".to_string(),
        poll_interval_secs: 0,
    }
}

/// Reference time of every release run: 2020-07-08
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 7, 8, 12, 0, 0).unwrap()
}

/// A project working copy plus fakes for every capability of a release run
pub struct Harness {
    pub dir: TempDir,
    pub forge: MockForgeService,
    pub git: FakeGit,
    pub registry: FakeRegistry,
    pub builder: FakeBuilder,
    pub prompt: ScriptedPrompt,
    pub progress: RecordingProgress,
    pub config: ReleaseConfig,
    pub cancel: watch::Sender<bool>,
}

impl Harness {
    /// Working copy on `my-feature` with a `package.json` at `0.0.0`
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            "{\n  \"name\": \"root\",\n  \"version\": \"0.0.0\"\n}\n",
        )
        .unwrap();
        let builder = FakeBuilder::new(dir.path(), &PACKAGES);
        let (cancel, _) = watch::channel(false);

        Self {
            dir,
            forge: MockForgeService::new(),
            git: FakeGit::on_branch("my-feature"),
            registry: FakeRegistry::new(),
            builder,
            prompt: ScriptedPrompt::new(),
            progress: RecordingProgress::default(),
            config: release_config(),
            cancel,
        }
    }

    /// Context for one release run
    pub fn context(&self, mode: ReleaseMode) -> ReleaseContext<'_> {
        ReleaseContext {
            git: &self.git,
            forge: &self.forge,
            registry: &self.registry,
            builder: &self.builder,
            prompt: &self.prompt,
            progress: &self.progress,
            config: &self.config,
            next_branch: "master",
            project_dir: self.dir.path(),
            token: "abc",
            mode,
            cancel: self.cancel.subscribe(),
            now: test_now(),
        }
    }

    /// Context for one release run that discards progress output
    pub fn quiet_context(&self, mode: ReleaseMode) -> ReleaseContext<'_> {
        ReleaseContext {
            progress: &NoopProgress,
            ..self.context(mode)
        }
    }

    /// Record `version` of every package as published
    pub fn publish(&self, version: &str, time: &str) {
        for package in PACKAGES {
            self.registry.add_published(package, version, time);
        }
    }

    /// Current project version on disk
    pub fn project_version(&self) -> Version {
        read_project_version(self.dir.path()).unwrap()
    }

    /// Write `version` to the project's `package.json`, as checking out a
    /// merged staging commit would
    pub fn set_project_version(&self, version: &str) {
        update_project_version(self.dir.path(), &v(version)).unwrap();
    }

    /// Current changelog on disk
    pub fn changelog(&self) -> String {
        fs::read_to_string(self.dir.path().join("CHANGELOG.md")).unwrap_or_default()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
