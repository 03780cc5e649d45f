//! Release package building
//!
//! Build tooling differs per branch (older branches may lack packages that
//! newer ones have), so building is delegated to a command of the checked-out
//! revision that prints the built packages as a JSON array on stdout:
//!
//! ```json
//! [{"name": "@angular/pkg1", "outputPath": "dist/pkg1"}]
//! ```

use crate::error::{Error, Result};
use crate::types::BuiltPackage;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error};

/// Builds the release output of the checked-out revision
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    /// Install project dependencies for the checked-out revision
    async fn install_dependencies(&self) -> Result<()>;

    /// Build all release packages
    async fn build(&self) -> Result<Vec<BuiltPackage>>;
}

/// Builder that runs configured project commands
pub struct CommandBuilder {
    project_dir: PathBuf,
    build_command: Vec<String>,
    install_command: Option<Vec<String>>,
}

impl CommandBuilder {
    /// Create a builder running commands inside `project_dir`
    pub fn new(
        project_dir: &Path,
        build_command: Vec<String>,
        install_command: Option<Vec<String>>,
    ) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            build_command,
            install_command,
        }
    }

    async fn run(&self, command: &[String]) -> Result<String> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Build("empty command".to_string()))?;

        debug!(%program, ?args, "running project command");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.project_dir)
            .output()
            .await
            .map_err(|e| Error::Build(format!("Failed to execute {program}: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            error!(stderr = %stderr, "{} failed", command.join(" "));
            return Err(Error::Build(format!(
                "{} exited with {}",
                command.join(" "),
                output.status
            )));
        }
        debug!(stderr = %stderr, "{} completed", command.join(" "));
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl PackageBuilder for CommandBuilder {
    async fn install_dependencies(&self) -> Result<()> {
        match &self.install_command {
            Some(command) => self.run(command).await.map(drop),
            None => Ok(()),
        }
    }

    async fn build(&self) -> Result<Vec<BuiltPackage>> {
        let stdout = self.run(&self.build_command).await?;
        let packages = parse_built_packages(&stdout)?;
        // Relative output paths are relative to the project
        Ok(packages
            .into_iter()
            .map(|pkg| BuiltPackage {
                output_path: self.project_dir.join(pkg.output_path),
                name: pkg.name,
            })
            .collect())
    }
}

/// Parse the builder's JSON output.
///
/// Build tools commonly print progress before the result, so the JSON array
/// is taken from the last line that starts with `[`.
pub fn parse_built_packages(stdout: &str) -> Result<Vec<BuiltPackage>> {
    let start = stdout
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with('['))
        .and_then(|line| stdout.rfind(line))
        .ok_or_else(|| Error::Build("build command printed no package list".to_string()))?;

    serde_json::from_str(stdout[start..].trim())
        .map_err(|e| Error::Build(format!("Invalid package list from build command: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_built_packages_skips_log_output() {
        let stdout = "Building...\nDone in 3s\n[{\"name\": \"@angular/pkg1\", \"outputPath\": \"dist/pkg1\"},\n {\"name\": \"@angular/pkg2\", \"outputPath\": \"dist/pkg2\"}]\n";
        let packages = parse_built_packages(stdout).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "@angular/pkg1");
        assert_eq!(packages[1].output_path, PathBuf::from("dist/pkg2"));
    }

    #[test]
    fn test_parse_built_packages_requires_list() {
        assert!(matches!(parse_built_packages("nothing here"), Err(Error::Build(_))));
    }

    #[tokio::test]
    async fn test_command_builder_resolves_output_paths() {
        let temp = tempfile::TempDir::new().unwrap();
        let builder = CommandBuilder::new(
            temp.path(),
            vec![
                "echo".to_string(),
                r#"[{"name": "pkg", "outputPath": "dist/pkg"}]"#.to_string(),
            ],
            None,
        );

        builder.install_dependencies().await.unwrap();
        let packages = builder.build().await.unwrap();
        assert_eq!(packages[0].output_path, temp.path().join("dist/pkg"));
    }
}
