//! Package registry access
//!
//! Publishing and dist-tag updates shell out to `npm` so that the operator's
//! registry credentials apply; metadata is read over HTTP.

use crate::error::{Error, Result};
use crate::types::PackageMetadata;
use crate::version::Version;
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, error};

/// Default public npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Registry operations needed by release actions
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Publish the package in `package_path` under the given dist-tag
    async fn publish(&self, package_path: &Path, dist_tag: &str) -> Result<()>;

    /// Point a dist-tag of a package at an already published version
    async fn set_dist_tag(&self, package_name: &str, dist_tag: &str, version: &Version)
    -> Result<()>;

    /// Dist-tags and publish times of a package
    async fn fetch_package_metadata(&self, package_name: &str) -> Result<PackageMetadata>;
}

/// npm registry client
pub struct NpmRegistry {
    /// Custom registry URL (`None` uses npm's configured registry)
    registry_url: Option<String>,
    http_client: Client,
}

impl NpmRegistry {
    /// Create a registry client
    pub fn new(registry_url: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("release-train")
            .build()
            .map_err(|e| Error::Registry(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            registry_url: registry_url.map(|url| url.trim_end_matches('/').to_string()),
            http_client,
        })
    }

    fn metadata_url(&self, package_name: &str) -> String {
        let base = self.registry_url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL);
        // Scoped packages keep their `@` but need the slash encoded
        format!("{base}/{}", package_name.replace('/', "%2F"))
    }

    async fn run_npm(&self, mut args: Vec<String>, cwd: Option<&Path>) -> Result<()> {
        if let Some(url) = &self.registry_url {
            args.push("--registry".to_string());
            args.push(url.clone());
        }

        let mut cmd = Command::new("npm");
        cmd.args(&args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!(?args, "running npm");
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::Registry(format!("Failed to execute npm: {e}")))?;

        let log_output = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if output.status.success() {
            debug!(output = %log_output, "npm {} completed", args.join(" "));
            Ok(())
        } else {
            error!(output = %log_output, status = ?output.status.code(), "npm {} failed", args.join(" "));
            Err(Error::Registry(format!(
                "npm {} exited with {}",
                args.join(" "),
                output.status
            )))
        }
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    async fn publish(&self, package_path: &Path, dist_tag: &str) -> Result<()> {
        let args = ["publish", "--access", "public", "--tag", dist_tag]
            .map(String::from)
            .to_vec();
        self.run_npm(args, Some(package_path)).await
    }

    async fn set_dist_tag(
        &self,
        package_name: &str,
        dist_tag: &str,
        version: &Version,
    ) -> Result<()> {
        let args = vec![
            "dist-tag".to_string(),
            "add".to_string(),
            format!("{package_name}@{version}"),
            dist_tag.to_string(),
        ];
        self.run_npm(args, None).await
    }

    async fn fetch_package_metadata(&self, package_name: &str) -> Result<PackageMetadata> {
        let url = self.metadata_url(package_name);
        debug!(%url, "fetching package metadata");

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Registry(format!("Failed to query {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Registry(format!(
                "Registry returned {} for {package_name}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Registry(format!("Failed to parse metadata of {package_name}: {e}")))
    }
}

/// Whether `version` of the project's primary package is in the registry
pub async fn is_version_published(
    registry: &dyn PackageRegistry,
    primary_package: &str,
    version: &Version,
) -> Result<bool> {
    let metadata = registry.fetch_package_metadata(primary_package).await?;
    Ok(metadata.is_published(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_url_encodes_scope() {
        let registry = NpmRegistry::new(Some("https://npm.example.com/".to_string())).unwrap();
        assert_eq!(
            registry.metadata_url("@angular/core"),
            "https://npm.example.com/@angular%2Fcore"
        );
    }

    #[tokio::test]
    async fn test_fetch_package_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/@angular%2Fcore")
            .with_status(200)
            .with_body(
                r#"{
                    "name": "@angular/core",
                    "dist-tags": {"latest": "10.0.2", "next": "10.1.0-next.3", "v9-lts": "9.2.3"},
                    "time": {
                        "created": "2016-05-03T21:00:00.000Z",
                        "10.0.2": "2020-07-01T18:00:00.000Z",
                        "10.1.0-next.3": "2020-07-08T18:00:00.000Z"
                    }
                }"#,
            )
            .create_async()
            .await;

        let registry = NpmRegistry::new(Some(server.url())).unwrap();
        let metadata = registry.fetch_package_metadata("@angular/core").await.unwrap();

        mock.assert_async().await;
        assert_eq!(metadata.dist_tags["v9-lts"], "9.2.3");
        assert!(metadata.is_published(&Version::parse("10.1.0-next.3").unwrap()));
        assert!(!metadata.is_published(&Version::parse("10.1.0-next.4").unwrap()));
    }

    #[tokio::test]
    async fn test_fetch_package_metadata_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let registry = NpmRegistry::new(Some(server.url())).unwrap();
        assert!(matches!(
            registry.fetch_package_metadata("missing").await,
            Err(Error::Registry(_))
        ));
    }
}
