//! GitHub forge service implementation

use crate::error::{Error, Result};
use crate::platform::ForgeService;
use crate::types::{CombinedStatus, ForgeRepo, PrState, PullRequestHandle};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use octocrab::Octocrab;
use octocrab::params::repos::Reference;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

// GraphQL response types for the owned-forks query

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct ForksData {
    repository: ForksRepository,
}

#[derive(Deserialize)]
struct ForksRepository {
    forks: ForkConnection,
}

#[derive(Deserialize)]
struct ForkConnection {
    nodes: Vec<ForkNode>,
}

#[derive(Deserialize)]
struct ForkNode {
    name: String,
    owner: ForkOwner,
}

#[derive(Deserialize)]
struct ForkOwner {
    login: String,
}

#[derive(Deserialize)]
struct BranchResponse {
    name: String,
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    sha: String,
}

const OWNED_FORKS_QUERY: &str = r"
    query OwnedForks($owner: String!, $name: String!) {
        repository(owner: $owner, name: $name) {
            forks(affiliations: [OWNER], first: 10, orderBy: {field: NAME, direction: ASC}) {
                nodes {
                    name
                    owner { login }
                }
            }
        }
    }
";

/// Number of branches requested per page when listing branches
const BRANCHES_PER_PAGE: usize = 100;

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    repo: ForgeRepo,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests (statuses, contents, branches)
    http_client: Client,
    /// API base URL for raw requests
    api_base: String,
}

impl GitHubService {
    /// Create a new GitHub service for the host `repo` lives on
    pub fn new(token: &str, repo: ForgeRepo) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        let api_base = if repo.is_public_github() {
            "https://api.github.com".to_string()
        } else {
            let base_url = format!("https://{}/api/v3", repo.host);
            builder = builder
                .base_uri(&base_url)
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
            base_url
        };

        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        Self::with_client(client, token, repo, api_base)
    }

    /// Create a service with a prebuilt octocrab client and raw API base URL
    pub fn with_client(
        client: Octocrab,
        token: &str,
        repo: ForgeRepo,
        api_base: impl Into<String>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("release-train")
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            repo,
            token: token.to_string(),
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, repo: &ForgeRepo, path: &str) -> String {
        format!("{}/repos/{}/{}/{path}", self.api_base, repo.owner, repo.name)
    }

    /// Raw authenticated GET against the REST API
    async fn api_get(&self, url: &str) -> Result<Response> {
        self.http_client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("Request to {url} failed: {e}")))
    }

    /// Raw GET that must succeed, decoded as JSON
    async fn api_get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.api_get(url).await?;
        if !response.status().is_success() {
            return Err(Error::GitHubApi(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse response of {url}: {e}")))
    }
}

#[async_trait]
impl ForgeService for GitHubService {
    fn repo(&self) -> &ForgeRepo {
        &self.repo
    }

    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        debug!(branch, "getting branch head");
        let url = self.repo_url(&self.repo, &format!("branches/{branch}"));
        let response: BranchResponse = self.api_get_json(&url).await?;
        debug!(branch = %response.name, sha = %response.commit.sha, "got branch head");
        Ok(response.commit.sha)
    }

    async fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for page in 1.. {
            let url = self.repo_url(
                &self.repo,
                &format!("branches?per_page={BRANCHES_PER_PAGE}&page={page}"),
            );
            let branches: Vec<BranchResponse> = self.api_get_json(&url).await?;
            let count = branches.len();
            names.extend(branches.into_iter().map(|b| b.name));
            if count < BRANCHES_PER_PAGE {
                break;
            }
        }
        debug!(count = names.len(), "listed branches");
        Ok(names)
    }

    async fn branch_exists(&self, repo: &ForgeRepo, branch: &str) -> Result<bool> {
        let url = self.repo_url(repo, &format!("branches/{branch}"));
        let response = self.api_get(&url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Error::GitHubApi(format!(
                "Failed to check branch {branch} in {repo}: {status}"
            ))),
        }
    }

    async fn get_file_contents(&self, branch: &str, path: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct ContentResponse {
            content: String,
            encoding: String,
        }

        debug!(branch, path, "fetching file contents");
        let url = self.repo_url(
            &self.repo,
            &format!("contents/{path}?ref={}", urlencoding::encode(branch)),
        );
        let response: ContentResponse = self.api_get_json(&url).await?;

        if response.encoding != "base64" {
            return Err(Error::GitHubApi(format!(
                "Unsupported content encoding \"{}\" for {path}",
                response.encoding
            )));
        }

        // GitHub wraps base64 content at 60 columns
        let compact: String = response
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| Error::GitHubApi(format!("Failed to decode {path}: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::GitHubApi(format!("{path} is not valid UTF-8: {e}")))
    }

    async fn get_combined_status(&self, sha: &str) -> Result<CombinedStatus> {
        #[derive(Deserialize)]
        struct CombinedStatusResponse {
            state: CombinedStatus,
            total_count: u32,
        }

        let url = self.repo_url(&self.repo, &format!("commits/{sha}/status"));
        let status: CombinedStatusResponse = self.api_get_json(&url).await?;
        debug!(state = %status.state, count = status.total_count, "Commit status result");
        Ok(status.state)
    }

    async fn get_commit_message(&self, sha: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct CommitResponse {
            commit: CommitDetails,
        }

        #[derive(Deserialize)]
        struct CommitDetails {
            message: String,
        }

        let url = self.repo_url(&self.repo, &format!("commits/{sha}"));
        let response: CommitResponse = self.api_get_json(&url).await?;
        Ok(response.commit.message)
    }

    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle> {
        debug!(head, base, "creating PR");
        let pr = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .create(title, head, base)
            .body(body)
            .send()
            .await?;

        let handle = PullRequestHandle {
            id: pr.number,
            url: pr
                .html_url
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        };
        debug!(pr_number = handle.id, "created PR");
        Ok(handle)
    }

    async fn get_pull_request_state(&self, id: u64) -> Result<PrState> {
        let pr = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .get(id)
            .await?;

        let state = match pr.state {
            Some(octocrab::models::IssueState::Open) => PrState::Open,
            Some(octocrab::models::IssueState::Closed) if pr.merged_at.is_some() => PrState::Merged,
            // IssueState is non-exhaustive, so use wildcard for Closed and any future variants
            Some(_) | None => PrState::Closed,
        };
        debug!(pr_number = id, %state, "got PR state");
        Ok(state)
    }

    async fn create_tag(&self, name: &str, sha: &str) -> Result<()> {
        debug!(name, sha, "creating tag");
        self.client
            .repos(&self.repo.owner, &self.repo.name)
            .create_ref(&Reference::Tag(name.to_string()), sha)
            .await?;
        Ok(())
    }

    async fn create_release(&self, tag: &str, body: &str, prerelease: bool) -> Result<()> {
        debug!(tag, prerelease, "creating release");
        self.client
            .repos(&self.repo.owner, &self.repo.name)
            .releases()
            .create(tag)
            .name(&format!("v{tag}"))
            .body(body)
            .prerelease(prerelease)
            .send()
            .await?;
        Ok(())
    }

    async fn list_owned_forks(&self) -> Result<Vec<ForgeRepo>> {
        let response: GraphQlResponse<ForksData> = self
            .client
            .graphql(&serde_json::json!({
                "query": OWNED_FORKS_QUERY,
                "variables": {
                    "owner": self.repo.owner,
                    "name": self.repo.name,
                }
            }))
            .await
            .map_err(|e| Error::GitHubApi(format!("GraphQL query failed: {e}")))?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GitHubApi(format!(
                "GraphQL error: {}",
                messages.join(", ")
            )));
        }

        let data = response
            .data
            .ok_or_else(|| Error::GitHubApi("No data in GraphQL response".to_string()))?;

        let forks: Vec<ForgeRepo> = data
            .repository
            .forks
            .nodes
            .into_iter()
            .map(|node| ForgeRepo::new(node.owner.login, node.name).with_host(&self.repo.host))
            .collect();
        debug!(count = forks.len(), "listed owned forks");
        Ok(forks)
    }
}
