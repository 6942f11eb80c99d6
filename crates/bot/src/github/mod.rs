//! GitHub REST client for release notes.
//!
//! Used by `/commit-list` and `/latest-deploy` to find which pull requests
//! landed between the deployed commit and the head of the stable branch.
//!
//! # API Reference
//!
//! - Base URL: `https://api.github.com`
//! - Authentication: `Authorization: Bearer <token>`
//! - API Version: `2022-11-28` (specified via `X-GitHub-Api-Version` header)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::GitHubConfig;

/// GitHub REST API version.
const API_VERSION: &str = "2022-11-28";

/// GitHub REST API base URL.
const BASE_URL: &str = "https://api.github.com";

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP request failed.
    #[error("GitHub request failed: {0}")]
    Request(String),

    /// API returned an error response.
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("GitHub parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GitHubError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

/// A merged pull request as shown in summaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct Comparison {
    #[serde(default)]
    commits: Vec<CommitRef>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
}

/// Repository queries the release-note commands depend on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// SHA at the head of `branch`.
    async fn branch_head(&self, branch: &str) -> Result<String, GitHubError>;

    /// SHAs of the commits reachable from `head` but not from `base`, oldest first.
    async fn compare(&self, base: &str, head: &str) -> Result<Vec<String>, GitHubError>;

    /// Paths of the files a commit touched.
    async fn commit_files(&self, sha: &str) -> Result<Vec<String>, GitHubError>;

    /// Pull requests associated with a commit.
    async fn pulls_for_commit(&self, sha: &str) -> Result<Vec<PullRequest>, GitHubError>;
}

/// GitHub API client scoped to one repository.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<GitHubClientInner>,
}

struct GitHubClientInner {
    client: reqwest::Client,
    base_url: Url,
    repository: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("repository", &self.inner.repository)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.expose_secret()))
            .map_err(|e| GitHubError::Parse(format!("Invalid token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);
        headers.insert(
            "Accept",
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .user_agent(concat!("deploy-bot/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(BASE_URL)
            .map_err(|e| GitHubError::Parse(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(GitHubClientInner {
                client,
                base_url,
                repository: config.repository.clone(),
            }),
        })
    }

    /// `repos/{owner}/{repo}/...` with each of `segments` percent-encoded
    /// as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GitHubError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GitHubError::Parse("Base URL cannot take a path".into()))?
            .pop_if_empty()
            .push("repos")
            .extend(self.inner.repository.split('/'))
            .extend(segments);
        Ok(url)
    }

    /// Execute a GET request against the configured repository.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GitHubError> {
        let url = self.endpoint(segments)?;
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| GitHubError::Parse(format!("Failed to parse response: {e}")));
        }

        let message = response.text().await.unwrap_or_default();
        Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    #[instrument(skip(self))]
    async fn branch_head(&self, branch: &str) -> Result<String, GitHubError> {
        let branch: Branch = self.get(&["branches", branch]).await?;
        debug!(sha = %branch.commit.sha, "Resolved branch head");
        Ok(branch.commit.sha)
    }

    #[instrument(skip(self))]
    async fn compare(&self, base: &str, head: &str) -> Result<Vec<String>, GitHubError> {
        let basehead = format!("{base}...{head}");
        let comparison: Comparison = self.get(&["compare", &basehead]).await?;
        debug!(count = comparison.commits.len(), "Compared commits");
        Ok(comparison.commits.into_iter().map(|c| c.sha).collect())
    }

    #[instrument(skip(self))]
    async fn commit_files(&self, sha: &str) -> Result<Vec<String>, GitHubError> {
        let detail: CommitDetail = self.get(&["commits", sha]).await?;
        Ok(detail.files.into_iter().map(|f| f.filename).collect())
    }

    #[instrument(skip(self))]
    async fn pulls_for_commit(&self, sha: &str) -> Result<Vec<PullRequest>, GitHubError> {
        self.get(&["commits", sha, "pulls"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;

    fn client() -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            token: SecretString::from("ghp_test".to_string()),
            repository: "StatesTitle/underwriter".to_string(),
            stable_branch: "stable".to_string(),
        })
        .expect("client")
    }

    #[test]
    fn test_endpoint_layout() {
        let url = client().endpoint(&["commits", "a1", "pulls"]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/StatesTitle/underwriter/commits/a1/pulls"
        );
    }

    #[test]
    fn test_branch_name_is_one_segment() {
        let client = client();

        let url = client.endpoint(&["branches", "release/fee_collab"]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/StatesTitle/underwriter/branches/release%2Ffee_collab"
        );

        let url = client.endpoint(&["branches", "../../orgs"]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/StatesTitle/underwriter/branches/..%2F..%2Forgs"
        );

        let url = client.endpoint(&["branches", "x?y=1#z"]).expect("url");
        assert_eq!(url.path(), "/repos/StatesTitle/underwriter/branches/x%3Fy=1%23z");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_pull_request_deserializes_merged_at() {
        let pr: PullRequest = serde_json::from_value(json!({
            "number": 4821,
            "title": "Collect fees earlier",
            "html_url": "https://github.com/StatesTitle/underwriter/pull/4821",
            "merged_at": "2024-03-07T18:00:00Z",
            "state": "closed"
        }))
        .expect("valid pull request");

        assert_eq!(pr.number, 4821);
        assert_eq!(
            pr.merged_at.map(|m| m.format("%m/%d").to_string()),
            Some("03/07".to_string())
        );
    }

    #[test]
    fn test_unmerged_pull_request() {
        let pr: PullRequest = serde_json::from_value(json!({
            "number": 1,
            "title": "Draft",
            "html_url": "https://github.com/o/r/pull/1",
            "merged_at": null
        }))
        .expect("valid pull request");
        assert!(pr.merged_at.is_none());
    }

    #[test]
    fn test_comparison_extracts_shas() {
        let comparison: Comparison = serde_json::from_value(json!({
            "status": "ahead",
            "commits": [{"sha": "a1"}, {"sha": "b2"}]
        }))
        .expect("valid comparison");
        let shas: Vec<_> = comparison.commits.into_iter().map(|c| c.sha).collect();
        assert_eq!(shas, vec!["a1", "b2"]);
    }

    #[test]
    fn test_commit_detail_without_files() {
        let detail: CommitDetail =
            serde_json::from_value(json!({"sha": "a1"})).expect("valid commit");
        assert!(detail.files.is_empty());
    }
}
