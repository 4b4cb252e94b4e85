//! GitHub REST API client (github.com and GitHub Enterprise).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::project::ProjectInfo;
use crate::domain::entities::sync_config::{OwnerType, ProviderConfig};
use crate::domain::value_objects::provider_type::ProviderType;
use crate::domain::value_objects::repo_name::is_valid_name_for;
use crate::domain::value_objects::visibility::{PRIVATE, PUBLIC};
use crate::infrastructure::provider::client::{CreateProjectOptions, ProviderClient};

const PER_PAGE: usize = 100;
const AGENT: &str = concat!("git-provider-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    full_name: String,
    clone_url: String,
    ssh_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
    owner: GitHubOwner,
}

impl From<GitHubRepo> for ProjectInfo {
    fn from(repo: GitHubRepo) -> Self {
        let fallback = if repo.private { PRIVATE } else { PUBLIC };
        let visibility = repo.visibility.unwrap_or_else(|| fallback.to_string());
        let mut project = ProjectInfo::new(repo.name, repo.clone_url, repo.ssh_url, ProviderType::GitHub)
            .with_description(repo.description.unwrap_or_default())
            .with_visibility(visibility);
        if let Some(branch) = repo.default_branch {
            project = project.with_default_branch(branch);
        }
        if let Some(at) = repo.pushed_at {
            project = project.with_last_activity(at);
        }
        project
    }
}

/// API root for a GitHub host.
pub fn api_base(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.is_empty() || domain == "github.com" || domain == "api.github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{}/api/v3", domain)
    }
}

pub struct GitHubClient {
    client: Client,
    api: String,
}

impl GitHubClient {
    pub fn new(domain: &str, token: Option<String>) -> SyncResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SyncError::authentication("token contains invalid header characters"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            api: api_base(domain),
        })
    }

    pub fn from_config(config: &ProviderConfig) -> SyncResult<Self> {
        Self::new(&config.domain, config.auth.resolve_token())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api, path.trim_start_matches('/'))
    }

    /// Turn a non-success response into an error carrying the body.
    async fn check(response: Response, context: &str) -> SyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::provider_error(format!("{}: {} {}", context, status, body.trim())))
    }

    async fn paginate(&self, path: &str, query: &[(&str, &str)]) -> SyncResult<Vec<GitHubRepo>> {
        let mut repos = Vec::new();
        let mut page = 1usize;
        loop {
            let page_param = page.to_string();
            let per_page = PER_PAGE.to_string();
            let response = self
                .client
                .get(self.url(path))
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_param.as_str())])
                .send()
                .await?;
            let batch: Vec<GitHubRepo> = Self::check(response, path).await?.json().await?;
            let len = batch.len();
            repos.extend(batch);
            debug!(path, page, received = len, "Fetched repository page");

            if len < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(repos)
    }
}

#[async_trait]
impl ProviderClient for GitHubClient {
    async fn list_projects(&self, config: &ProviderConfig) -> SyncResult<Vec<ProjectInfo>> {
        let repos = match config.owner_type {
            OwnerType::Group => {
                self.paginate(&format!("orgs/{}/repos", config.owner), &[("type", "all")])
                    .await?
            }
            OwnerType::User if config.auth.resolve_token().is_some() => {
                // Only the authenticated listing includes private repositories.
                self.paginate("user/repos", &[("affiliation", "owner"), ("visibility", "all")])
                    .await?
                    .into_iter()
                    .filter(|repo| repo.owner.login.eq_ignore_ascii_case(&config.owner))
                    .collect()
            }
            OwnerType::User => {
                self.paginate(&format!("users/{}/repos", config.owner), &[("type", "owner")])
                    .await?
            }
        };

        info!(owner = %config.owner, count = repos.len(), "Listed GitHub repositories");
        Ok(repos.into_iter().map(ProjectInfo::from).collect())
    }

    async fn project_exists(&self, owner: &str, name: &str) -> SyncResult<(bool, Option<String>)> {
        let response = self
            .client
            .get(self.url(&format!("repos/{}/{}", owner, name)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok((false, None));
        }
        let repo: GitHubRepo = Self::check(response, "repository lookup").await?.json().await?;
        Ok((true, Some(repo.full_name)))
    }

    async fn create_project(&self, options: &CreateProjectOptions) -> SyncResult<String> {
        let path = match options.owner_type {
            OwnerType::Group => format!("orgs/{}/repos", options.owner),
            OwnerType::User => "user/repos".to_string(),
        };
        let body = json!({
            "name": options.name,
            "description": options.description,
            "private": options.visibility != PUBLIC,
            "visibility": options.visibility,
        });

        let creation_error = |message: String| SyncError::ProjectCreation {
            owner: options.owner.clone(),
            name: options.name.clone(),
            message,
        };

        let response = self
            .client
            .post(self.url(&path))
            .json(&body)
            .send()
            .await
            .map_err(|e| creation_error(e.to_string()))?;
        let response = Self::check(response, "create repository")
            .await
            .map_err(|e| creation_error(e.to_string()))?;
        let repo: GitHubRepo = response.json().await.map_err(|e| creation_error(e.to_string()))?;

        info!(repository = %repo.full_name, visibility = %options.visibility, "Created GitHub repository");
        Ok(repo.full_name)
    }

    async fn set_default_branch(&self, owner: &str, name: &str, branch: &str) -> SyncResult<()> {
        let default_branch_error = |message: String| SyncError::DefaultBranch {
            owner: owner.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
            message,
        };

        let response = self
            .client
            .patch(self.url(&format!("repos/{}/{}", owner, name)))
            .json(&json!({ "default_branch": branch }))
            .send()
            .await
            .map_err(|e| default_branch_error(e.to_string()))?;
        Self::check(response, "set default branch")
            .await
            .map_err(|e| default_branch_error(e.to_string()))?;
        debug!(owner, name, branch, "Default branch set");
        Ok(())
    }

    async fn protect(&self, owner: &str, branch: &str, id: &str) -> SyncResult<()> {
        let body = json!({
            "required_status_checks": null,
            "enforce_admins": null,
            "required_pull_request_reviews": null,
            "restrictions": null,
            "allow_force_pushes": false,
            "allow_deletions": false,
        });
        let response = self
            .client
            .put(self.url(&format!("repos/{}/branches/{}/protection", id, branch)))
            .json(&body)
            .send()
            .await?;
        Self::check(response, "protect branch").await?;
        debug!(owner, branch, id, "Branch protected");
        Ok(())
    }

    async fn unprotect(&self, owner: &str, branch: &str, id: &str) -> SyncResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("repos/{}/branches/{}/protection", id, branch)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(owner, branch, id, "Branch was not protected");
            return Ok(());
        }
        Self::check(response, "unprotect branch").await?;
        debug!(owner, branch, id, "Branch protection removed");
        Ok(())
    }

    fn is_valid_name(&self, name: &str) -> bool {
        is_valid_name_for(ProviderType::GitHub, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base() {
        assert_eq!(api_base("github.com"), "https://api.github.com");
        assert_eq!(api_base(""), "https://api.github.com");
        assert_eq!(api_base("git.example.com/"), "https://git.example.com/api/v3");
    }

    #[test]
    fn test_repo_conversion() {
        let raw = r#"{
            "name": "demo",
            "full_name": "acme/demo",
            "clone_url": "https://github.com/acme/demo.git",
            "ssh_url": "git@github.com:acme/demo.git",
            "description": "A demo",
            "default_branch": "trunk",
            "private": true,
            "pushed_at": "2024-05-01T10:00:00Z",
            "owner": { "login": "acme" }
        }"#;
        let repo: GitHubRepo = serde_json::from_str(raw).unwrap();
        let project = ProjectInfo::from(repo);

        assert_eq!(project.original_name, "demo");
        assert_eq!(project.default_branch, "trunk");
        assert_eq!(project.visibility, "private");
        assert_eq!(project.description, "A demo");
        assert_eq!(project.ssh_url, "git@github.com:acme/demo.git");
        assert!(project.last_activity_at.is_some());
    }

    #[test]
    fn test_repo_conversion_defaults() {
        let raw = r#"{
            "name": "open",
            "full_name": "acme/open",
            "clone_url": "https://github.com/acme/open.git",
            "ssh_url": "git@github.com:acme/open.git",
            "description": null,
            "visibility": "public",
            "owner": { "login": "acme" }
        }"#;
        let project = ProjectInfo::from(serde_json::from_str::<GitHubRepo>(raw).unwrap());
        assert_eq!(project.visibility, "public");
        assert_eq!(project.default_branch, "main");
        assert_eq!(project.description, "");
    }

    #[test]
    fn test_client_name_rules() {
        let client = GitHubClient::new("github.com", None).unwrap();
        assert!(client.is_valid_name("Repo-One"));
        assert!(!client.is_valid_name("Repo One!"));
        assert_eq!(client.url("/repos/a/b"), "https://api.github.com/repos/a/b");
    }
}
