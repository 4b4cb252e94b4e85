//! `GitBackend` driving the `git` executable.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::project::ProjectInfo;
use crate::domain::entities::repository::{Repository, ORIGIN};
use crate::domain::entities::sync_config::{AuthConfig, GitConfig, GitEngine};
use crate::domain::value_objects::git_options::{
    CloneOption, PullOption, PushOption, SyncOutcome, FETCH_REFSPECS,
};
use crate::infrastructure::git::auth::{AuthMethod, AuthResolver};
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::git::branch_tracker::BranchTracker;
use crate::infrastructure::git::cli::{
    args, is_ssh_permission_denied, is_up_to_date, redact_credentials, GitCli, UrlRewrite,
};
use crate::infrastructure::process::ExecutionResult;

/// Engine spawning `git` for every operation.
///
/// A plain `git clone` only creates the default branch locally, so clones
/// and pulls of working copies are followed by [`BranchTracker::fetch`].
#[derive(Debug, Clone)]
pub struct BinaryEngine {
    cli: GitCli,
    tracker: BranchTracker,
}

impl BinaryEngine {
    pub fn new(cli: GitCli) -> Self {
        let tracker = BranchTracker::new(cli.clone());
        Self { cli, tracker }
    }

    pub fn from_config(config: &GitConfig) -> Self {
        Self::new(GitCli::from_config(config))
    }

    pub fn cli(&self) -> &GitCli {
        &self.cli
    }

    fn rewrites(url: &str, auth: &AuthMethod) -> Vec<UrlRewrite> {
        UrlRewrite::for_token(url, auth).into_iter().collect()
    }

    /// Error for a failed run, keeping SSH permission problems apart.
    fn failure(
        url: &str,
        result: &ExecutionResult,
        fallback: impl FnOnce(String) -> SyncError,
    ) -> SyncError {
        let output = result.combined_output();
        if is_ssh_permission_denied(&output) {
            SyncError::SshPermissionDenied {
                url: redact_credentials(url),
            }
        } else {
            fallback(redact_credentials(output.trim()))
        }
    }

    async fn origin_url(&self, path: &Path, cancel: &CancellationToken) -> SyncResult<String> {
        let result = self
            .cli
            .run_checked(Some(path), &args(&["remote", "get-url", ORIGIN]), &[], cancel)
            .await?;
        Ok(result.stdout.trim().to_string())
    }

    /// Branch checked out in the working copy at `path`.
    async fn current_branch(&self, path: &Path, cancel: &CancellationToken) -> SyncResult<String> {
        let result = self
            .cli
            .run(Some(path), &args(&["symbolic-ref", "--short", "HEAD"]), &[], cancel)
            .await?;
        let branch = result.stdout.trim();
        if !result.success || branch.is_empty() {
            return Err(SyncError::pull_failed(path, "HEAD is not on a branch"));
        }
        Ok(branch.to_string())
    }

    async fn is_bare(&self, path: &Path, cancel: &CancellationToken) -> SyncResult<bool> {
        let result = self
            .cli
            .run(Some(path), &args(&["rev-parse", "--is-bare-repository"]), &[], cancel)
            .await?;
        if !result.success {
            return Err(SyncError::WorkspaceOpen {
                path: path.to_path_buf(),
                message: result.combined_output().trim().to_string(),
                source: None,
            });
        }
        Ok(result.stdout.trim() == "true")
    }
}

#[async_trait]
impl GitBackend for BinaryEngine {
    async fn clone_repository(
        &self,
        option: &CloneOption,
        project: Arc<ProjectInfo>,
        cancel: &CancellationToken,
    ) -> SyncResult<Repository> {
        let auth = AuthResolver::from_config(&option.auth)?;
        let rewrites = Self::rewrites(&option.url, &auth);

        if let Some(parent) = option.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let mut clone_args = args(&["clone"]);
        if option.mirror && option.bare {
            clone_args.push("--mirror".to_string());
        } else if option.bare {
            clone_args.push("--bare".to_string());
        }
        clone_args.push(option.url.clone());
        clone_args.push(option.path.to_string_lossy().into_owned());

        let result = self.cli.run(None, &clone_args, &rewrites, cancel).await?;
        if !result.success {
            return Err(Self::failure(&option.url, &result, |message| {
                SyncError::clone_failed(redact_credentials(&option.url), message)
            }));
        }

        if !option.bare {
            let report = self.tracker.fetch(&option.path, &rewrites, cancel).await?;
            debug!(
                path = %option.path.display(),
                created = report.created.len(),
                "Tracking branches after clone"
            );
        }

        info!(path = %option.path.display(), "Cloned repository");
        Ok(Repository::new(&option.path, option.bare, project))
    }

    async fn pull(
        &self,
        path: &Path,
        option: &PullOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let auth = AuthResolver::from_config(&option.auth)?;

        if self.is_bare(path, cancel).await? {
            return Err(SyncError::pull_failed(path, "cannot pull into a bare repository"));
        }

        let status = self
            .cli
            .run_checked(Some(path), &args(&["status", "--porcelain"]), &[], cancel)
            .await?;
        if !status.stdout.trim().is_empty() {
            return Err(SyncError::UncleanWorkspace {
                path: path.to_path_buf(),
            });
        }

        let url = self.origin_url(path, cancel).await?;
        let rewrites = Self::rewrites(&url, &auth);

        let branch = self.current_branch(path, cancel).await?;
        let mut pull_args = args(&["pull", "--ff-only"]);
        if option.prune {
            pull_args.push("--prune".to_string());
        }
        if option.force {
            pull_args.push("--force".to_string());
        }
        pull_args.push(option.remote.clone());
        pull_args.push(branch);

        let result = self.cli.run(Some(path), &pull_args, &rewrites, cancel).await?;
        if !result.success {
            return Err(Self::failure(&url, &result, |message| {
                SyncError::pull_failed(path, message)
            }));
        }

        let report = self.tracker.fetch(path, &rewrites, cancel).await?;

        if is_up_to_date(&result.combined_output()) && report.created.is_empty() {
            debug!(path = %path.display(), "Already up to date");
            return Ok(SyncOutcome::UpToDate);
        }
        info!(path = %path.display(), "Pulled");
        Ok(SyncOutcome::Updated)
    }

    async fn push(
        &self,
        repository: &Repository,
        option: &PushOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let auth = AuthResolver::from_config(&option.auth)?;
        let rewrites = Self::rewrites(&option.target, &auth);

        let mut push_args = args(&["push"]);
        if option.prune {
            push_args.push("--prune".to_string());
        }
        push_args.push(option.target.clone());
        push_args.extend(option.effective_ref_specs());

        let result = self
            .cli
            .run(Some(repository.path()), &push_args, &rewrites, cancel)
            .await?;
        if !result.success {
            return Err(Self::failure(&option.target, &result, |message| {
                SyncError::push_failed(redact_credentials(&option.target), message)
            }));
        }

        if is_up_to_date(&result.combined_output()) {
            debug!(target = %redact_credentials(&option.target), "Everything up-to-date");
            return Ok(SyncOutcome::UpToDate);
        }
        info!(target = %redact_credentials(&option.target), "Pushed");
        Ok(SyncOutcome::Updated)
    }

    async fn fetch(
        &self,
        repository: &Repository,
        auth: &AuthConfig,
        cancel: &CancellationToken,
    ) -> SyncResult<()> {
        let auth = AuthResolver::from_config(auth)?;
        let url = self.origin_url(repository.path(), cancel).await?;
        let rewrites = Self::rewrites(&url, &auth);

        let mut fetch_args = args(&["fetch", "--update-head-ok", ORIGIN]);
        fetch_args.extend(FETCH_REFSPECS.iter().map(|spec| {
            if spec.starts_with('^') {
                spec.to_string()
            } else {
                format!("+{}", spec)
            }
        }));

        let result = self
            .cli
            .run(Some(repository.path()), &fetch_args, &rewrites, cancel)
            .await?;
        if !result.success {
            return Err(Self::failure(&url, &result, |message| {
                SyncError::fetch_failed(repository.path(), message)
            }));
        }
        debug!(path = %repository.path().display(), "Fetched");
        Ok(())
    }

    async fn init(&self, path: &Path, bare: bool) -> SyncResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| SyncError::DirectoryCreate {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut init_args = args(&["init"]);
        if bare {
            init_args.push("--bare".to_string());
        }
        init_args.push(path.to_string_lossy().into_owned());

        self.cli
            .run_checked(None, &init_args, &[], &CancellationToken::new())
            .await?;
        Ok(())
    }

    fn engine(&self) -> GitEngine {
        GitEngine::Binary
    }
}
