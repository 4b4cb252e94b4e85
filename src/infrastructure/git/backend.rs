use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::common::result::SyncResult;
use crate::domain::entities::project::ProjectInfo;
use crate::domain::entities::repository::Repository;
use crate::domain::entities::sync_config::{AuthConfig, GitEngine};
use crate::domain::value_objects::git_options::{CloneOption, PullOption, PushOption, SyncOutcome};

/// Git primitives needed to mirror a repository.
///
/// Both engines honour the same contract: permission problems on SSH
/// surface as [`SshPermissionDenied`](crate::common::error::SyncError::SshPermissionDenied),
/// a dirty working tree fails a pull before anything is fetched, and a
/// target that already has every ref yields [`SyncOutcome::UpToDate`].
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Materialize `option.url` at `option.path`.
    async fn clone_repository(
        &self,
        option: &CloneOption,
        project: Arc<ProjectInfo>,
        cancel: &CancellationToken,
    ) -> SyncResult<Repository>;

    /// Integrate upstream changes into the working copy at `path`.
    async fn pull(
        &self,
        path: &Path,
        option: &PullOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome>;

    /// Write the repository's refs to `option.target`.
    async fn push(
        &self,
        repository: &Repository,
        option: &PushOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome>;

    /// Refresh every ref except pull request heads from `origin`.
    async fn fetch(
        &self,
        repository: &Repository,
        auth: &AuthConfig,
        cancel: &CancellationToken,
    ) -> SyncResult<()>;

    /// Create an empty repository at `path`.
    async fn init(&self, path: &Path, bare: bool) -> SyncResult<()>;

    fn engine(&self) -> GitEngine;
}
