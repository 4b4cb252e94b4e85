use git2::Repository as Git2Repository;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::repository::Repository;
use crate::domain::entities::sync_config::AuthConfig;
use crate::domain::value_objects::git_options::{PushOption, SyncOutcome};
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::git::remote::RemoteManager;

/// Build a fresh working copy of `repository` at `path`.
///
/// Initializes an empty repository, pushes every branch and tag into it,
/// points its `origin` at the source's upstream and checks out the default
/// branch.
pub async fn from_scratch(
    backend: &dyn GitBackend,
    repository: &Repository,
    path: &Path,
    option: &PushOption,
    cancel: &CancellationToken,
) -> SyncResult<SyncOutcome> {
    backend.init(path, false).await?;

    // The checked out branch of the new copy is overwritten by the push.
    Git2Repository::open(path)
        .and_then(|repo| repo.config())
        .and_then(|mut config| config.set_str("receive.denyCurrentBranch", "ignore"))
        .map_err(|e| SyncError::workspace_open(path, e))?;

    let local_push = PushOption::new(path.to_string_lossy(), AuthConfig::default())
        .with_ref_specs(option.ref_specs.clone())
        .with_force(true);
    backend.push(repository, &local_push, cancel).await?;

    RemoteManager::set_remote_and_branch(path, repository)?;

    debug!(path = %path.display(), "Created working copy from scratch");
    Ok(SyncOutcome::Updated)
}
