use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::common::result::SyncResult;
use crate::domain::entities::repository::Repository;
use crate::domain::value_objects::git_options::{PushOption, SyncOutcome};

/// Strategy writing a repository to one kind of mirror target.
///
/// `option.target` is what the orchestrator resolved for the target kind:
/// a remote URL, a root directory or an archive file path.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    async fn push(
        &self,
        repository: &Repository,
        option: &PushOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome>;
}
