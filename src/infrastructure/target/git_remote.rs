use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::common::result::SyncResult;
use crate::domain::entities::repository::Repository;
use crate::domain::value_objects::git_options::{PushOption, SyncOutcome};
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::target::writer::TargetWriter;

/// Pushes straight to a hosted repository.
pub struct GitRemoteWriter {
    backend: Arc<dyn GitBackend>,
}

impl GitRemoteWriter {
    pub fn new(backend: Arc<dyn GitBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TargetWriter for GitRemoteWriter {
    async fn push(
        &self,
        repository: &Repository,
        option: &PushOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        self.backend.push(repository, option, cancel).await
    }
}
