use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::repository::Repository;
use crate::domain::entities::sync_config::ProviderConfig;
use crate::domain::value_objects::git_options::{PullOption, PushOption, SyncOutcome};
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::target::from_scratch::from_scratch;
use crate::infrastructure::target::writer::TargetWriter;

/// Keeps a plain working copy per project under a root directory.
pub struct DirectoryWriter {
    backend: Arc<dyn GitBackend>,
    /// Source the working copies pull from
    source: ProviderConfig,
    /// Directory name of the project under the root
    name: String,
}

impl DirectoryWriter {
    pub fn new(backend: Arc<dyn GitBackend>, source: ProviderConfig, name: impl Into<String>) -> Self {
        Self {
            backend,
            source,
            name: name.into(),
        }
    }

    /// Bring an existing working copy up to date with its upstream.
    pub async fn pull(
        &self,
        source: &ProviderConfig,
        path: &Path,
        repository: &Repository,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        debug!(
            path = %path.display(),
            project = %repository.project().original_name,
            "Updating existing working copy"
        );
        let option = PullOption::new(source.auth.clone());
        self.backend.pull(path, &option, cancel).await
    }
}

#[async_trait]
impl TargetWriter for DirectoryWriter {
    async fn push(
        &self,
        repository: &Repository,
        option: &PushOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let root = PathBuf::from(&option.target);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| SyncError::DirectoryCreate {
                path: root.clone(),
                source: e,
            })?;

        let path = root.join(&self.name);
        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);

        if option.force || !exists {
            if exists {
                tokio::fs::remove_dir_all(&path).await.map_err(|e| {
                    SyncError::io_error_with_source("Failed to replace working copy", Some(path.clone()), e)
                })?;
            }
            let outcome = from_scratch(self.backend.as_ref(), repository, &path, option, cancel).await?;
            info!(path = %path.display(), "Created working copy");
            return Ok(outcome);
        }

        self.pull(&self.source, &path, repository, cancel).await
    }
}
