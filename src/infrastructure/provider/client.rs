use async_trait::async_trait;

use crate::common::result::SyncResult;
use crate::domain::entities::project::ProjectInfo;
use crate::domain::entities::sync_config::{OwnerType, ProviderConfig};

/// Request to create a project on a hosting provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProjectOptions {
    pub owner: String,
    pub owner_type: OwnerType,
    pub name: String,
    pub description: String,
    /// Visibility in the target provider's vocabulary
    pub visibility: String,
    pub default_branch: String,
}

/// REST operations the mirror pipeline needs from a hosting provider.
///
/// Project ids are opaque strings; each client picks what its API needs to
/// address a project again.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Every project owned by the configured user or group.
    async fn list_projects(&self, config: &ProviderConfig) -> SyncResult<Vec<ProjectInfo>>;

    /// Whether `owner/name` exists, with its id when it does.
    async fn project_exists(&self, owner: &str, name: &str) -> SyncResult<(bool, Option<String>)>;

    /// Create a project and return its id.
    async fn create_project(&self, options: &CreateProjectOptions) -> SyncResult<String>;

    async fn set_default_branch(&self, owner: &str, name: &str, branch: &str) -> SyncResult<()>;

    async fn protect(&self, owner: &str, branch: &str, id: &str) -> SyncResult<()>;

    async fn unprotect(&self, owner: &str, branch: &str, id: &str) -> SyncResult<()>;

    /// Whether the provider accepts `name` as a project name.
    fn is_valid_name(&self, name: &str) -> bool;
}
