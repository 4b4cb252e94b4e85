use std::sync::Arc;

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::sync_config::ProviderConfig;
use crate::domain::value_objects::provider_type::ProviderType;
use crate::infrastructure::provider::client::ProviderClient;
use crate::infrastructure::provider::github::GitHubClient;

/// Builds API clients for configured providers.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, config: &ProviderConfig) -> SyncResult<Arc<dyn ProviderClient>>;
}

/// Factory backed by the REST clients shipped with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestProviderFactory;

impl RestProviderFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderFactory for RestProviderFactory {
    fn create(&self, config: &ProviderConfig) -> SyncResult<Arc<dyn ProviderClient>> {
        match config.provider_type {
            ProviderType::GitHub => Ok(Arc::new(GitHubClient::from_config(config)?)),
            ProviderType::GitLab | ProviderType::Gitea => Err(SyncError::provider_error(format!(
                "no API client available for {} ({})",
                config.provider_type, config.domain
            ))),
            ProviderType::Directory | ProviderType::Archive => Err(SyncError::provider_error(format!(
                "'{}' targets have no provider API",
                config.provider_type
            ))),
        }
    }
}
