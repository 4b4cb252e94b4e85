use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::domain::value_objects::provider_type::ProviderType;
use crate::domain::value_objects::repo_name::sanitize_ascii_name;

/// Facts a provider reports about one project.
///
/// Everything is fixed at listing time except the sanitized name, which is
/// computed at most once when the ASCII name policy is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Name as reported by the provider
    pub original_name: String,
    pub https_url: String,
    pub ssh_url: String,
    #[serde(default)]
    pub description: String,
    pub default_branch: String,
    pub visibility: String,
    /// Provider the project was listed from
    pub provider_type: ProviderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    clean_name: OnceLock<String>,
}

impl ProjectInfo {
    pub fn new(
        original_name: impl Into<String>,
        https_url: impl Into<String>,
        ssh_url: impl Into<String>,
        provider_type: ProviderType,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            https_url: https_url.into(),
            ssh_url: ssh_url.into(),
            description: String::new(),
            default_branch: "main".to_string(),
            visibility: "private".to_string(),
            provider_type,
            last_activity_at: None,
            clean_name: OnceLock::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.visibility = visibility.into();
        self
    }

    pub fn with_last_activity(mut self, at: DateTime<Utc>) -> Self {
        self.last_activity_at = Some(at);
        self
    }

    /// Compute the ASCII name once. Later calls keep the first value.
    pub fn clean(&self) -> &str {
        self.clean_name
            .get_or_init(|| sanitize_ascii_name(&self.original_name))
    }

    pub fn clean_name(&self) -> Option<&str> {
        self.clean_name.get().map(String::as_str)
    }

    /// Name to use in target URLs and paths.
    pub fn name(&self, ascii: bool) -> &str {
        if ascii {
            self.clean()
        } else {
            &self.original_name
        }
    }

    /// Clone URL for the given transport.
    pub fn clone_url(&self, ssh: bool) -> &str {
        if ssh {
            &self.ssh_url
        } else {
            &self.https_url
        }
    }
}
