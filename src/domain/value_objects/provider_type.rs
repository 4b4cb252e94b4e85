use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of system a source or mirror target lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// GitHub (github.com or GitHub Enterprise)
    GitHub,
    /// GitLab (gitlab.com or self-hosted)
    GitLab,
    /// Gitea / Forgejo
    Gitea,
    /// Plain working copies under a local directory
    Directory,
    /// Timestamped `.tar.gz` snapshots under a local directory
    Archive,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ProviderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(ProviderType::GitHub),
            "gitlab" => Ok(ProviderType::GitLab),
            "gitea" | "forgejo" => Ok(ProviderType::Gitea),
            "directory" | "dir" => Ok(ProviderType::Directory),
            "archive" => Ok(ProviderType::Archive),
            _ => Err(ProviderTypeError::Unsupported(s.to_string())),
        }
    }
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::GitHub => "github",
            ProviderType::GitLab => "gitlab",
            ProviderType::Gitea => "gitea",
            ProviderType::Directory => "directory",
            ProviderType::Archive => "archive",
        }
    }

    /// Targets written on the local filesystem; they have no hosting API.
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderType::Directory | ProviderType::Archive)
    }

    /// Hosted providers reachable through a REST API and a git remote.
    pub fn is_remote(&self) -> bool {
        !self.is_local()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderTypeError {
    #[error("Unsupported provider type: '{0}'. Supported types are: github, gitlab, gitea, directory, archive")]
    Unsupported(String),
}
