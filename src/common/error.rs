use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while mirroring repositories.
///
/// Each pipeline stage has its own variant so callers can tell an
/// authentication problem from a push rejection without parsing messages.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid authentication configuration: {message}")]
    Authentication { message: String },

    #[error("Clone failed for {url}: {message}")]
    Clone {
        url: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Pull failed at {}: {message}", .path.display())]
    Pull {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Push to {target} failed: {message}")]
    Push {
        target: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Fetch failed at {}: {message}", .path.display())]
    Fetch {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to open workspace at {}: {message}", .path.display())]
    WorkspaceOpen {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("Workspace at {} has uncommitted changes", .path.display())]
    UncleanWorkspace { path: PathBuf },

    #[error("Remote '{remote}' could not be created: {message}")]
    RemoteCreation { remote: String, message: String },

    #[error("Remote '{remote}' URL mismatch: expected '{expected}', found '{actual}'")]
    RemoteMismatch {
        remote: String,
        expected: String,
        actual: String,
    },

    #[error("Checkout of branch '{branch}' failed: {message}")]
    BranchCheckout { branch: String, message: String },

    #[error("git executable not found: {executable}")]
    GitBinaryNotFound { executable: String },

    #[error("SSH permission denied for {url}")]
    SshPermissionDenied { url: String },

    #[error("No files to archive in {}", .path.display())]
    NoFilesToArchive { path: PathBuf },

    #[error("Failed to create directory {}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid repository name '{name}' for {provider}")]
    InvalidRepositoryName { name: String, provider: String },

    #[error("Failed to create project {owner}/{name}: {message}")]
    ProjectCreation {
        owner: String,
        name: String,
        message: String,
    },

    #[error("Failed to set default branch '{branch}' on {owner}/{name}: {message}")]
    DefaultBranch {
        owner: String,
        name: String,
        branch: String,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Provider request failed: {message}")]
    Provider {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Command execution failed: {command}: {message}")]
    Command {
        command: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("File system operation failed: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn clone_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Clone {
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn clone_failed_with_source(
        url: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Clone {
            url: url.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn pull_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Pull {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn pull_failed_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Pull {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn push_failed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Push {
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn push_failed_with_source(
        target: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Push {
            target: target.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn fetch_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Fetch {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn fetch_failed_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn workspace_open(path: impl Into<PathBuf>, source: git2::Error) -> Self {
        Self::WorkspaceOpen {
            path: path.into(),
            message: source.message().to_string(),
            source: Some(source),
        }
    }

    pub fn remote_creation(remote: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteCreation {
            remote: remote.into(),
            message: message.into(),
        }
    }

    pub fn branch_checkout(branch: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BranchCheckout {
            branch: branch.into(),
            message: message.into(),
        }
    }

    pub fn invalid_repository_name(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::InvalidRepositoryName {
            name: name.into(),
            provider: provider.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn provider_error(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    pub fn command_error(
        command: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
            exit_code,
        }
    }

    pub fn io_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<git2::Error> for SyncError {
    fn from(error: git2::Error) -> Self {
        Self::Internal {
            message: format!("git operation failed: {}", error.message()),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(error: std::io::Error) -> Self {
        Self::io_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config_error_with_source("YAML parsing failed", error)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        Self::Provider {
            message: error.to_string(),
            source: Some(error),
        }
    }
}
