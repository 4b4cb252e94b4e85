//! Invocation of the external `git` executable.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::sync_config::{GitConfig, DEFAULT_GIT_TIMEOUT_SECS};
use crate::infrastructure::git::auth::AuthMethod;
use crate::infrastructure::process::{CommandExecutor, CommandExecutorError, ExecutionConfig, ExecutionResult};

/// One `url.<base>.insteadOf=<instead_of>` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRewrite {
    pub base: String,
    pub instead_of: String,
}

impl UrlRewrite {
    pub fn new(base: impl Into<String>, instead_of: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            instead_of: instead_of.into(),
        }
    }

    /// Rule embedding a token for HTTPS URLs on the host of `url`, so the
    /// token never shows up in arguments or in the stored remote URL.
    pub fn for_token(url: &str, auth: &AuthMethod) -> Option<Self> {
        let AuthMethod::BasicAuth { username, password } = auth else {
            return None;
        };
        if password.is_empty() {
            return None;
        }

        let parsed = Url::parse(url).ok()?;
        if parsed.scheme() != "https" || !parsed.username().is_empty() {
            return None;
        }
        let host = match parsed.port() {
            Some(port) => format!("{}:{}", parsed.host_str()?, port),
            None => parsed.host_str()?.to_string(),
        };

        Some(Self::new(
            format!("https://{}:{}@{}/", username, password, host),
            format!("https://{}/", host),
        ))
    }
}

/// Runs git with a prepared environment and a per call timeout.
#[derive(Debug, Clone)]
pub struct GitCli {
    executable: String,
    timeout_secs: u64,
    ssh_command: Option<String>,
    ssh_rewrite: Option<UrlRewrite>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            executable: "git".to_string(),
            timeout_secs: DEFAULT_GIT_TIMEOUT_SECS,
            ssh_command: None,
            ssh_rewrite: None,
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &GitConfig) -> Self {
        Self {
            executable: "git".to_string(),
            timeout_secs: config.timeout_secs,
            ssh_command: config.ssh_command.clone(),
            ssh_rewrite: config
                .url_rewrite()
                .map(|(from, to)| UrlRewrite::new(to, from)),
        }
    }

    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Environment for one invocation.
    ///
    /// Prompts are disabled and messages use the C locale so output can be
    /// matched. URL rewrites are passed through `GIT_CONFIG_COUNT` so they
    /// never touch any git config file.
    pub fn environment(&self, rewrites: &[UrlRewrite]) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("GIT_TERMINAL_PROMPT".to_string(), "0".to_string());
        env.insert("LC_ALL".to_string(), "C".to_string());

        if let Some(command) = &self.ssh_command {
            env.insert("GIT_SSH_COMMAND".to_string(), command.clone());
        }

        let rules: Vec<&UrlRewrite> = self.ssh_rewrite.iter().chain(rewrites.iter()).collect();
        if !rules.is_empty() {
            env.insert("GIT_CONFIG_COUNT".to_string(), rules.len().to_string());
            for (index, rule) in rules.iter().enumerate() {
                env.insert(
                    format!("GIT_CONFIG_KEY_{}", index),
                    format!("url.{}.insteadOf", rule.base),
                );
                env.insert(format!("GIT_CONFIG_VALUE_{}", index), rule.instead_of.clone());
            }
        }
        env
    }

    /// Run git and return its output whatever the exit status.
    pub async fn run(
        &self,
        dir: Option<&Path>,
        args: &[String],
        rewrites: &[UrlRewrite],
        cancel: &CancellationToken,
    ) -> SyncResult<ExecutionResult> {
        let mut config = ExecutionConfig::new()
            .with_timeout(self.timeout_secs)
            .with_environment_variables(self.environment(rewrites));
        if let Some(dir) = dir {
            config = config.with_working_directory(dir);
        }

        let description = self.describe(args);
        debug!(command = %description, "Running git");

        let result = CommandExecutor::execute(&self.executable, args, &config, cancel)
            .await
            .map_err(|e| self.map_error(&description, e))?;

        debug!(
            command = %description,
            exit_code = result.exit_code,
            elapsed_ms = result.execution_time_ms,
            "git finished"
        );
        Ok(result)
    }

    /// Run git; a non-zero exit becomes a [`SyncError::Command`].
    pub async fn run_checked(
        &self,
        dir: Option<&Path>,
        args: &[String],
        rewrites: &[UrlRewrite],
        cancel: &CancellationToken,
    ) -> SyncResult<ExecutionResult> {
        let result = self.run(dir, args, rewrites, cancel).await?;
        if result.success {
            Ok(result)
        } else {
            Err(SyncError::command_error(
                self.describe(args),
                redact_credentials(result.combined_output().trim()),
                Some(result.exit_code),
            ))
        }
    }

    /// Fails with [`SyncError::GitBinaryNotFound`] when git cannot be run.
    pub async fn check_availability(&self, cancel: &CancellationToken) -> SyncResult<String> {
        let result = self.run(None, &args(&["--version"]), &[], cancel).await?;
        if !result.success {
            return Err(SyncError::GitBinaryNotFound {
                executable: self.executable.clone(),
            });
        }
        Ok(result.stdout.trim().to_string())
    }

    fn describe(&self, args: &[String]) -> String {
        redact_credentials(&format!("{} {}", self.executable, args.join(" ")))
    }

    fn map_error(&self, description: &str, error: CommandExecutorError) -> SyncError {
        match error {
            CommandExecutorError::NotFound { .. } => SyncError::GitBinaryNotFound {
                executable: self.executable.clone(),
            },
            CommandExecutorError::Timeout { timeout_seconds } => SyncError::timeout(timeout_seconds),
            CommandExecutorError::Cancelled => SyncError::Cancelled,
            other => SyncError::command_error(description, other.to_string(), None),
        }
    }
}

/// Owned argument list from string slices.
pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn credentials_in_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(https?://[^:/@\s]+):[^@\s]+@").expect("valid regex"))
}

/// Mask passwords embedded in URLs.
pub fn redact_credentials(text: &str) -> String {
    credentials_in_url().replace_all(text, "$1:***@").into_owned()
}

/// git reports "nothing to do" on push and pull with these phrases.
pub fn is_up_to_date(output: &str) -> bool {
    output.contains("Everything up-to-date")
        || output.contains("Already up to date")
        || output.contains("Already up-to-date")
}

pub fn is_ssh_permission_denied(output: &str) -> bool {
    output.contains("Permission denied (publickey")
}
