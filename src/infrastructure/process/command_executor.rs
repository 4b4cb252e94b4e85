use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Command executor errors
#[derive(Debug, Error)]
pub enum CommandExecutorError {
    #[error("Command timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Command cancelled")]
    Cancelled,

    #[error("Executable not found: {program}")]
    NotFound { program: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Process spawn failed: {0}")]
    SpawnFailed(String),
}

/// Configuration for command execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Working directory for command execution
    pub working_directory: Option<PathBuf>,

    /// Environment variables to set for the process
    pub environment_variables: HashMap<String, String>,

    /// Timeout for command execution in seconds
    pub timeout_seconds: Option<u64>,

    /// Whether to inherit parent process environment
    pub inherit_environment: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            working_directory: None,
            environment_variables: HashMap::new(),
            timeout_seconds: None,
            inherit_environment: true,
        }
    }
}

impl ExecutionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_directory<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_environment_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    pub fn with_environment_variables(mut self, vars: HashMap<String, String>) -> Self {
        self.environment_variables.extend(vars);
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    pub fn with_inherit_environment(mut self, inherit: bool) -> Self {
        self.inherit_environment = inherit;
        self
    }
}

/// Result of command execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: u64,
    /// Whether the command was successful (exit code 0)
    pub success: bool,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, stdout: String, stderr: String, execution_time_ms: u64) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            execution_time_ms,
            success: exit_code == 0,
        }
    }

    /// stdout and stderr joined, as git reports progress and errors on both.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Command executor for running external processes
pub struct CommandExecutor;

impl CommandExecutor {
    /// Run `program` with `args` until it exits, the timeout elapses or
    /// `cancel` fires. The child is killed in the latter two cases.
    pub async fn execute(
        program: &str,
        args: &[String],
        config: &ExecutionConfig,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, CommandExecutorError> {
        if program.trim().is_empty() {
            return Err(CommandExecutorError::InvalidCommand("Command is empty".to_string()));
        }
        if cancel.is_cancelled() {
            return Err(CommandExecutorError::Cancelled);
        }

        let start_time = Instant::now();

        let mut cmd = TokioCommand::new(program);
        cmd.args(args);

        if let Some(working_dir) = &config.working_directory {
            cmd.current_dir(working_dir);
        }

        if !config.inherit_environment {
            cmd.env_clear();
        }
        for (key, value) in &config.environment_variables {
            cmd.env(key, value);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandExecutorError::NotFound {
                    program: program.to_string(),
                }
            } else {
                CommandExecutorError::SpawnFailed(format!("Failed to spawn '{}': {}", program, e))
            }
        })?;

        let wait = child.wait_with_output();
        let output = match config.timeout_seconds {
            Some(timeout_secs) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(CommandExecutorError::Cancelled),
                    result = timeout(Duration::from_secs(timeout_secs), wait) => match result {
                        Ok(output) => output?,
                        Err(_) => {
                            return Err(CommandExecutorError::Timeout {
                                timeout_seconds: timeout_secs,
                            })
                        }
                    },
                }
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(CommandExecutorError::Cancelled),
                    output = wait => output?,
                }
            }
        };

        let execution_time = start_time.elapsed().as_millis() as u64;

        Ok(ExecutionResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            execution_time_ms: execution_time,
            success: output.status.success(),
        })
    }
}
