use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::result::SyncResult;
use crate::domain::entities::repository::ORIGIN;
use crate::infrastructure::git::cli::{args, GitCli, UrlRewrite};

/// Outcome of creating tracking branches.
///
/// Branch failures never abort a mirror; they are collected here instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub warnings: Vec<String>,
}

/// Rebuilds local tracking branches after a clone or pull through the git
/// executable, which only creates the default branch on its own.
#[derive(Debug, Clone, Default)]
pub struct BranchTracker {
    cli: GitCli,
}

impl BranchTracker {
    pub fn new(cli: GitCli) -> Self {
        Self { cli }
    }

    /// `fetch --all --prune`, `pull --all`, then create tracking branches.
    pub async fn fetch(
        &self,
        path: &Path,
        rewrites: &[UrlRewrite],
        cancel: &CancellationToken,
    ) -> SyncResult<TrackingReport> {
        self.cli
            .run_checked(Some(path), &args(&["fetch", "--all", "--prune"]), rewrites, cancel)
            .await?;
        self.cli
            .run_checked(Some(path), &args(&["pull", "--all"]), rewrites, cancel)
            .await?;
        self.create_tracking_branches(path, cancel).await
    }

    pub async fn create_tracking_branches(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> SyncResult<TrackingReport> {
        let listing = self
            .cli
            .run_checked(Some(path), &args(&["branch", "-r"]), &[], cancel)
            .await?;
        self.process_tracking_branches(path, &listing.stdout, cancel).await
    }

    /// Create `local -> origin/local` for every listed remote branch.
    pub async fn process_tracking_branches(
        &self,
        path: &Path,
        raw_output: &str,
        cancel: &CancellationToken,
    ) -> SyncResult<TrackingReport> {
        let mut report = TrackingReport::default();

        for (local, remote) in tracking_branch_names(raw_output) {
            let result = self
                .cli
                .run(
                    Some(path),
                    &args(&["branch", "--track", local.as_str(), remote.as_str()]),
                    &[],
                    cancel,
                )
                .await?;

            if result.success {
                debug!(branch = %local, "Created tracking branch");
                report.created.push(local);
                continue;
            }

            let output = result.combined_output();
            if output.contains("already exists") {
                debug!(branch = %local, "Tracking branch already exists");
                report.existing.push(local);
            } else {
                let message = format!("{}: {}", local, output.trim());
                warn!(branch = %local, error = %output.trim(), "Could not create tracking branch");
                report.warnings.push(message);
            }
        }

        info!(
            path = %path.display(),
            created = report.created.len(),
            existing = report.existing.len(),
            warnings = report.warnings.len(),
            "Tracking branches processed"
        );
        Ok(report)
    }
}

/// `(local, remote)` pairs for the `origin` branches in `git branch -r`
/// output.
///
/// Symbolic entries (`origin/HEAD -> origin/main`) and branches of other
/// remotes are skipped; the local name is everything after `origin/`.
pub fn tracking_branch_names(raw_output: &str) -> Vec<(String, String)> {
    let prefix = format!("{}/", ORIGIN);
    raw_output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains("->"))
        .filter_map(|remote| {
            let local = remote.strip_prefix(&prefix)?;
            if local.is_empty() {
                return None;
            }
            Some((local.to_string(), remote.to_string()))
        })
        .collect()
}
