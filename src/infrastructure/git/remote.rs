use git2::{build::CheckoutBuilder, BranchType, Repository as Git2Repository};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::repository::{Remote, Repository, GPS_UPSTREAM, ORIGIN};

/// Fetch refspec of a mirror remote.
pub const MIRROR_FETCH_REFSPEC: &str = "+refs/*:refs/*";

/// Maintains the `origin` / `gpsupstream` pair of a working copy.
///
/// Remote repair is not safe to run twice concurrently against the same
/// repository; callers process repositories one at a time.
pub struct RemoteManager;

impl RemoteManager {
    /// Point the copy at `path` at the same `origin` as `source` and move its
    /// HEAD to the source's default branch.
    ///
    /// A missing `origin` on the source is logged and skipped.
    pub fn set_remote_and_branch(path: &Path, source: &Repository) -> SyncResult<()> {
        let target = open(path)?;
        let source_repo = open(source.path())?;

        match source_repo.find_remote(ORIGIN) {
            Ok(origin) => match origin.url() {
                Some(url) => {
                    let copied = if target.find_remote(ORIGIN).is_ok() {
                        target.remote_set_url(ORIGIN, url)
                    } else {
                        target.remote(ORIGIN, url).map(|_| ())
                    };
                    copied.map_err(|e| SyncError::remote_creation(ORIGIN, e.message()))?;
                    debug!(path = %path.display(), url, "Copied origin from source");
                    Self::track_origin(&target)?;
                }
                None => warn!(source = %source.path().display(), "Source origin has no URL"),
            },
            Err(e) => {
                warn!(
                    source = %source.path().display(),
                    error = %e.message(),
                    "Source repository has no origin remote"
                );
            }
        }

        Self::set_default_branch(&target, &source.project().default_branch)
    }

    /// Every local branch follows its namesake on `origin`, so a later plain
    /// `git pull` in the copy knows what to merge.
    fn track_origin(repo: &Git2Repository) -> SyncResult<()> {
        let mut config = repo
            .config()
            .map_err(|e| SyncError::remote_creation(ORIGIN, e.message()))?;
        let mut tracked = 0;

        for entry in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            config
                .set_str(&format!("branch.{}.remote", name), ORIGIN)
                .and_then(|_| config.set_str(&format!("branch.{}.merge", name), &format!("refs/heads/{}", name)))
                .map_err(|e| SyncError::remote_creation(ORIGIN, e.message()))?;
            tracked += 1;
        }

        debug!(branches = tracked, "Local branches track origin");
        Ok(())
    }

    /// Bare copies get a symbolic HEAD, working copies a forced checkout.
    fn set_default_branch(repo: &Git2Repository, branch: &str) -> SyncResult<()> {
        let refname = format!("refs/heads/{}", branch);

        if !repo.is_bare() {
            let reference = repo
                .find_reference(&refname)
                .map_err(|e| SyncError::branch_checkout(branch, e.message()))?;
            let commit = reference
                .peel_to_commit()
                .map_err(|e| SyncError::branch_checkout(branch, e.message()))?;

            let mut checkout = CheckoutBuilder::new();
            checkout.force();
            repo.checkout_tree(commit.as_object(), Some(&mut checkout))
                .map_err(|e| SyncError::branch_checkout(branch, e.message()))?;
        }

        repo.set_head(&refname)
            .map_err(|e| SyncError::branch_checkout(branch, e.message()))?;
        debug!(branch, bare = repo.is_bare(), "HEAD points at default branch");
        Ok(())
    }

    /// Recreate `gpsupstream` as a mirror remote with `origin`'s URL and
    /// check the result.
    pub fn set_gps_upstream_remote_from_origin(repository: &Repository) -> SyncResult<()> {
        let repo = open(repository.path())?;

        let expected = {
            let origin = repo
                .find_remote(ORIGIN)
                .map_err(|e| SyncError::remote_creation(ORIGIN, e.message()))?;
            origin
                .url()
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SyncError::remote_creation(ORIGIN, "origin has no URL"))?
        };

        if repo.find_remote(GPS_UPSTREAM).is_ok() {
            repo.remote_delete(GPS_UPSTREAM)
                .map_err(|e| SyncError::remote_creation(GPS_UPSTREAM, e.message()))?;
        }

        repo.remote_with_fetch(GPS_UPSTREAM, &expected, MIRROR_FETCH_REFSPEC)
            .map_err(|e| SyncError::remote_creation(GPS_UPSTREAM, e.message()))?;
        repo.config()
            .and_then(|mut config| config.set_bool(&format!("remote.{}.mirror", GPS_UPSTREAM), true))
            .map_err(|e| SyncError::remote_creation(GPS_UPSTREAM, e.message()))?;

        let actual = Self::remote_url(&repo, GPS_UPSTREAM)?;
        Self::verify_upstream(&expected, &actual)?;

        info!(
            path = %repository.path().display(),
            url = %expected,
            "Upstream alias mirrors origin"
        );
        Ok(())
    }

    /// The recorded provenance URL of a repository.
    pub fn upstream_url(repository: &Repository) -> SyncResult<String> {
        let repo = open(repository.path())?;
        Self::remote_url(&repo, GPS_UPSTREAM)
    }

    /// Post-condition of [`set_gps_upstream_remote_from_origin`](Self::set_gps_upstream_remote_from_origin).
    pub fn verify_upstream(expected: &str, actual: &str) -> SyncResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(SyncError::RemoteMismatch {
                remote: GPS_UPSTREAM.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }

    /// All remotes of the repository at `path`.
    pub fn list_remotes(path: &Path) -> SyncResult<Vec<Remote>> {
        let repo = open(path)?;
        let config = repo.config()?;
        let names = repo.remotes()?;

        let mut remotes = Vec::new();
        for name in names.iter().flatten() {
            let remote = repo.find_remote(name)?;
            let mirror = config
                .get_bool(&format!("remote.{}.mirror", name))
                .unwrap_or(false);
            remotes.push(Remote::new(name, remote.url().unwrap_or_default()).with_mirror(mirror));
        }
        Ok(remotes)
    }

    fn remote_url(repo: &Git2Repository, name: &str) -> SyncResult<String> {
        let remote = repo
            .find_remote(name)
            .map_err(|e| SyncError::remote_creation(name, format!("remote missing: {}", e.message())))?;
        remote
            .url()
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SyncError::remote_creation(name, "remote has no URL"))
    }
}

fn open(path: &Path) -> SyncResult<Git2Repository> {
    Git2Repository::open(path).map_err(|e| SyncError::workspace_open(path, e))
}
