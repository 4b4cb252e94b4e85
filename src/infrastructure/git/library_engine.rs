//! `GitBackend` running on libgit2.
//!
//! git2 calls block, so each operation runs on the blocking pool. A call in
//! flight is not interrupted by cancellation; the token is only checked
//! before starting.

use async_trait::async_trait;
use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    BranchType, Direction, ErrorClass, ErrorCode, FetchOptions, FetchPrune, Oid, PushOptions,
    Repository as Git2Repository, StatusOptions,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::project::ProjectInfo;
use crate::domain::entities::repository::{Repository, ORIGIN};
use crate::domain::entities::sync_config::{AuthConfig, GitEngine};
use crate::domain::value_objects::git_options::{
    CloneOption, PullOption, PushOption, SyncOutcome, FETCH_REFSPECS,
};
use crate::infrastructure::git::auth::{AuthMethod, AuthResolver};
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::git::cli::redact_credentials;
use crate::infrastructure::git::remote::MIRROR_FETCH_REFSPEC;

/// In-process git engine.
#[derive(Debug, Clone, Default)]
pub struct LibraryEngine;

impl LibraryEngine {
    pub fn new() -> Self {
        Self
    }
}

async fn blocking<T, F>(cancel: &CancellationToken, work: F) -> SyncResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> SyncResult<T> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SyncError::internal_error(format!("git task failed: {}", e)))?
}

#[async_trait]
impl GitBackend for LibraryEngine {
    async fn clone_repository(
        &self,
        option: &CloneOption,
        project: Arc<ProjectInfo>,
        cancel: &CancellationToken,
    ) -> SyncResult<Repository> {
        let auth = AuthResolver::from_config(&option.auth)?;
        let option = option.clone();
        blocking(cancel, move || {
            clone_blocking(&option, &auth)?;
            Ok(Repository::new(&option.path, option.bare, project))
        })
        .await
    }

    async fn pull(
        &self,
        path: &Path,
        option: &PullOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let auth = AuthResolver::from_config(&option.auth)?;
        let path = path.to_path_buf();
        let option = option.clone();
        blocking(cancel, move || pull_blocking(&path, &option, &auth)).await
    }

    async fn push(
        &self,
        repository: &Repository,
        option: &PushOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let auth = AuthResolver::from_config(&option.auth)?;
        let path = repository.path().to_path_buf();
        let option = option.clone();
        blocking(cancel, move || push_blocking(&path, &option, &auth)).await
    }

    async fn fetch(
        &self,
        repository: &Repository,
        auth: &AuthConfig,
        cancel: &CancellationToken,
    ) -> SyncResult<()> {
        let auth = AuthResolver::from_config(auth)?;
        let path = repository.path().to_path_buf();
        blocking(cancel, move || fetch_blocking(&path, &auth)).await
    }

    async fn init(&self, path: &Path, bare: bool) -> SyncResult<()> {
        let path = path.to_path_buf();
        blocking(&CancellationToken::new(), move || {
            std::fs::create_dir_all(&path)
                .map_err(|e| SyncError::DirectoryCreate {
                    path: path.clone(),
                    source: e,
                })?;
            let created = if bare {
                Git2Repository::init_bare(&path)
            } else {
                Git2Repository::init(&path)
            };
            created.map_err(|e| SyncError::workspace_open(&path, e))?;
            Ok(())
        })
        .await
    }

    fn engine(&self) -> GitEngine {
        GitEngine::Library
    }
}

fn clone_blocking(option: &CloneOption, auth: &AuthMethod) -> SyncResult<()> {
    if let Some(parent) = option.path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SyncError::DirectoryCreate {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(auth.remote_callbacks());

    let mut builder = RepoBuilder::new();
    builder.bare(option.bare);
    if option.mirror && option.bare {
        builder.remote_create(|repo, name, url| repo.remote_with_fetch(name, url, MIRROR_FETCH_REFSPEC));
    }
    builder.fetch_options(fetch_options);

    debug!(url = %redact_credentials(&option.url), path = %option.path.display(), bare = option.bare, "Cloning");
    let repo = builder
        .clone(&option.url, &option.path)
        .map_err(|e| classify(&option.url, auth, e, |e| {
            SyncError::clone_failed_with_source(redact_credentials(&option.url), e.message().to_string(), e)
        }))?;

    if !option.bare {
        let created = create_local_branches(&repo)?;
        debug!(path = %option.path.display(), created, "Created local branches");
    }

    info!(path = %option.path.display(), "Cloned repository");
    Ok(())
}

fn pull_blocking(path: &Path, option: &PullOption, auth: &AuthMethod) -> SyncResult<SyncOutcome> {
    let repo = Git2Repository::open(path).map_err(|e| SyncError::workspace_open(path, e))?;

    if !repo.is_bare() {
        let mut status_options = StatusOptions::new();
        status_options.include_untracked(true).include_ignored(false);
        let statuses = repo
            .statuses(Some(&mut status_options))
            .map_err(|e| SyncError::workspace_open(path, e))?;
        if !statuses.is_empty() {
            return Err(SyncError::UncleanWorkspace {
                path: path.to_path_buf(),
            });
        }
    }

    let before = ref_snapshot(&repo)?;

    {
        let mut remote = repo
            .find_remote(&option.remote)
            .map_err(|e| SyncError::pull_failed_with_source(path, format!("remote '{}' not found", option.remote), e))?;
        let url = remote.url().unwrap_or_default().to_string();

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(auth.remote_callbacks());
        if option.prune {
            fetch_options.prune(FetchPrune::On);
        }
        remote
            .fetch::<&str>(&[], Some(&mut fetch_options), None)
            .map_err(|e| classify(&url, auth, e, |e| {
                SyncError::pull_failed_with_source(path, e.message().to_string(), e)
            }))?;
    }

    if repo.is_bare() {
        let after = ref_snapshot(&repo)?;
        return Ok(if before == after {
            SyncOutcome::UpToDate
        } else {
            SyncOutcome::Updated
        });
    }

    let created = create_local_branches(&repo)?;
    let outcome = fast_forward_head(&repo, path, &option.remote)?;

    if created > 0 && outcome == SyncOutcome::UpToDate {
        return Ok(SyncOutcome::Updated);
    }
    Ok(outcome)
}

/// Fast-forward the checked out branch to its remote-tracking ref.
fn fast_forward_head(repo: &Git2Repository, path: &Path, remote: &str) -> SyncResult<SyncOutcome> {
    let head = repo
        .head()
        .map_err(|e| SyncError::pull_failed_with_source(path, "HEAD is not a branch", e))?;
    let branch = head
        .shorthand()
        .ok_or_else(|| SyncError::pull_failed(path, "HEAD has no branch name"))?
        .to_string();

    let upstream_name = format!("refs/remotes/{}/{}", remote, branch);
    let upstream = repo
        .find_reference(&upstream_name)
        .map_err(|e| SyncError::pull_failed_with_source(path, format!("no upstream {}", upstream_name), e))?;
    let incoming = repo
        .reference_to_annotated_commit(&upstream)
        .map_err(|e| SyncError::pull_failed_with_source(path, e.message().to_string(), e))?;

    let (analysis, _) = repo
        .merge_analysis(&[&incoming])
        .map_err(|e| SyncError::pull_failed_with_source(path, e.message().to_string(), e))?;

    if analysis.is_up_to_date() {
        debug!(path = %path.display(), branch = %branch, "Already up to date");
        return Ok(SyncOutcome::UpToDate);
    }

    if !analysis.is_fast_forward() {
        return Err(SyncError::pull_failed(
            path,
            format!("branch '{}' has diverged from {}", branch, upstream_name),
        ));
    }

    let refname = format!("refs/heads/{}", branch);
    let mut local = repo
        .find_reference(&refname)
        .map_err(|e| SyncError::pull_failed_with_source(path, e.message().to_string(), e))?;
    local
        .set_target(incoming.id(), "fast-forward")
        .map_err(|e| SyncError::pull_failed_with_source(path, e.message().to_string(), e))?;
    repo.set_head(&refname)
        .map_err(|e| SyncError::branch_checkout(&branch, e.message()))?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))
        .map_err(|e| SyncError::branch_checkout(&branch, e.message()))?;

    info!(path = %path.display(), branch = %branch, "Fast-forwarded");
    Ok(SyncOutcome::Updated)
}

fn push_blocking(path: &Path, option: &PushOption, auth: &AuthMethod) -> SyncResult<SyncOutcome> {
    let repo = Git2Repository::open(path).map_err(|e| SyncError::workspace_open(path, e))?;
    let target = redact_credentials(&option.target);
    let local_refs = local_refs(&repo, &option.ref_specs)?;

    let refspecs = expand_refspecs(&option.effective_ref_specs(), &local_refs);
    if refspecs.is_empty() {
        debug!(target = %target, "No local refs to push");
        return Ok(SyncOutcome::UpToDate);
    }

    let uploaded = upload(&repo, &refspecs, option, auth, &target)?;
    let pruned = if option.prune {
        prune_stale(&repo, &local_refs, option, auth, &target)?
    } else {
        0
    };

    if uploaded == 0 && pruned == 0 {
        debug!(target = %target, "Everything up-to-date");
        return Ok(SyncOutcome::UpToDate);
    }

    info!(target = %target, refs = uploaded, pruned, "Pushed");
    Ok(SyncOutcome::Updated)
}

/// Push `refspecs`, returning how many refs changed on the remote.
///
/// The negotiation callback sees the remote's current value for every ref
/// and cancels the upload when none of them differ.
fn upload(
    repo: &Git2Repository,
    refspecs: &[String],
    option: &PushOption,
    auth: &AuthMethod,
    target: &str,
) -> SyncResult<usize> {
    let mut remote = repo
        .remote_anonymous(&option.target)
        .map_err(|e| SyncError::push_failed_with_source(target, e.message().to_string(), e))?;

    let changed = Cell::new(None);
    let rejected = RefCell::new(Vec::new());
    let mut callbacks = auth.remote_callbacks();
    callbacks.push_negotiation(|updates| {
        let count = updates.iter().filter(|update| update.src() != update.dst()).count();
        changed.set(Some(count));
        if count == 0 {
            return Err(git2::Error::from_str("remote already up to date"));
        }
        Ok(())
    });
    callbacks.push_update_reference(|refname, status| {
        if let Some(message) = status {
            rejected.borrow_mut().push(format!("{}: {}", refname, message));
        }
        Ok(())
    });
    let mut push_options = PushOptions::new();
    push_options.remote_callbacks(callbacks);

    debug!(target = %target, refspecs = refspecs.len(), force = option.force, "Pushing");
    let result = remote.push(refspecs, Some(&mut push_options));
    drop(push_options);

    if changed.get() == Some(0) {
        return Ok(0);
    }
    result.map_err(|e| classify(&option.target, auth, e, |e| {
        SyncError::push_failed_with_source(target, e.message().to_string(), e)
    }))?;

    let rejected = rejected.into_inner();
    if !rejected.is_empty() {
        return Err(SyncError::push_failed(target, rejected.join("; ")));
    }
    Ok(changed.get().unwrap_or(refspecs.len()))
}

/// Delete remote refs under the pushed globs that no longer exist locally.
fn prune_stale(
    repo: &Git2Repository,
    local_refs: &HashMap<String, Oid>,
    option: &PushOption,
    auth: &AuthMethod,
    target: &str,
) -> SyncResult<usize> {
    let mut remote = repo
        .remote_anonymous(&option.target)
        .map_err(|e| SyncError::push_failed_with_source(target, e.message().to_string(), e))?;

    // Only listed after `upload`, which leaves at least one ref on the remote:
    // git2 cannot list an empty advertisement.
    let remote_refs: HashMap<String, Oid> = {
        let connection = remote
            .connect_auth(Direction::Push, Some(auth.remote_callbacks()), None)
            .map_err(|e| classify(&option.target, auth, e, |e| {
                SyncError::push_failed_with_source(target, e.message().to_string(), e)
            }))?;
        let heads = connection
            .list()
            .map_err(|e| SyncError::push_failed_with_source(target, e.message().to_string(), e))?;
        heads
            .iter()
            .map(|head| (head.name().to_string(), head.oid()))
            .collect()
    };

    let deletions: Vec<String> = stale_remote_refs(&option.ref_specs, local_refs, &remote_refs)
        .into_iter()
        .map(|name| format!(":{}", name))
        .collect();
    if deletions.is_empty() {
        return Ok(0);
    }

    let mut push_options = PushOptions::new();
    push_options.remote_callbacks(auth.remote_callbacks());
    remote
        .push(&deletions, Some(&mut push_options))
        .map_err(|e| classify(&option.target, auth, e, |e| {
            SyncError::push_failed_with_source(target, e.message().to_string(), e)
        }))?;

    debug!(target = %target, pruned = deletions.len(), "Pruned stale refs");
    Ok(deletions.len())
}

fn fetch_blocking(path: &Path, auth: &AuthMethod) -> SyncResult<()> {
    let repo = Git2Repository::open(path).map_err(|e| SyncError::workspace_open(path, e))?;
    let mut remote = repo
        .find_remote(ORIGIN)
        .map_err(|e| SyncError::fetch_failed_with_source(path, "origin not found", e))?;
    let url = remote.url().unwrap_or_default().to_string();

    let (excluded, included): (Vec<&str>, Vec<&str>) = FETCH_REFSPECS
        .iter()
        .copied()
        .partition(|spec| spec.starts_with('^'));
    let refspecs: Vec<String> = included.iter().map(|spec| format!("+{}", spec)).collect();

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(auth.remote_callbacks());
    remote
        .fetch(&refspecs, Some(&mut fetch_options), None)
        .map_err(|e| classify(&url, auth, e, |e| {
            SyncError::fetch_failed_with_source(path, e.message().to_string(), e)
        }))?;

    // libgit2 has no negative refspecs: excluded refs are deleted after the fetch.
    for glob in excluded.iter().map(|spec| spec.trim_start_matches('^')) {
        let removed = delete_refs(&repo, glob)
            .map_err(|e| SyncError::fetch_failed_with_source(path, e.message().to_string(), e))?;
        if removed > 0 {
            debug!(path = %path.display(), glob, removed, "Dropped excluded refs");
        }
    }

    debug!(path = %path.display(), "Fetched");
    Ok(())
}

/// Local branch for every `origin/*` branch that has none yet.
fn create_local_branches(repo: &Git2Repository) -> SyncResult<usize> {
    let prefix = format!("{}/", ORIGIN);
    let mut created = 0;

    for entry in repo.branches(Some(BranchType::Remote))? {
        let (branch, _) = entry?;
        let Some(name) = branch.name()?.map(str::to_string) else {
            continue;
        };
        let Some(local) = name.strip_prefix(&prefix) else {
            continue;
        };
        if local == "HEAD" || repo.find_branch(local, BranchType::Local).is_ok() {
            continue;
        }

        let commit = branch.get().peel_to_commit()?;
        let mut new_branch = repo.branch(local, &commit, false)?;
        new_branch.set_upstream(Some(name.as_str()))?;
        created += 1;
    }
    Ok(created)
}

fn delete_refs(repo: &Git2Repository, glob: &str) -> Result<usize, git2::Error> {
    let mut names = Vec::new();
    for reference in repo.references_glob(glob)? {
        if let Some(name) = reference?.name() {
            names.push(name.to_string());
        }
    }
    for name in &names {
        repo.find_reference(name)?.delete()?;
    }
    Ok(names.len())
}

/// Every ref and its target; used to detect whether a fetch changed anything.
fn ref_snapshot(repo: &Git2Repository) -> SyncResult<HashMap<String, Oid>> {
    let mut refs = HashMap::new();
    for reference in repo.references()? {
        let reference = reference?;
        if let (Some(name), Some(target)) = (reference.name(), reference.target()) {
            refs.insert(name.to_string(), target);
        }
    }
    Ok(refs)
}

/// Local refs covered by the source side of `specs`.
fn local_refs(repo: &Git2Repository, specs: &[String]) -> SyncResult<HashMap<String, Oid>> {
    let mut refs = HashMap::new();
    for spec in specs {
        let (src, _) = split_refspec(spec.trim_start_matches('+'));
        for reference in repo.references_glob(src)? {
            let reference = reference?;
            if let (Some(name), Some(target)) = (reference.name(), reference.target()) {
                refs.insert(name.to_string(), target);
            }
        }
    }
    Ok(refs)
}

fn split_refspec(spec: &str) -> (&str, &str) {
    let spec = spec.trim_start_matches('+');
    spec.split_once(':').unwrap_or((spec, spec))
}

/// Replace wildcard refspecs by one explicit refspec per matching local ref.
fn expand_refspecs(specs: &[String], local: &HashMap<String, Oid>) -> Vec<String> {
    let mut expanded = Vec::new();
    for spec in specs {
        let force = if spec.starts_with('+') { "+" } else { "" };
        let (src, dst) = split_refspec(spec);

        match (src.strip_suffix('*'), dst.strip_suffix('*')) {
            (Some(src_prefix), Some(dst_prefix)) => {
                let mut names: Vec<&String> = local.keys().filter(|name| name.starts_with(src_prefix)).collect();
                names.sort();
                for name in names {
                    let suffix = &name[src_prefix.len()..];
                    expanded.push(format!("{}{}:{}{}", force, name, dst_prefix, suffix));
                }
            }
            _ => expanded.push(spec.clone()),
        }
    }
    expanded
}

/// Remote refs under the destination globs that have no local counterpart.
fn stale_remote_refs(
    specs: &[String],
    local: &HashMap<String, Oid>,
    remote: &HashMap<String, Oid>,
) -> Vec<String> {
    let mut stale = Vec::new();
    for spec in specs {
        let (src, dst) = split_refspec(spec);
        if let (Some(src_prefix), Some(dst_prefix)) = (src.strip_suffix('*'), dst.strip_suffix('*')) {
            for name in remote.keys() {
                if let Some(suffix) = name.strip_prefix(dst_prefix) {
                    if !local.contains_key(&format!("{}{}", src_prefix, suffix)) {
                        stale.push(name.clone());
                    }
                }
            }
        }
    }
    stale.sort();
    stale
}

/// SSH authentication failures get their own error; everything else goes
/// through `fallback`.
fn classify(
    url: &str,
    auth: &AuthMethod,
    error: git2::Error,
    fallback: impl FnOnce(git2::Error) -> SyncError,
) -> SyncError {
    let message = error.message().to_lowercase();
    let auth_failure = error.code() == ErrorCode::Auth
        || (error.class() == ErrorClass::Ssh && message.contains("auth"))
        || message.contains("authentication rejected")
        || message.contains("permission denied");

    if auth.is_ssh() && auth_failure {
        SyncError::SshPermissionDenied {
            url: redact_credentials(url),
        }
    } else {
        fallback(error)
    }
}
