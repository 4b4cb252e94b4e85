//! Both git engines stage and push a local repository the same way.

mod common;

use common::test_fixtures::{commit_file, upstream_repo};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use git_provider_sync::domain::entities::project::ProjectInfo;
use git_provider_sync::domain::entities::sync_config::AuthConfig;
use git_provider_sync::common::error::SyncError;
use git_provider_sync::domain::value_objects::git_options::{
    CloneOption, PullOption, PushOption, SyncOutcome,
};
use git_provider_sync::domain::value_objects::provider_type::ProviderType;
use git_provider_sync::infrastructure::git::backend::GitBackend;
use git_provider_sync::infrastructure::git::binary_engine::BinaryEngine;
use git_provider_sync::infrastructure::git::cli::GitCli;
use git_provider_sync::infrastructure::git::library_engine::LibraryEngine;
use git_provider_sync::infrastructure::git::remote::RemoteManager;

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn branches(path: &Path) -> Vec<String> {
    let repo = git2::Repository::open(path).unwrap();
    let mut names: Vec<String> = repo
        .branches(Some(git2::BranchType::Local))
        .unwrap()
        .map(|branch| branch.unwrap().0.name().unwrap().unwrap().to_string())
        .collect();
    names.sort();
    names
}

fn project_for(url: &str) -> Arc<ProjectInfo> {
    Arc::new(ProjectInfo::new("demo", url, url, ProviderType::GitLab))
}

fn branch_from_main(repo: &git2::Repository, name: &str) {
    let head = repo.find_reference("refs/heads/main").unwrap().peel_to_commit().unwrap();
    repo.branch(name, &head, false).unwrap();
}

/// A mirror fetch picks up new upstream commits and leaves pull request
/// refs behind.
async fn fetch_skips_pull_requests(backend: &dyn GitBackend) {
    let (upstream_dir, upstream) = upstream_repo();
    let work = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let url = upstream_dir.path().to_string_lossy().into_owned();

    let option = CloneOption::new(url.clone(), work.path().join("staging"), AuthConfig::default())
        .with_bare(true)
        .with_mirror(true);
    let repository = backend
        .clone_repository(&option, project_for(&url), &cancel)
        .await
        .unwrap();

    let new_head = commit_file(&upstream, "refs/heads/main", "CHANGES.md", "more");
    upstream
        .reference("refs/pull/1/head", new_head, false, "pull request")
        .unwrap();

    backend
        .fetch(&repository, &AuthConfig::default(), &cancel)
        .await
        .unwrap();

    let staged = git2::Repository::open(repository.path()).unwrap();
    assert_eq!(
        staged.find_reference("refs/heads/main").unwrap().target(),
        Some(new_head)
    );
    assert!(staged.find_reference("refs/pull/1/head").is_err());
}

/// Pulls into a working copy: up to date, fast-forward, new branch, dirty tree.
async fn pull_scenarios(backend: &dyn GitBackend) {
    let (upstream_dir, upstream) = upstream_repo();
    let work = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let url = upstream_dir.path().to_string_lossy().into_owned();
    let pull = PullOption::new(AuthConfig::default());

    let option = CloneOption::new(url.clone(), work.path().join("copy"), AuthConfig::default());
    let repository = backend
        .clone_repository(&option, project_for(&url), &cancel)
        .await
        .unwrap();
    let copy = repository.path();
    assert_eq!(branches(copy), vec!["dev", "main"]);

    assert_eq!(backend.pull(copy, &pull, &cancel).await.unwrap(), SyncOutcome::UpToDate);

    commit_file(&upstream, "refs/heads/main", "CHANGES.md", "more");
    assert_eq!(backend.pull(copy, &pull, &cancel).await.unwrap(), SyncOutcome::Updated);
    assert_eq!(std::fs::read_to_string(copy.join("CHANGES.md")).unwrap(), "more");

    branch_from_main(&upstream, "feature");
    assert_eq!(backend.pull(copy, &pull, &cancel).await.unwrap(), SyncOutcome::Updated);
    assert_eq!(branches(copy), vec!["dev", "feature", "main"]);

    std::fs::write(copy.join("dirty.txt"), "x").unwrap();
    let error = backend.pull(copy, &pull, &cancel).await.unwrap_err();
    assert!(matches!(error, SyncError::UncleanWorkspace { .. }), "unexpected error {:?}", error);
}

async fn stage_and_push(backend: &dyn GitBackend) {
    let (upstream_dir, _upstream) = upstream_repo();
    let work = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let url = upstream_dir.path().to_string_lossy().into_owned();

    let project = ProjectInfo::new("demo", url.clone(), url.clone(), ProviderType::GitLab);
    let option = CloneOption::new(url.clone(), work.path().join("staging"), AuthConfig::default())
        .with_bare(true)
        .with_mirror(true);
    let repository = backend
        .clone_repository(&option, Arc::new(project), &cancel)
        .await
        .unwrap();
    assert!(repository.is_bare());
    assert_eq!(branches(repository.path()), vec!["dev", "main"]);

    RemoteManager::set_gps_upstream_remote_from_origin(&repository).unwrap();
    assert_eq!(RemoteManager::upstream_url(&repository).unwrap(), url);

    let target = work.path().join("target.git");
    backend.init(&target, true).await.unwrap();
    let push = PushOption::new(target.to_string_lossy(), AuthConfig::default());

    let first = backend.push(&repository, &push, &cancel).await.unwrap();
    assert_eq!(first, SyncOutcome::Updated);
    assert_eq!(branches(&target), vec!["dev", "main"]);

    let second = backend.push(&repository, &push, &cancel).await.unwrap();
    assert_eq!(second, SyncOutcome::UpToDate);
}

#[tokio::test]
async fn test_library_engine_round_trip() {
    stage_and_push(&LibraryEngine::new()).await;
}

#[tokio::test]
async fn test_binary_engine_round_trip() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    stage_and_push(&BinaryEngine::new(GitCli::new())).await;
}

#[tokio::test]
async fn test_library_engine_fetch() {
    fetch_skips_pull_requests(&LibraryEngine::new()).await;
}

#[tokio::test]
async fn test_binary_engine_fetch() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    fetch_skips_pull_requests(&BinaryEngine::new(GitCli::new())).await;
}

#[tokio::test]
async fn test_library_engine_pull() {
    pull_scenarios(&LibraryEngine::new()).await;
}

#[tokio::test]
async fn test_binary_engine_pull() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    pull_scenarios(&BinaryEngine::new(GitCli::new())).await;
}

#[tokio::test]
async fn test_clone_of_missing_repository_fails() {
    let work = TempDir::new().unwrap();
    let missing = work.path().join("missing");
    let url = missing.to_string_lossy().into_owned();
    let project = ProjectInfo::new("missing", url.clone(), url.clone(), ProviderType::GitLab);
    let option = CloneOption::new(url, work.path().join("staging"), AuthConfig::default()).with_bare(true);

    let error = LibraryEngine::new()
        .clone_repository(&option, Arc::new(project), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, SyncError::Clone { .. }));
}
