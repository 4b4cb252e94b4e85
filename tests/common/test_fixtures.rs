//! Test fixtures for creating test data
//!
//! Real git repositories in temporary directories and ready-made mirror
//! configurations.

use git2::{build::CheckoutBuilder, Oid, Repository as Git2Repository, Signature};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use git_provider_sync::domain::entities::project::ProjectInfo;
use git_provider_sync::domain::entities::repository::Repository;
use git_provider_sync::domain::entities::sync_config::{
    AuthConfig, MirrorConfig, MirrorSettings, ProviderConfig,
};
use git_provider_sync::domain::value_objects::provider_type::ProviderType;
use git_provider_sync::infrastructure::git::remote::RemoteManager;

pub const UPSTREAM_URL: &str = "https://gitlab.com/acme/demo.git";

/// Commit `file` with `content` onto `refname` of a non-bare repository.
pub fn commit_file(repo: &Git2Repository, refname: &str, file: &str, content: &str) -> Oid {
    let workdir = repo.workdir().expect("non-bare repository");
    std::fs::write(workdir.join(file), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("Test", "test@example.com").unwrap();
    let parents: Vec<git2::Commit> = repo
        .find_reference(refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(Some(refname), &signature, &signature, file, &tree, &parent_refs)
        .unwrap()
}

/// Upstream repository with `README.md` on `main` and a `dev` branch.
pub fn upstream_repo() -> (TempDir, Git2Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Git2Repository::init(dir.path()).unwrap();
    commit_file(&repo, "refs/heads/main", "README.md", "hello");
    repo.set_head("refs/heads/main").unwrap();
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout)).unwrap();

    {
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch("dev", &head, false).unwrap();
    }
    (dir, repo)
}

pub fn project(name: &str) -> ProjectInfo {
    ProjectInfo::new(
        name,
        UPSTREAM_URL,
        "git@gitlab.com:acme/demo.git",
        ProviderType::GitLab,
    )
    .with_description("Demo project")
    .with_visibility("internal")
}

/// Bare staging repository whose `origin` and `gpsupstream` point at
/// [`UPSTREAM_URL`]; it holds no commits.
pub fn staged_repository(name: &str) -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Git2Repository::init_bare(dir.path()).unwrap();
    repo.remote("origin", UPSTREAM_URL).unwrap();

    let repository = Repository::new(dir.path(), true, Arc::new(project(name)));
    RemoteManager::set_gps_upstream_remote_from_origin(&repository).unwrap();
    (dir, repository)
}

pub fn gitlab_source() -> ProviderConfig {
    ProviderConfig::new(ProviderType::GitLab, "gitlab.com", "acme")
        .with_auth(AuthConfig::with_token("source-token"))
}

pub fn github_mirror(settings: MirrorSettings) -> MirrorConfig {
    MirrorConfig::new(
        ProviderConfig::new(ProviderType::GitHub, "github.com", "acme-mirror")
            .with_auth(AuthConfig::with_token("target-token")),
    )
    .with_settings(settings)
}

pub fn local_mirror(provider_type: ProviderType, directory: &Path, settings: MirrorSettings) -> MirrorConfig {
    MirrorConfig::new(ProviderConfig::local(provider_type, directory)).with_settings(settings)
}
