//! Push pipeline against a mocked provider and git backend.

mod common;

use common::mock_services::{MockProvider, MockProviderFactory, RecordingBackend};
use common::test_fixtures::{gitlab_source, github_mirror, staged_repository, UPSTREAM_URL};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use git_provider_sync::application::use_cases::mirror_repository::{
    MirrorOrchestrator, MirrorOutcome, RunOptions,
};
use git_provider_sync::common::error::SyncError;
use git_provider_sync::domain::entities::run_metainfo::SyncRunMetainfo;
use git_provider_sync::domain::entities::sync_config::MirrorSettings;
use git_provider_sync::domain::value_objects::git_options::SyncOutcome;

fn orchestrator(provider: &MockProvider, backend: &RecordingBackend) -> MirrorOrchestrator {
    MirrorOrchestrator::new(
        Arc::new(backend.clone()),
        Arc::new(MockProviderFactory::new(provider.clone())),
        gitlab_source(),
    )
}

#[tokio::test]
async fn test_absent_project_is_created_once_and_force_pushed() {
    let provider = MockProvider::new();
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("demo");
    let mirror = github_mirror(MirrorSettings::default());
    let mut meta = SyncRunMetainfo::new();
    let cancel = CancellationToken::new();

    let outcome = orchestrator(&provider, &backend)
        .push(&repository, &mirror, &RunOptions::default(), &mut meta, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, MirrorOutcome::Mirrored);
    assert_eq!(provider.calls_to("create_project"), vec!["create_project(acme-mirror/demo)"]);

    let pushes = backend.pushes();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].force, "push after creation must be forced");
    assert_eq!(pushes[0].target, "https://github.com/acme-mirror/demo.git");
    assert_eq!(pushes[0].auth.token.as_deref(), Some("target-token"));

    // The project exists now: no second creation and no implicit force.
    orchestrator(&provider, &backend)
        .push(&repository, &mirror, &RunOptions::default(), &mut meta, &cancel)
        .await
        .unwrap();
    assert_eq!(provider.calls_to("create_project").len(), 1);
    assert!(!backend.pushes()[1].force);
    assert_eq!(meta.total, 2);
}

#[tokio::test]
async fn test_created_project_metadata() {
    let provider = MockProvider::new();
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("demo");
    let mut meta = SyncRunMetainfo::new();

    orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(MirrorSettings::default()),
            &RunOptions::default(),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let created = provider.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].visibility, "private");
    assert_eq!(
        created[0].description,
        format!("cloned this from: {}: Demo project", UPSTREAM_URL)
    );
    assert_eq!(created[0].default_branch, "main");
}

#[tokio::test]
async fn test_visibility_override_and_description_prefix() {
    let provider = MockProvider::new();
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("demo");
    let settings = MirrorSettings {
        visibility: Some("public".to_string()),
        description_prefix: Some("[mirror] ".to_string()),
        ..MirrorSettings::default()
    };
    let mut meta = SyncRunMetainfo::new();

    orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(settings),
            &RunOptions::default(),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let created = provider.created();
    assert_eq!(created[0].visibility, "public");
    assert_eq!(created[0].description, "[mirror] Demo project");
}

#[tokio::test]
async fn test_up_to_date_is_recorded_not_failed() {
    let provider = MockProvider::new();
    provider.add_existing("acme-mirror", "demo");
    let backend = RecordingBackend::new();
    backend.set_outcome(SyncOutcome::UpToDate);
    let (_dir, repository) = staged_repository("demo");
    let mut meta = SyncRunMetainfo::new();

    let outcome = orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(MirrorSettings::default()),
            &RunOptions::default(),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, MirrorOutcome::UpToDate);
    assert_eq!(meta.up_to_date(), ["demo".to_string()]);
    assert_eq!(meta.total, 1);
    assert_eq!(
        provider.calls_to("set_default_branch"),
        vec!["set_default_branch(acme-mirror/demo:main)"]
    );
}

#[tokio::test]
async fn test_invalid_name_aborts_by_default() {
    let provider = MockProvider::new();
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("Repo One!");
    let mut meta = SyncRunMetainfo::new();

    let error = orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(MirrorSettings::default()),
            &RunOptions::default(),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, SyncError::InvalidRepositoryName { .. }));
    assert!(backend.pushes().is_empty());
    assert!(provider.calls_to("project_exists").is_empty());
}

#[tokio::test]
async fn test_invalid_name_is_skipped_when_ignored() {
    let provider = MockProvider::new();
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("Repo One!");
    let mut meta = SyncRunMetainfo::new();
    let options = RunOptions::default().with_ignore_invalid_name(true);

    let outcome = orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(MirrorSettings::default()),
            &options,
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, MirrorOutcome::SkippedInvalidName);
    assert_eq!(meta.invalid(), ["Repo One!".to_string()]);
    assert_eq!(meta.total, 0);
    assert!(backend.pushes().is_empty());
}

#[tokio::test]
async fn test_ascii_name_is_used_in_target_url() {
    let provider = MockProvider::new();
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("Repo One!");
    let settings = MirrorSettings {
        ascii_name: true,
        ..MirrorSettings::default()
    };
    let mut meta = SyncRunMetainfo::new();

    orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(settings),
            &RunOptions::default(),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(repository.project().clean_name(), Some("Repo-One"));
    assert_eq!(
        backend.pushes()[0].target,
        "https://github.com/acme-mirror/Repo-One.git"
    );
    assert_eq!(provider.created()[0].name, "Repo-One");
}

#[tokio::test]
async fn test_protection_brackets_the_write() {
    let provider = MockProvider::new();
    provider.add_existing("acme-mirror", "demo");
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("demo");
    let settings = MirrorSettings {
        disable_protection: true,
        ..MirrorSettings::default()
    };
    let mut meta = SyncRunMetainfo::new();

    orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(settings),
            &RunOptions::default(),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        provider.get_call_history(),
        vec![
            "project_exists(acme-mirror/demo)",
            "unprotect(acme-mirror/demo:main)",
            "protect(acme-mirror/demo:main)",
            "set_default_branch(acme-mirror/demo:main)",
        ]
    );
    assert_eq!(backend.pushes().len(), 1);
}

#[tokio::test]
async fn test_run_wide_force_push() {
    let provider = MockProvider::new();
    provider.add_existing("acme-mirror", "demo");
    let backend = RecordingBackend::new();
    let (_dir, repository) = staged_repository("demo");
    let mut meta = SyncRunMetainfo::new();

    orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(MirrorSettings::default()),
            &RunOptions::default().with_force_push(true),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(backend.pushes()[0].force);
    assert!(provider.calls_to("create_project").is_empty());
}

#[tokio::test]
async fn test_missing_upstream_blocks_creation() {
    let provider = MockProvider::new();
    let backend = RecordingBackend::new();
    let dir = tempfile::TempDir::new().unwrap();
    git2::Repository::init_bare(dir.path()).unwrap();
    let repository = git_provider_sync::domain::entities::repository::Repository::new(
        dir.path(),
        true,
        Arc::new(common::test_fixtures::project("demo")),
    );
    let mut meta = SyncRunMetainfo::new();

    let error = orchestrator(&provider, &backend)
        .push(
            &repository,
            &github_mirror(MirrorSettings::default()),
            &RunOptions::default(),
            &mut meta,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, SyncError::RemoteCreation { .. }));
    assert!(provider.created().is_empty());
    assert!(backend.pushes().is_empty());
}
