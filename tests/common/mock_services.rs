//! Mock services for testing
//!
//! Hand-written doubles for the provider API and the git backend. Each one
//! records its calls so tests can assert on order and arguments.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use git_provider_sync::common::error::SyncError;
use git_provider_sync::common::result::SyncResult;
use git_provider_sync::domain::entities::project::ProjectInfo;
use git_provider_sync::domain::entities::repository::Repository;
use git_provider_sync::domain::entities::sync_config::{AuthConfig, GitEngine, ProviderConfig};
use git_provider_sync::domain::value_objects::git_options::{
    CloneOption, PullOption, PushOption, SyncOutcome,
};
use git_provider_sync::domain::value_objects::provider_type::ProviderType;
use git_provider_sync::domain::value_objects::repo_name::is_valid_name_for;
use git_provider_sync::infrastructure::git::backend::GitBackend;
use git_provider_sync::infrastructure::provider::client::{CreateProjectOptions, ProviderClient};
use git_provider_sync::infrastructure::provider::factory::ProviderFactory;

/// Mock hosting provider
#[derive(Clone, Default)]
pub struct MockProvider {
    /// `owner/name` of projects that exist on the provider
    existing: Arc<Mutex<HashSet<String>>>,
    /// Projects returned by `list_projects`
    projects: Arc<Mutex<Vec<ProjectInfo>>>,
    /// Every creation request, in order
    created: Arc<Mutex<Vec<CreateProjectOptions>>>,
    /// Call history for verification
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_existing(&self, owner: &str, name: &str) {
        self.existing
            .lock()
            .unwrap()
            .insert(format!("{}/{}", owner, name));
    }

    pub fn set_projects(&self, projects: Vec<ProjectInfo>) {
        *self.projects.lock().unwrap() = projects;
    }

    pub fn created(&self) -> Vec<CreateProjectOptions> {
        self.created.lock().unwrap().clone()
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Calls whose name starts with `method`
    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.get_call_history()
            .into_iter()
            .filter(|call| call.starts_with(&format!("{}(", method)))
            .collect()
    }

    fn record_call(&self, method: &str, arg: &str) {
        self.call_history
            .lock()
            .unwrap()
            .push(format!("{}({})", method, arg));
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn list_projects(&self, config: &ProviderConfig) -> SyncResult<Vec<ProjectInfo>> {
        self.record_call("list_projects", &config.owner);
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn project_exists(&self, owner: &str, name: &str) -> SyncResult<(bool, Option<String>)> {
        let key = format!("{}/{}", owner, name);
        self.record_call("project_exists", &key);
        if self.existing.lock().unwrap().contains(&key) {
            Ok((true, Some(key)))
        } else {
            Ok((false, None))
        }
    }

    async fn create_project(&self, options: &CreateProjectOptions) -> SyncResult<String> {
        let key = format!("{}/{}", options.owner, options.name);
        self.record_call("create_project", &key);
        self.created.lock().unwrap().push(options.clone());
        self.existing.lock().unwrap().insert(key.clone());
        Ok(key)
    }

    async fn set_default_branch(&self, owner: &str, name: &str, branch: &str) -> SyncResult<()> {
        self.record_call("set_default_branch", &format!("{}/{}:{}", owner, name, branch));
        Ok(())
    }

    async fn protect(&self, _owner: &str, branch: &str, id: &str) -> SyncResult<()> {
        self.record_call("protect", &format!("{}:{}", id, branch));
        Ok(())
    }

    async fn unprotect(&self, _owner: &str, branch: &str, id: &str) -> SyncResult<()> {
        self.record_call("unprotect", &format!("{}:{}", id, branch));
        Ok(())
    }

    fn is_valid_name(&self, name: &str) -> bool {
        is_valid_name_for(ProviderType::GitHub, name)
    }
}

/// Factory handing out one shared [`MockProvider`]
pub struct MockProviderFactory {
    pub provider: MockProvider,
}

impl MockProviderFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self { provider }
    }
}

impl ProviderFactory for MockProviderFactory {
    fn create(&self, config: &ProviderConfig) -> SyncResult<Arc<dyn ProviderClient>> {
        if config.provider_type.is_local() {
            return Err(SyncError::provider_error("local targets have no API"));
        }
        Ok(Arc::new(self.provider.clone()))
    }
}

/// One push seen by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPush {
    pub target: String,
    pub force: bool,
    pub auth: AuthConfig,
}

/// Git backend that records pushes and answers with a fixed outcome.
///
/// A clone is an empty bare repository whose `origin` is the clone URL.
#[derive(Clone)]
pub struct RecordingBackend {
    outcome: Arc<Mutex<SyncOutcome>>,
    pushes: Arc<Mutex<Vec<RecordedPush>>>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            outcome: Arc::new(Mutex::new(SyncOutcome::Updated)),
            pushes: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_outcome(&self, outcome: SyncOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn pushes(&self) -> Vec<RecordedPush> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, method: &str, arg: &str) {
        self.call_history
            .lock()
            .unwrap()
            .push(format!("{}({})", method, arg));
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitBackend for RecordingBackend {
    async fn clone_repository(
        &self,
        option: &CloneOption,
        project: Arc<ProjectInfo>,
        _cancel: &CancellationToken,
    ) -> SyncResult<Repository> {
        self.record_call("clone", &option.url);
        let repo = git2::Repository::init_bare(&option.path)
            .map_err(|e| SyncError::workspace_open(&option.path, e))?;
        repo.remote("origin", &option.url)
            .map_err(|e| SyncError::remote_creation("origin", e.message()))?;
        Ok(Repository::new(&option.path, option.bare, project))
    }

    async fn pull(
        &self,
        path: &Path,
        _option: &PullOption,
        _cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        self.record_call("pull", &path.display().to_string());
        Ok(*self.outcome.lock().unwrap())
    }

    async fn push(
        &self,
        _repository: &Repository,
        option: &PushOption,
        _cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        self.record_call("push", &option.target);
        self.pushes.lock().unwrap().push(RecordedPush {
            target: option.target.clone(),
            force: option.force,
            auth: option.auth.clone(),
        });
        Ok(*self.outcome.lock().unwrap())
    }

    async fn fetch(
        &self,
        repository: &Repository,
        _auth: &AuthConfig,
        _cancel: &CancellationToken,
    ) -> SyncResult<()> {
        self.record_call("fetch", &repository.path().display().to_string());
        Ok(())
    }

    async fn init(&self, path: &Path, _bare: bool) -> SyncResult<()> {
        self.record_call("init", &path.display().to_string());
        Ok(())
    }

    fn engine(&self) -> GitEngine {
        GitEngine::Library
    }
}
