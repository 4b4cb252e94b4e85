use regex::Regex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::project::ProjectInfo;
use crate::domain::entities::repository::Repository;
use crate::domain::entities::run_metainfo::SyncRunMetainfo;
use crate::domain::entities::sync_config::{AppConfig, GitConfig, ProviderConfig, SyncConfig};
use crate::domain::value_objects::git_options::CloneOption;
use crate::domain::value_objects::protocol::Protocol;
use crate::domain::value_objects::provider_type::ProviderType;
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::git::remote::RemoteManager;
use crate::infrastructure::provider::factory::ProviderFactory;

use super::mirror_repository::{MirrorOrchestrator, RunOptions};

/// Outcome of one mirror target of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// `owner@domain` of the source
    pub source: String,
    /// Name of the mirror in the configuration
    pub mirror: String,
    pub target: ProviderType,
    /// Projects listed by the source after filtering
    pub listed: usize,
    pub meta: SyncRunMetainfo,
}

/// Keep projects matching `include` and not matching `exclude`.
pub fn filter_projects(
    projects: Vec<ProjectInfo>,
    include: Option<&str>,
    exclude: Option<&str>,
) -> SyncResult<Vec<ProjectInfo>> {
    let compile = |pattern: &str| {
        Regex::new(pattern).map_err(|e| {
            SyncError::config_error_with_source(format!("invalid filter '{}'", pattern), e)
        })
    };
    let include = include.map(compile).transpose()?;
    let exclude = exclude.map(compile).transpose()?;

    Ok(projects
        .into_iter()
        .filter(|project| {
            let name = project.original_name.as_str();
            let included = include.as_ref().map_or(true, |re| re.is_match(name));
            let excluded = exclude.as_ref().map_or(false, |re| re.is_match(name));
            included && !excluded
        })
        .collect())
}

fn source_label(source: &ProviderConfig) -> String {
    format!("{}@{}", source.owner, source.domain)
}

/// The run loop: source, then mirror target, then repository.
pub struct SyncRun {
    backend: Arc<dyn GitBackend>,
    providers: Arc<dyn ProviderFactory>,
}

impl SyncRun {
    pub fn new(backend: Arc<dyn GitBackend>, providers: Arc<dyn ProviderFactory>) -> Self {
        Self { backend, providers }
    }

    /// Process every configured source in order.
    ///
    /// The first error aborts the run; invalid names skipped by policy and
    /// up-to-date targets are only recorded.
    pub async fn execute(
        &self,
        config: &AppConfig,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<RunSummary>> {
        let mut summaries = Vec::new();
        for sync in &config.configurations {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let mut source_summaries = self.execute_source(&config.git, sync, options, cancel).await?;
            summaries.append(&mut source_summaries);
        }
        Ok(summaries)
    }

    async fn execute_source(
        &self,
        git: &GitConfig,
        sync: &SyncConfig,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<RunSummary>> {
        let source = &sync.source;
        let label = source_label(source);

        let client = self.providers.create(source)?;
        let listed = client.list_projects(source).await?;
        let projects = filter_projects(listed, source.include.as_deref(), source.exclude.as_deref())?;
        info!(source = %label, projects = projects.len(), "Listed source projects");

        let ascii = options.ascii_name || sync.mirrors.values().any(|m| m.settings.ascii_name);
        if ascii {
            for project in &projects {
                project.clean();
            }
        }

        let summary = |mirror: &str, target: ProviderType, meta: SyncRunMetainfo| RunSummary {
            source: label.clone(),
            mirror: mirror.to_string(),
            target,
            listed: projects.len(),
            meta,
        };

        if options.dry_run {
            for project in &projects {
                info!(
                    name = %project.original_name,
                    clean_name = project.clean_name().unwrap_or("-"),
                    default_branch = %project.default_branch,
                    visibility = %project.visibility,
                    last_activity = ?project.last_activity_at,
                    "Dry run: would mirror"
                );
            }
            return Ok(sync
                .mirrors
                .iter()
                .map(|(name, mirror)| summary(name, mirror.provider_type(), SyncRunMetainfo::new()))
                .collect());
        }

        let staging = tempfile::Builder::new()
            .prefix("gps-staging-")
            .tempdir()
            .map_err(|e| SyncError::io_error_with_source("Failed to create staging workspace", None, e))?;

        let repositories = self
            .clone_all(git, source, projects.iter().cloned(), staging.path(), cancel)
            .await?;

        let orchestrator = MirrorOrchestrator::new(
            self.backend.clone(),
            self.providers.clone(),
            source.clone(),
        );

        let mut summaries = Vec::new();
        for (mirror_name, mirror) in &sync.mirrors {
            let mut meta = SyncRunMetainfo::new();
            for repository in &repositories {
                if cancel.is_cancelled() {
                    return Err(SyncError::Cancelled);
                }
                let outcome = orchestrator
                    .push(repository, mirror, options, &mut meta, cancel)
                    .await?;
                debug!(
                    mirror = %mirror_name,
                    project = %repository.project().original_name,
                    ?outcome,
                    "Processed repository"
                );
            }
            info!(
                source = %label,
                mirror = %mirror_name,
                total = meta.total,
                up_to_date = meta.up_to_date().len(),
                invalid = meta.invalid().len(),
                "Mirror target finished"
            );
            summaries.push(summary(mirror_name, mirror.provider_type(), meta));
        }

        staging
            .close()
            .map_err(|e| SyncError::io_error_with_source("Failed to remove staging workspace", None, e))?;
        Ok(summaries)
    }

    async fn clone_all(
        &self,
        git: &GitConfig,
        source: &ProviderConfig,
        projects: impl Iterator<Item = ProjectInfo>,
        staging: &std::path::Path,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<Repository>> {
        let ssh = source.auth.protocol()? == Protocol::Ssh;
        let mut repositories = Vec::new();

        for (index, project) in projects.enumerate() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let project = Arc::new(project);
            let path = staging.join(format!("{:04}", index));
            let option = CloneOption::new(project.clone_url(ssh), &path, source.auth.clone())
                .with_bare(git.bare_clone)
                .with_mirror(git.bare_clone);

            let repository = self
                .backend
                .clone_repository(&option, project.clone(), cancel)
                .await?;
            RemoteManager::set_gps_upstream_remote_from_origin(&repository)?;
            debug!(project = %project.original_name, path = %path.display(), "Staged repository");
            repositories.push(repository);
        }
        Ok(repositories)
    }
}
