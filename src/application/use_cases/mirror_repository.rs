use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::error::SyncError;
use crate::common::result::{OptionExt, SyncResult};
use crate::domain::entities::project::ProjectInfo;
use crate::domain::entities::repository::Repository;
use crate::domain::entities::run_metainfo::SyncRunMetainfo;
use crate::domain::entities::sync_config::{MirrorConfig, ProviderConfig};
use crate::domain::value_objects::git_options::{PushOption, SyncOutcome};
use crate::domain::value_objects::protocol::Protocol;
use crate::domain::value_objects::provider_type::ProviderType;
use crate::domain::value_objects::repo_name::is_valid_name_for;
use crate::domain::value_objects::visibility::map_visibility;
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::git::remote::RemoteManager;
use crate::infrastructure::provider::client::{CreateProjectOptions, ProviderClient};
use crate::infrastructure::provider::factory::ProviderFactory;
use crate::infrastructure::target::archive::{archive_file_name, ArchiveWriter};
use crate::infrastructure::target::directory::DirectoryWriter;
use crate::infrastructure::target::git_remote::GitRemoteWriter;
use crate::infrastructure::target::writer::TargetWriter;

/// Run-wide switches from the command line.
///
/// They combine with the per-target settings: a policy is active when
/// either side enables it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub force_push: bool,
    pub ignore_invalid_name: bool,
    pub ascii_name: bool,
    /// List projects without cloning or writing anything
    pub dry_run: bool,
}

impl RunOptions {
    pub fn with_force_push(mut self, force_push: bool) -> Self {
        self.force_push = force_push;
        self
    }

    pub fn with_ignore_invalid_name(mut self, ignore: bool) -> Self {
        self.ignore_invalid_name = ignore;
        self
    }

    pub fn with_ascii_name(mut self, ascii_name: bool) -> Self {
        self.ascii_name = ascii_name;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// How one (repository, target) pair ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Mirrored,
    UpToDate,
    SkippedInvalidName,
}

/// Description of a created project.
///
/// A configured prefix replaces the generated provenance note. Line breaks
/// are removed since providers reject multi-line descriptions.
pub fn build_description(prefix: Option<&str>, upstream_url: &str, original: &str) -> String {
    let lead = match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => prefix.to_string(),
        None => format!("cloned this from: {}: ", upstream_url),
    };
    format!("{}{}", lead, original)
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect()
}

/// Clone URL of `owner/name` on a hosted target.
///
/// Credentials are never part of the URL; engines attach them per call.
pub fn destination_url(protocol: Protocol, domain: &str, owner: &str, name: &str) -> String {
    match protocol {
        Protocol::Ssh => format!("git@{}:{}/{}.git", domain, owner, name),
        Protocol::Tls => format!("https://{}/{}/{}.git", domain, owner, name),
    }
}

/// Push pipeline for one source repository and one mirror target.
pub struct MirrorOrchestrator {
    backend: Arc<dyn GitBackend>,
    providers: Arc<dyn ProviderFactory>,
    /// Source the repositories were cloned from; directory targets pull from it
    source: ProviderConfig,
}

impl MirrorOrchestrator {
    pub fn new(
        backend: Arc<dyn GitBackend>,
        providers: Arc<dyn ProviderFactory>,
        source: ProviderConfig,
    ) -> Self {
        Self {
            backend,
            providers,
            source,
        }
    }

    /// Mirror `repository` to `mirror`.
    ///
    /// Invalid names abort unless ignored by policy, in which case they are
    /// recorded under the `invalid` bucket. A target that already has every
    /// ref is recorded under `uptodate` and still counts as processed.
    pub async fn push(
        &self,
        repository: &Repository,
        mirror: &MirrorConfig,
        options: &RunOptions,
        meta: &mut SyncRunMetainfo,
        cancel: &CancellationToken,
    ) -> SyncResult<MirrorOutcome> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let project = repository.project();
        let settings = &mirror.settings;
        let ascii = options.ascii_name || settings.ascii_name;
        let name = project.name(ascii).to_string();
        let target_type = mirror.provider_type();

        let client = if target_type.is_remote() {
            Some(self.providers.create(&mirror.provider)?)
        } else {
            None
        };

        let valid = match &client {
            Some(client) => client.is_valid_name(&name),
            None => is_valid_name_for(target_type, &name),
        };
        if !valid {
            if options.ignore_invalid_name || settings.ignore_invalid_name {
                warn!(name = %name, target = %target_type, "Skipping invalid repository name");
                meta.record_invalid(&name);
                return Ok(MirrorOutcome::SkippedInvalidName);
            }
            return Err(SyncError::invalid_repository_name(name, target_type.to_string()));
        }

        let mut force = options.force_push || settings.force_push;
        let mut project_id = None;

        if let Some(client) = &client {
            let owner = &mirror.provider.owner;
            let (exists, id) = client.project_exists(owner, &name).await?;
            project_id = id;

            if !exists {
                let id = self
                    .create_project(client.as_ref(), repository, mirror, &name)
                    .await?;
                project_id = Some(id);
                force = true;
            }
        }

        let protected_id = match (&client, settings.disable_protection) {
            (Some(client), true) => {
                let id = project_id
                    .clone()
                    .unwrap_or_else(|| format!("{}/{}", mirror.provider.owner, name));
                client
                    .unprotect(&mirror.provider.owner, &project.default_branch, &id)
                    .await?;
                Some(id)
            }
            _ => None,
        };

        let written = self
            .write(repository, mirror, &name, force, cancel)
            .await;

        if let (Some(client), Some(id)) = (&client, &protected_id) {
            let reprotected = client
                .protect(&mirror.provider.owner, &project.default_branch, id)
                .await;
            match (&written, reprotected) {
                (Ok(_), Err(e)) => return Err(e),
                (Err(_), Err(e)) => {
                    warn!(name = %name, error = %e, "Could not restore branch protection")
                }
                (_, Ok(())) => {}
            }
        }

        let outcome = written?;
        if outcome.is_up_to_date() {
            debug!(name = %name, target = %target_type, "Target already up to date");
            meta.record_up_to_date(&name);
        }

        if let Some(client) = &client {
            client
                .set_default_branch(&mirror.provider.owner, &name, &project.default_branch)
                .await?;
        }

        meta.increment_total();
        info!(name = %name, target = %target_type, force, "Mirrored repository");

        Ok(match outcome {
            SyncOutcome::Updated => MirrorOutcome::Mirrored,
            SyncOutcome::UpToDate => MirrorOutcome::UpToDate,
        })
    }

    async fn create_project(
        &self,
        client: &dyn ProviderClient,
        repository: &Repository,
        mirror: &MirrorConfig,
        name: &str,
    ) -> SyncResult<String> {
        let project = repository.project();
        let upstream = RemoteManager::upstream_url(repository)?;

        let description = build_description(
            mirror.settings.description_prefix.as_deref(),
            &upstream,
            &project.description,
        );
        let visibility = match &mirror.settings.visibility {
            Some(visibility) => visibility.clone(),
            None => map_visibility(project.provider_type, mirror.provider_type(), &project.visibility)?,
        };

        let options = CreateProjectOptions {
            owner: mirror.provider.owner.clone(),
            owner_type: mirror.provider.owner_type,
            name: name.to_string(),
            description,
            visibility,
            default_branch: project.default_branch.clone(),
        };
        let id = client.create_project(&options).await?;
        info!(
            owner = %options.owner,
            name,
            visibility = %options.visibility,
            "Created project on target"
        );
        Ok(id)
    }

    async fn write(
        &self,
        repository: &Repository,
        mirror: &MirrorConfig,
        name: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let (target, writer) = self.resolve(repository.project(), mirror, name)?;
        let option = PushOption::new(target, mirror.provider.auth.clone())
            .with_force(force)
            .with_prune(force);
        writer.push(repository, &option, cancel).await
    }

    /// Destination string and writer for the target kind.
    fn resolve(
        &self,
        project: &ProjectInfo,
        mirror: &MirrorConfig,
        name: &str,
    ) -> SyncResult<(String, Box<dyn TargetWriter>)> {
        let provider = &mirror.provider;
        match provider.provider_type {
            ProviderType::Archive => {
                let directory = local_directory(provider)?;
                let path = directory.join(archive_file_name(name, Local::now()));
                Ok((
                    path.to_string_lossy().into_owned(),
                    Box::new(ArchiveWriter::new(self.backend.clone())),
                ))
            }
            ProviderType::Directory => {
                let directory = local_directory(provider)?;
                Ok((
                    directory.to_string_lossy().into_owned(),
                    Box::new(DirectoryWriter::new(
                        self.backend.clone(),
                        self.source.clone(),
                        name,
                    )),
                ))
            }
            ProviderType::GitHub | ProviderType::GitLab | ProviderType::Gitea => {
                let protocol = provider.auth.protocol()?;
                let url = destination_url(protocol, &provider.domain, &provider.owner, name);
                debug!(project = %project.original_name, url = %url, "Resolved remote destination");
                Ok((url, Box::new(GitRemoteWriter::new(self.backend.clone()))))
            }
        }
    }
}

fn local_directory(provider: &ProviderConfig) -> SyncResult<PathBuf> {
    provider
        .directory
        .clone()
        .ok_or_config_error(format!("'{}' target has no directory", provider.provider_type))
}
