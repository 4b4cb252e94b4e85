use async_trait::async_trait;
use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use git2::Repository as Git2Repository;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::entities::repository::Repository;
use crate::domain::value_objects::git_options::{PushOption, SyncOutcome};
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::target::from_scratch::from_scratch;
use crate::infrastructure::target::writer::TargetWriter;

/// `<name>_<YYYYMMDD>_<HHMMSS>_<unix millis>.tar.gz`
pub fn archive_file_name(name: &str, at: DateTime<Local>) -> String {
    format!(
        "{}_{}_{}.tar.gz",
        name,
        at.format("%Y%m%d_%H%M%S"),
        at.timestamp_millis()
    )
}

/// Writes a timestamped `.tar.gz` snapshot of a working copy.
pub struct ArchiveWriter {
    backend: Arc<dyn GitBackend>,
}

impl ArchiveWriter {
    pub fn new(backend: Arc<dyn GitBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TargetWriter for ArchiveWriter {
    async fn push(
        &self,
        repository: &Repository,
        option: &PushOption,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let archive_path = PathBuf::from(&option.target);
        if !has_branches_or_tags(repository.path())? {
            return Err(SyncError::NoFilesToArchive {
                path: repository.path().to_path_buf(),
            });
        }

        if let Some(parent) = archive_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let staging = tempfile::Builder::new()
            .prefix("gps-archive-")
            .tempdir()
            .map_err(|e| SyncError::io_error_with_source("Failed to create staging directory", None, e))?;
        let work = staging.path().join("repository");

        from_scratch(self.backend.as_ref(), repository, &work, option, cancel).await?;

        let target = archive_path.clone();
        let entries = tokio::task::spawn_blocking(move || write_archive(&work, &target))
            .await
            .map_err(|e| SyncError::internal_error(format!("archive task failed: {}", e)))??;

        staging
            .close()
            .map_err(|e| SyncError::io_error_with_source("Failed to remove staging directory", None, e))?;

        info!(archive = %archive_path.display(), entries, "Archive written");
        Ok(SyncOutcome::Updated)
    }
}

/// Whether the repository at `path` holds any branch or tag.
fn has_branches_or_tags(path: &Path) -> SyncResult<bool> {
    let repo = Git2Repository::open(path).map_err(|e| SyncError::workspace_open(path, e))?;
    for glob in ["refs/heads/*", "refs/tags/*"] {
        if repo.references_glob(glob)?.next().is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Pack everything below `source_dir` into a gzip compressed tar at
/// `archive_path` and return the number of entries written.
///
/// Fails without creating the archive when the tree holds nothing but its
/// root.
pub fn write_archive(source_dir: &Path, archive_path: &Path) -> SyncResult<usize> {
    let entries: Vec<walkdir::DirEntry> = WalkDir::new(source_dir)
        .follow_links(false)
        .into_iter()
        .collect::<Result<_, _>>()
        .map_err(|e| SyncError::internal_error(format!("failed to walk {}: {}", source_dir.display(), e)))?;

    if entries.len() < 2 {
        return Err(SyncError::NoFilesToArchive {
            path: source_dir.to_path_buf(),
        });
    }

    let io_error = |message: &str, e: std::io::Error| {
        SyncError::io_error_with_source(message, Some(archive_path.to_path_buf()), e)
    };

    let file = File::create(archive_path).map_err(|e| io_error("Failed to create archive", e))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let mut written = 0;
    for entry in entries.iter().skip(1) {
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| SyncError::internal_error(e.to_string()))?;
        if entry.file_type().is_dir() {
            builder
                .append_dir(relative, entry.path())
                .map_err(|e| io_error("Failed to add directory to archive", e))?;
        } else {
            builder
                .append_path_with_name(entry.path(), relative)
                .map_err(|e| io_error("Failed to add file to archive", e))?;
        }
        written += 1;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| io_error("Failed to finish tar archive", e))?;
    encoder
        .finish()
        .map_err(|e| io_error("Failed to finish gzip compression", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(archive_path, std::fs::Permissions::from_mode(0o644))
            .map_err(|e| io_error("Failed to set archive permissions", e))?;
    }

    debug!(archive = %archive_path.display(), written, "Packed archive");
    Ok(written)
}
