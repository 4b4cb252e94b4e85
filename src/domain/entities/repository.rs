use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::project::ProjectInfo;

/// Remote carrying the source's location.
pub const ORIGIN: &str = "origin";

/// Alias kept identical to `origin` so provenance survives a mirror hop.
pub const GPS_UPSTREAM: &str = "gpsupstream";

/// A named remote of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
    /// Fetches every ref (`+refs/*:refs/*`)
    pub mirror: bool,
}

impl Remote {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            mirror: false,
        }
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

/// A local copy of a source project produced by a clone.
///
/// The handle only records where the copy lives; engines open the
/// underlying git repository on demand.
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
    bare: bool,
    project: Arc<ProjectInfo>,
}

impl Repository {
    pub fn new(path: impl AsRef<Path>, bare: bool, project: Arc<ProjectInfo>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            bare,
            project,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_bare(&self) -> bool {
        self.bare
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn project_arc(&self) -> Arc<ProjectInfo> {
        Arc::clone(&self.project)
    }
}
