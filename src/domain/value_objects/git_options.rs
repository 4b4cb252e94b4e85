use std::path::{Path, PathBuf};

use crate::domain::entities::sync_config::AuthConfig;

/// Ref specs pushed when mirroring a repository: every branch and tag.
pub const MIRROR_PUSH_REFSPECS: [&str; 2] = ["refs/heads/*:refs/heads/*", "refs/tags/*:refs/tags/*"];

/// Ref specs used by `Fetch`: every ref except pull request heads.
pub const FETCH_REFSPECS: [&str; 2] = ["refs/*:refs/*", "^refs/pull/*"];

/// Result of a pull or push that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Refs were transferred
    Updated,
    /// Nothing to integrate; the target already had every ref
    UpToDate,
}

impl SyncOutcome {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, SyncOutcome::UpToDate)
    }
}

/// Options for materializing a remote repository locally.
#[derive(Debug, Clone)]
pub struct CloneOption {
    /// Clone URL (HTTPS or SSH form)
    pub url: String,
    /// Local destination
    pub path: PathBuf,
    /// Credentials for the source
    pub auth: AuthConfig,
    /// Create a bare repository without a working tree
    pub bare: bool,
    /// Fetch every ref (`+refs/*:refs/*`) instead of branches only
    pub mirror: bool,
}

impl CloneOption {
    pub fn new(url: impl Into<String>, path: impl AsRef<Path>, auth: AuthConfig) -> Self {
        Self {
            url: url.into(),
            path: path.as_ref().to_path_buf(),
            auth,
            bare: false,
            mirror: false,
        }
    }

    pub fn with_bare(mut self, bare: bool) -> Self {
        self.bare = bare;
        self
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

/// Options for integrating upstream changes into an existing working copy.
#[derive(Debug, Clone)]
pub struct PullOption {
    /// Remote to pull from
    pub remote: String,
    /// Credentials for the remote
    pub auth: AuthConfig,
    /// Drop remote-tracking refs that vanished upstream
    pub prune: bool,
    /// Allow non fast-forward updates of remote-tracking refs
    pub force: bool,
}

impl PullOption {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            remote: "origin".to_string(),
            auth,
            prune: true,
            force: false,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Options for writing a repository's refs to a destination.
#[derive(Debug, Clone)]
pub struct PushOption {
    /// Destination URL, local repository path or archive path
    pub target: String,
    /// Credentials for the destination
    pub auth: AuthConfig,
    /// Ref specs to push, without the leading `+`
    pub ref_specs: Vec<String>,
    /// Overwrite diverged refs on the destination
    pub force: bool,
    /// Delete destination refs that no longer exist locally
    pub prune: bool,
    /// Push every branch and tag
    pub mirror: bool,
}

impl PushOption {
    pub fn new(target: impl Into<String>, auth: AuthConfig) -> Self {
        Self {
            target: target.into(),
            auth,
            ref_specs: MIRROR_PUSH_REFSPECS.iter().map(|s| s.to_string()).collect(),
            force: false,
            prune: false,
            mirror: true,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_ref_specs(mut self, ref_specs: Vec<String>) -> Self {
        self.ref_specs = ref_specs;
        self
    }

    /// Ref specs as handed to git, `+`-prefixed when forcing.
    pub fn effective_ref_specs(&self) -> Vec<String> {
        self.ref_specs
            .iter()
            .map(|spec| {
                let spec = spec.trim_start_matches('+');
                if self.force {
                    format!("+{}", spec)
                } else {
                    spec.to_string()
                }
            })
            .collect()
    }
}
