//! # git-provider-sync - repository mirroring engine
//!
//! `git-provider-sync` lists the projects of a user or group on a git hosting
//! provider and mirrors each of them to one or more targets: another hosted
//! remote, a directory of working copies, or timestamped `.tar.gz` archives.
//!
//! ## Configuration
//!
//! ```yaml
//! git:
//!   engine: library        # or `binary` to drive the git executable
//! configurations:
//!   - source:
//!       provider_type: gitlab
//!       domain: gitlab.com
//!       owner: acme
//!       owner_type: group
//!       auth:
//!         token_env: GITLAB_TOKEN
//!     mirrors:
//!       github:
//!         provider_type: github
//!         domain: github.com
//!         owner: acme-mirror
//!         auth:
//!           token_env: GITHUB_TOKEN
//!         settings:
//!           ascii_name: true
//!       backup:
//!         provider_type: archive
//!         directory: /var/backups/git
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: projects, repository handles, configuration and run bookkeeping
//! - [`infrastructure`]: the two git engines, remote and branch bookkeeping,
//!   target writers, provider REST clients and configuration loading
//! - [`application`]: the per-target push pipeline and the run loop
//! - [`presentation`]: the command line interface
//! - [`common`]: the [`SyncError`] taxonomy and [`SyncResult`] alias
//!
//! ## Invariants
//!
//! - Every staged repository carries `origin` and a `gpsupstream` alias with
//!   the same URL; the alias is verified after every repair.
//! - "Already up to date" is an outcome, never an error.
//! - Repositories are processed strictly one after another.

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use crate::common::error::SyncError;
pub use crate::common::result::SyncResult;
