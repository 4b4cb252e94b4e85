//! Destinations a staged repository can be written to.
//!
//! - [`GitRemoteWriter`]: pushes to a hosted git remote
//! - [`DirectoryWriter`]: keeps a working copy per project under a directory
//! - [`ArchiveWriter`]: writes a timestamped `.tar.gz` per run

pub mod archive;
pub mod directory;
pub mod from_scratch;
pub mod git_remote;
pub mod writer;

pub use archive::{archive_file_name, write_archive, ArchiveWriter};
pub use directory::DirectoryWriter;
pub use from_scratch::from_scratch;
pub use git_remote::GitRemoteWriter;
pub use writer::TargetWriter;
