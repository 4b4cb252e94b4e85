/// Infrastructure layer modules
///
/// This layer provides concrete implementations for external system interactions:
/// - Git operations through libgit2 or the git executable
/// - Target writers for remotes, directories and archives
/// - Hosting provider REST clients
/// - Configuration files and process execution
pub mod filesystem;
pub mod git;
pub mod process;
pub mod provider;
pub mod target;

pub use filesystem::ConfigStore;
pub use git::{create_backend, GitBackend, RemoteManager};
pub use process::CommandExecutor;
pub use provider::{ProviderClient, ProviderFactory};
pub use target::TargetWriter;
