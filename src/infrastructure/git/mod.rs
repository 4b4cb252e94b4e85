pub mod auth;
pub mod backend;
pub mod backend_factory;
pub mod binary_engine;
pub mod branch_tracker;
pub mod cli;
pub mod library_engine;
pub mod remote;

pub use auth::{AuthMethod, AuthResolver};
pub use backend::GitBackend;
pub use backend_factory::create_backend;
pub use binary_engine::BinaryEngine;
pub use branch_tracker::{BranchTracker, TrackingReport};
pub use cli::GitCli;
pub use library_engine::LibraryEngine;
pub use remote::RemoteManager;
