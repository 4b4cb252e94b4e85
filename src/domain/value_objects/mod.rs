pub mod git_options;
pub mod protocol;
pub mod provider_type;
pub mod repo_name;
pub mod visibility;

pub use git_options::{CloneOption, PullOption, PushOption, SyncOutcome};
pub use protocol::Protocol;
pub use provider_type::ProviderType;
