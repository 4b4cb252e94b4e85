pub mod project;
pub mod repository;
pub mod run_metainfo;
pub mod sync_config;

pub use project::ProjectInfo;
pub use repository::{Remote, Repository};
pub use run_metainfo::SyncRunMetainfo;
pub use sync_config::{
    AppConfig, AuthConfig, GitConfig, GitEngine, MirrorConfig, MirrorSettings, OwnerType, ProviderConfig,
    SyncConfig,
};
