use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::common::result::SyncResult;
use crate::domain::entities::sync_config::{GitConfig, GitEngine};
use crate::infrastructure::git::backend::GitBackend;
use crate::infrastructure::git::binary_engine::BinaryEngine;
use crate::infrastructure::git::library_engine::LibraryEngine;

/// Build the engine selected in configuration.
///
/// The binary engine is only returned once `git --version` succeeds.
pub async fn create_backend(
    config: &GitConfig,
    cancel: &CancellationToken,
) -> SyncResult<Arc<dyn GitBackend>> {
    match config.engine {
        GitEngine::Library => {
            info!("Using libgit2 engine");
            Ok(Arc::new(LibraryEngine::new()))
        }
        GitEngine::Binary => {
            let engine = BinaryEngine::from_config(config);
            let version = engine.cli().check_availability(cancel).await?;
            info!(version = %version, "Using git executable");
            Ok(Arc::new(engine))
        }
    }
}
