pub mod mirror_repository;
pub mod sync_run;

pub use mirror_repository::{MirrorOrchestrator, MirrorOutcome, RunOptions};
pub use sync_run::{RunSummary, SyncRun};
