pub mod engine;

pub use engine::{ContentSyncEngine, InstallOutcome, ProgressSink, SyncAction, SyncProgress};
