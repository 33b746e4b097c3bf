pub mod auth;
pub mod error;
pub mod ledger;
pub mod projector;
pub mod resolver;
pub mod sync;
pub mod watch;

#[cfg(test)]
mod testing;

pub use auth::{AuthOutcome, AuthorizationFlow, PendingConfirmation, PollEvent, DEFAULT_POLL_INTERVAL};
pub use error::{AuthError, LedgerError, ResolveError, SyncError};
pub use ledger::PulledEpisodes;
pub use projector::{project, project_now};
pub use resolver::{preferred_external_id, IdentityResolver};
pub use sync::{ChangeOutcome, NoProgress, ProgressSink, SyncEngine, SyncReport, SyncStatus};
pub use watch::{WatchEvent, WatchService};
