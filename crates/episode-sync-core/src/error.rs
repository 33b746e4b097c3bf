use episode_sync_models::ExternalId;
use episode_sync_sources::{LibraryError, RemoteError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Show {show_id} has no supported external id: {unique_ids:?}")]
    NoSupportedId {
        show_id: i64,
        unique_ids: HashMap<String, String>,
    },
    #[error("Show {show_id} ({external}) not found on TVmaze: {source}")]
    NotFound {
        show_id: i64,
        external: ExternalId,
        #[source]
        source: RemoteError,
    },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Not authorized on TVmaze, run `mazesync authorize` first")]
    NotAuthorized,
    #[error("Media library has no TV shows")]
    EmptyLibrary,
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Ledger directory error: {0}")]
    Io(#[from] std::io::Error),
}
