use async_trait::async_trait;
use episode_sync_models::{
    EpisodeChange, EpisodeRecord, ExternalId, RemoteEpisodeUpdate, StatusType, TvShow,
    WatchlistEpisode,
};

use crate::error::{LibraryError, RemoteError};
use crate::types::{AuthTicket, EpisodeFilter, PollStatus, RemoteShowInfo, SendOutcome};

/// Request/response contract of the remote tracking service
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// True when account credentials are present
    fn is_authorized(&self) -> bool;

    async fn lookup_show(&self, external: &ExternalId) -> Result<RemoteShowInfo, RemoteError>;

    /// Push one batch of episode statuses for a single show.
    /// Fails fast with `RemoteError::Update` when credentials are missing.
    async fn send_episodes(
        &self,
        updates: &[RemoteEpisodeUpdate],
        show: &ExternalId,
    ) -> Result<SendOutcome, RemoteError>;

    async fn get_watchlist(
        &self,
        remote_show_id: &str,
        status: Option<StatusType>,
    ) -> Result<Vec<WatchlistEpisode>, RemoteError>;

    async fn start_auth(&self, email: &str) -> Result<AuthTicket, RemoteError>;

    async fn poll_auth(&self, token: &str) -> Result<PollStatus, RemoteError>;
}

/// Queryable, mutable local media catalog
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn list_shows(&self) -> Result<Vec<TvShow>, LibraryError>;

    async fn list_episodes(
        &self,
        show_id: i64,
        filter: Option<&EpisodeFilter>,
    ) -> Result<Vec<EpisodeRecord>, LibraryError>;

    async fn recent_episodes(&self) -> Result<Vec<EpisodeRecord>, LibraryError>;

    async fn get_show(&self, show_id: i64) -> Result<TvShow, LibraryError>;

    async fn get_episode(&self, episode_id: i64) -> Result<EpisodeRecord, LibraryError>;

    /// Merge one external id into the show's id map
    async fn set_show_external_id(
        &self,
        show_id: i64,
        namespace: &str,
        value: &str,
    ) -> Result<(), LibraryError>;

    /// Mark an episode watched (playcount 1)
    async fn set_episode_playcount(&self, episode_id: i64) -> Result<(), LibraryError>;
}

/// Feed of playcount changes observed in the catalog
#[async_trait]
pub trait ChangeFeed: Send {
    /// Next change, or `None` when the feed has closed
    async fn next_change(&mut self) -> Result<Option<EpisodeChange>, LibraryError>;
}
