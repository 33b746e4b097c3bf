pub mod credentials;
pub mod episode;
pub mod provider;
pub mod show;

pub use credentials::Credentials;
pub use episode::{EpisodeChange, EpisodeRecord, RemoteEpisodeUpdate, StatusType, WatchlistEpisode};
pub use provider::{ExternalId, Provider, ShowIdentity};
pub use show::TvShow;
