pub mod error;
pub mod kodi;
pub mod traits;
pub mod tvmaze;
pub mod types;

pub use error::{LibraryError, RemoteError};
pub use kodi::{KodiLibrary, KodiNotifications};
pub use traits::{ChangeFeed, MediaLibrary, RemoteService};
pub use tvmaze::TvMazeClient;
pub use types::{AuthTicket, EpisodeFilter, PollStatus, RemoteShowInfo, SendOutcome};
