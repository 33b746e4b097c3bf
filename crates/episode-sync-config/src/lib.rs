pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, KodiConfig, SyncOptions, TvMazeConfig, WatchConfig};
pub use credentials::CredentialStore;
pub use paths::{base_path_override, PathManager, BASE_PATH_ENV};
