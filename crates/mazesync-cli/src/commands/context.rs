use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use episode_sync_config::{Config, CredentialStore, PathManager};
use episode_sync_core::{PulledEpisodes, SyncEngine};
use episode_sync_sources::{KodiLibrary, TvMazeClient};
use std::sync::Arc;

/// Process-wide state built once per command
pub struct AppContext {
    pub paths: PathManager,
    pub config: Config,
    pub credentials: CredentialStore,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let paths = PathManager::default();

        let config_file = paths.config_file();
        let config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
        config
            .validate()
            .map_err(|e| eyre!("Configuration validation failed: {}", e))?;

        let credentials_file = paths.credentials_file();
        let mut credentials = CredentialStore::new(credentials_file.clone());
        credentials.load().map_err(|e| {
            eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e)
        })?;

        tracing::debug!(
            config_file = %config_file.display(),
            authorized = credentials.get_credentials().is_some(),
            "Loaded application context"
        );

        Ok(Self {
            paths,
            config,
            credentials,
        })
    }

    /// TVmaze client carrying the stored credentials, if any
    pub fn remote(&self) -> Result<TvMazeClient> {
        let client = TvMazeClient::new(&self.config.tvmaze).wrap_err("Failed to create TVmaze client")?;
        Ok(client.with_credentials(self.credentials.get_credentials()))
    }

    pub fn library(&self) -> Result<KodiLibrary> {
        KodiLibrary::new(&self.config.kodi).wrap_err("Failed to create Kodi client")
    }

    pub fn ledger(&self) -> Result<PulledEpisodes> {
        let path = self.paths.ledger_file();
        PulledEpisodes::open(path.clone(), self.config.sync.debounce_window())
            .wrap_err_with(|| format!("Failed to open ledger at {}", path.display()))
    }

    pub fn engine(&self) -> Result<SyncEngine> {
        Ok(SyncEngine::new(
            Arc::new(self.library()?),
            Arc::new(self.remote()?),
            self.ledger()?,
        ))
    }
}
