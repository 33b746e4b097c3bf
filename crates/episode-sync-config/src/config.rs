use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tvmaze: TvMazeConfig,
    #[serde(default)]
    pub kodi: KodiConfig,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeConfig {
    /// Public API (show lookup)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// User API (authorization and scrobbling)
    #[serde(default = "default_user_api_url")]
    pub user_api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KodiConfig {
    /// JSON-RPC over HTTP endpoint
    #[serde(default = "default_kodi_url")]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// JSON-RPC TCP socket used for library notifications
    #[serde(default = "default_kodi_notifications")]
    pub notifications: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// A change to an episode pulled less than this many seconds ago is not pushed back
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,
    /// Delay between authorization confirmation polls
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// Pulled-episode rows older than this are pruned when the watch service starts
    #[serde(default = "default_ledger_retention_days")]
    pub ledger_retention_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_pull_interval_seconds")]
    pub pull_interval_seconds: u64,
    #[serde(default = "default_true")]
    pub pull_on_startup: bool,
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://api.tvmaze.com".to_string()
}

fn default_user_api_url() -> String {
    "https://api.tvmaze.com/v1".to_string()
}

fn default_user_agent() -> String {
    "mazesync scrobbler for tvmaze.com".to_string()
}

fn default_kodi_url() -> String {
    "http://localhost:8080/jsonrpc".to_string()
}

fn default_kodi_notifications() -> String {
    "localhost:9090".to_string()
}

fn default_debounce_seconds() -> u64 {
    10
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_ledger_retention_days() -> u64 {
    30
}

fn default_pull_interval_seconds() -> u64 {
    600
}

impl Default for TvMazeConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_api_url: default_user_api_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for KodiConfig {
    fn default() -> Self {
        Self {
            url: default_kodi_url(),
            username: None,
            password: None,
            notifications: default_kodi_notifications(),
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
            ledger_retention_days: default_ledger_retention_days(),
        }
    }
}

impl SyncOptions {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn ledger_retention(&self) -> Duration {
        Duration::from_secs(self.ledger_retention_days * 24 * 60 * 60)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            pull_interval_seconds: default_pull_interval_seconds(),
            pull_on_startup: default_true(),
        }
    }
}

impl WatchConfig {
    pub fn pull_interval(&self) -> Duration {
        Duration::from_secs(self.pull_interval_seconds)
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("tvmaze.api_url", &self.tvmaze.api_url),
            ("tvmaze.user_api_url", &self.tvmaze.user_api_url),
            ("kodi.url", &self.kodi.url),
        ] {
            Url::parse(value).map_err(|e| anyhow::anyhow!("Invalid {}: {} ({})", name, value, e))?;
        }

        if self.kodi.notifications.trim().is_empty() {
            return Err(anyhow::anyhow!("kodi.notifications address cannot be empty"));
        }
        if self.sync.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("sync.poll_interval_seconds must be greater than zero"));
        }
        if self.sync.debounce_seconds == 0 {
            return Err(anyhow::anyhow!("sync.debounce_seconds must be greater than zero"));
        }
        if self.watch.pull_interval_seconds == 0 {
            return Err(anyhow::anyhow!("watch.pull_interval_seconds must be greater than zero"));
        }
        if self.kodi.username.is_some() != self.kodi.password.is_some() {
            return Err(anyhow::anyhow!("kodi.username and kodi.password must be set together"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.kodi.url = "http://htpc.local:8080/jsonrpc".to_string();
        config.kodi.username = Some("kodi".to_string());
        config.kodi.password = Some("secret".to_string());
        config.sync.debounce_seconds = 30;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.kodi.url, "http://htpc.local:8080/jsonrpc");
        assert_eq!(loaded.kodi.username.as_deref(), Some("kodi"));
        assert_eq!(loaded.sync.debounce_seconds, 30);
        assert_eq!(loaded.sync.poll_interval_seconds, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[sync]\ndebounce_seconds = 15\n").unwrap();
        assert_eq!(config.sync.debounce_window(), Duration::from_secs(15));
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.tvmaze.user_api_url, "https://api.tvmaze.com/v1");
        assert_eq!(config.watch.pull_interval_seconds, 600);
        assert!(config.watch.pull_on_startup);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.sync.debounce_seconds, 10);
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.sync.poll_interval_seconds = 0;
        assert!(config.validate().is_err());
        config.sync.poll_interval_seconds = 5;

        config.kodi.url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.kodi.url = default_kodi_url();

        config.kodi.username = Some("kodi".to_string());
        assert!(config.validate().is_err());
        config.kodi.password = Some("kodi".to_string());
        assert!(config.validate().is_ok());
    }
}
