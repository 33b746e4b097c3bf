use anyhow::Result;
use chrono::{DateTime, Utc};
use episode_sync_models::Credentials;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const USERNAME_KEY: &str = "username";
const API_KEY_KEY: &str = "apikey";
const AUTHORIZED_AT_KEY: &str = "authorized_at";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Key/value credential file. TVmaze username and API key live under `username` and `apikey`.
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    /// Both username and API key, or None when either is missing or empty
    pub fn get_credentials(&self) -> Option<Credentials> {
        let username = self.get(USERNAME_KEY)?;
        let api_key = self.get(API_KEY_KEY)?;
        let credentials = Credentials::new(username.clone(), api_key.clone());
        credentials.is_complete().then_some(credentials)
    }

    pub fn set_credentials(&mut self, credentials: &Credentials) {
        self.set(USERNAME_KEY.to_string(), credentials.username.clone());
        self.set(API_KEY_KEY.to_string(), credentials.api_key.clone());
        self.set(AUTHORIZED_AT_KEY.to_string(), Utc::now().to_rfc3339());
    }

    pub fn clear_credentials(&mut self) {
        self.remove(USERNAME_KEY);
        self.remove(API_KEY_KEY);
        self.remove(AUTHORIZED_AT_KEY);
    }

    pub fn get_authorized_at(&self) -> Option<DateTime<Utc>> {
        self.get(AUTHORIZED_AT_KEY)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_credentials(&Credentials::new("jdoe", "abc123"));
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path.clone());
        loaded_store.load().unwrap();
        assert_eq!(
            loaded_store.get_credentials(),
            Some(Credentials::new("jdoe", "abc123"))
        );
        assert!(loaded_store.get_authorized_at().is_some());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("apikey"));
    }

    #[test]
    fn test_incomplete_credentials_are_absent() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused"));
        store.set("username".to_string(), "jdoe".to_string());
        assert_eq!(store.get_credentials(), None);

        store.set("apikey".to_string(), String::new());
        assert_eq!(store.get_credentials(), None);
    }

    #[test]
    fn test_clear_credentials_keeps_other_keys() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused"));
        store.set_credentials(&Credentials::new("jdoe", "abc123"));
        store.set("note".to_string(), "kept".to_string());

        store.clear_credentials();
        assert_eq!(store.get_credentials(), None);
        assert_eq!(store.get_authorized_at(), None);
        assert_eq!(store.get("note"), Some(&"kept".to_string()));
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CredentialStore::new(dir.path().join("credentials.toml"));
        store.load().unwrap();
        assert_eq!(store.get_credentials(), None);
    }
}
