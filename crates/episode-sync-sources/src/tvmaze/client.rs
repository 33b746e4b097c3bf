use async_trait::async_trait;
use episode_sync_config::TvMazeConfig;
use episode_sync_models::{
    Credentials, ExternalId, RemoteEpisodeUpdate, StatusType, WatchlistEpisode,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::sync::Arc;

use crate::error::RemoteError;
use crate::traits::RemoteService;
use crate::tvmaze::api;
use crate::types::{AuthTicket, PollStatus, RemoteShowInfo, SendOutcome};

/// TVmaze HTTP client. One underlying connection pool is shared by every clone.
#[derive(Clone)]
pub struct TvMazeClient {
    client: Arc<Client>,
    api_url: String,
    user_api_url: String,
    credentials: Option<Credentials>,
}

impl TvMazeClient {
    pub fn new(config: &TvMazeConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::GetInfo(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            api_url: config.api_url.clone(),
            user_api_url: config.user_api_url.clone(),
            credentials: None,
        })
    }

    /// Attach account credentials. Incomplete credentials count as none.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials.filter(Credentials::is_complete);
        self
    }

    fn credentials(&self) -> Result<&Credentials, RemoteError> {
        self.credentials
            .as_ref()
            .ok_or_else(RemoteError::missing_credentials)
    }
}

#[async_trait]
impl RemoteService for TvMazeClient {
    fn is_authorized(&self) -> bool {
        self.credentials.is_some()
    }

    async fn lookup_show(&self, external: &ExternalId) -> Result<RemoteShowInfo, RemoteError> {
        api::lookup_show(&self.client, &self.api_url, external).await
    }

    async fn send_episodes(
        &self,
        updates: &[RemoteEpisodeUpdate],
        show: &ExternalId,
    ) -> Result<SendOutcome, RemoteError> {
        let credentials = self.credentials()?;
        api::send_episodes(&self.client, &self.user_api_url, credentials, updates, show).await
    }

    async fn get_watchlist(
        &self,
        remote_show_id: &str,
        status: Option<StatusType>,
    ) -> Result<Vec<WatchlistEpisode>, RemoteError> {
        let credentials = self.credentials()?;
        api::get_watchlist(
            &self.client,
            &self.user_api_url,
            credentials,
            remote_show_id,
            status,
        )
        .await
    }

    async fn start_auth(&self, email: &str) -> Result<AuthTicket, RemoteError> {
        api::start_authorization(&self.client, &self.user_api_url, email).await
    }

    async fn poll_auth(&self, token: &str) -> Result<PollStatus, RemoteError> {
        api::poll_authorization(&self.client, &self.user_api_url, token).await
    }
}
