use episode_sync_models::Credentials;
use serde::{Deserialize, Serialize};

/// Brief show info returned by an external-id lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteShowInfo {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Result of a batch push. A partial failure carries the service's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    Partial(String),
}

/// Issued by the service when an authorization handshake starts
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTicket {
    pub token: String,
    pub confirm_url: String,
}

impl AuthTicket {
    /// Confirmation URL safe for logs: the query string is dropped and the token masked
    pub fn redacted_url(&self) -> String {
        let base = self
            .confirm_url
            .split_once('?')
            .map_or(self.confirm_url.as_str(), |(base, _)| base);
        if self.token.is_empty() {
            base.to_string()
        } else {
            base.replace(&self.token, "***")
        }
    }
}

impl std::fmt::Debug for AuthTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTicket")
            .field("token", &"***")
            .field("confirm_url", &self.redacted_url())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Confirmed(Credentials),
}

/// Narrows an episode listing to the rows matching every set field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeFilter {
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub playcount: Option<u32>,
}

impl EpisodeFilter {
    /// Unwatched episode at an exact (season, episode) position
    pub fn unwatched_at(season: u32, episode: u32) -> Self {
        Self {
            season: Some(season),
            episode: Some(episode),
            playcount: Some(0),
        }
    }

    pub fn matches(&self, season: u32, episode: u32, playcount: u32) -> bool {
        self.season.map_or(true, |s| s == season)
            && self.episode.map_or(true, |e| e == episode)
            && self.playcount.map_or(true, |p| p == playcount)
    }
}
