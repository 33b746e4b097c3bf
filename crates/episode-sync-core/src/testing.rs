//! In-memory library and remote service for engine tests

use async_trait::async_trait;
use episode_sync_models::{
    EpisodeRecord, ExternalId, RemoteEpisodeUpdate, StatusType, TvShow, WatchlistEpisode,
};
use episode_sync_sources::{
    AuthTicket, EpisodeFilter, LibraryError, MediaLibrary, PollStatus, RemoteError,
    RemoteService, RemoteShowInfo, SendOutcome,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn show(show_id: i64, label: &str, ids: &[(&str, &str)]) -> TvShow {
    TvShow {
        show_id,
        label: label.to_string(),
        unique_ids: ids
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn episode(episode_id: i64, show_id: i64, season: u32, number: u32, playcount: u32) -> EpisodeRecord {
    EpisodeRecord {
        episode_id,
        show_id,
        season,
        episode: number,
        playcount,
        label: None,
    }
}

pub fn watched(season: Option<u32>, number: Option<u32>) -> WatchlistEpisode {
    WatchlistEpisode {
        remote_episode_id: None,
        season,
        number,
        marked_at: Some(1_600_000_000),
        status: StatusType::Watched,
    }
}

#[derive(Default)]
pub struct FakeLibrary {
    shows: Mutex<Vec<TvShow>>,
    episodes: Mutex<Vec<EpisodeRecord>>,
    recent: Vec<i64>,
    failing_episode_lists: bool,
    playcount_writes: Mutex<Vec<i64>>,
}

impl FakeLibrary {
    pub fn new(shows: Vec<TvShow>) -> Self {
        Self {
            shows: Mutex::new(shows),
            ..Self::default()
        }
    }

    pub fn with_episodes(self, episodes: Vec<EpisodeRecord>) -> Self {
        *self.episodes.lock().unwrap() = episodes;
        self
    }

    pub fn with_recent(mut self, episode_ids: Vec<i64>) -> Self {
        self.recent = episode_ids;
        self
    }

    pub fn with_failing_episode_lists(mut self) -> Self {
        self.failing_episode_lists = true;
        self
    }

    pub fn show(&self, show_id: i64) -> TvShow {
        self.shows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.show_id == show_id)
            .cloned()
            .unwrap()
    }

    pub fn episode(&self, episode_id: i64) -> EpisodeRecord {
        self.episodes
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.episode_id == episode_id)
            .cloned()
            .unwrap()
    }

    pub fn playcount_writes(&self) -> Vec<i64> {
        self.playcount_writes.lock().unwrap().clone()
    }
}

fn non_empty<T>(items: Vec<T>, what: &str) -> Result<Vec<T>, LibraryError> {
    if items.is_empty() {
        Err(LibraryError::NoData(what.to_string()))
    } else {
        Ok(items)
    }
}

#[async_trait]
impl MediaLibrary for FakeLibrary {
    async fn list_shows(&self) -> Result<Vec<TvShow>, LibraryError> {
        non_empty(self.shows.lock().unwrap().clone(), "shows")
    }

    async fn list_episodes(
        &self,
        show_id: i64,
        filter: Option<&EpisodeFilter>,
    ) -> Result<Vec<EpisodeRecord>, LibraryError> {
        if self.failing_episode_lists {
            return Err(LibraryError::Transport("connection reset".to_string()));
        }
        let matching = self
            .episodes
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.show_id == show_id)
            .filter(|e| filter.map_or(true, |f| f.matches(e.season, e.episode, e.playcount)))
            .cloned()
            .collect();
        non_empty(matching, "episodes")
    }

    async fn recent_episodes(&self) -> Result<Vec<EpisodeRecord>, LibraryError> {
        let episodes = self.episodes.lock().unwrap();
        let recent = self
            .recent
            .iter()
            .filter_map(|id| episodes.iter().find(|e| e.episode_id == *id).cloned())
            .collect();
        non_empty(recent, "recent episodes")
    }

    async fn get_show(&self, show_id: i64) -> Result<TvShow, LibraryError> {
        self.shows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.show_id == show_id)
            .cloned()
            .ok_or_else(|| LibraryError::NoData(format!("show {}", show_id)))
    }

    async fn get_episode(&self, episode_id: i64) -> Result<EpisodeRecord, LibraryError> {
        self.episodes
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.episode_id == episode_id)
            .cloned()
            .ok_or_else(|| LibraryError::NoData(format!("episode {}", episode_id)))
    }

    async fn set_show_external_id(
        &self,
        show_id: i64,
        namespace: &str,
        value: &str,
    ) -> Result<(), LibraryError> {
        let mut shows = self.shows.lock().unwrap();
        let show = shows
            .iter_mut()
            .find(|s| s.show_id == show_id)
            .ok_or_else(|| LibraryError::NoData(format!("show {}", show_id)))?;
        show.unique_ids.insert(namespace.to_string(), value.to_string());
        Ok(())
    }

    async fn set_episode_playcount(&self, episode_id: i64) -> Result<(), LibraryError> {
        let mut episodes = self.episodes.lock().unwrap();
        let episode = episodes
            .iter_mut()
            .find(|e| e.episode_id == episode_id)
            .ok_or_else(|| LibraryError::NoData(format!("episode {}", episode_id)))?;
        episode.playcount = 1;
        self.playcount_writes.lock().unwrap().push(episode_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRemote {
    authorized: bool,
    lookup_table: HashMap<String, u64>,
    watchlists: HashMap<String, Vec<WatchlistEpisode>>,
    failing_sends: HashSet<String>,
    partial_sends: HashSet<String>,
    poll_script: Mutex<VecDeque<Result<PollStatus, RemoteError>>>,
    hanging_poll: bool,
    watchlist_delay: Option<Duration>,
    lookups: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, Vec<RemoteEpisodeUpdate>)>>,
    watchlist_requests: Mutex<Vec<(String, Option<StatusType>)>>,
    auth_starts: AtomicU32,
    polls: AtomicU32,
}

impl FakeRemote {
    pub fn authorized() -> Self {
        Self {
            authorized: true,
            ..Self::default()
        }
    }

    pub fn unauthorized() -> Self {
        Self::default()
    }

    pub fn with_lookup(mut self, provider: &str, id: &str, tvmaze_id: u64) -> Self {
        self.lookup_table.insert(format!("{}={}", provider, id), tvmaze_id);
        self
    }

    pub fn with_watchlist(mut self, remote_id: &str, episodes: Vec<WatchlistEpisode>) -> Self {
        self.watchlists.insert(remote_id.to_string(), episodes);
        self
    }

    pub fn with_failing_send(mut self, remote_id: &str) -> Self {
        self.failing_sends.insert(remote_id.to_string());
        self
    }

    pub fn with_partial_send(mut self, remote_id: &str) -> Self {
        self.partial_sends.insert(remote_id.to_string());
        self
    }

    pub fn with_poll_script(self, script: Vec<Result<PollStatus, RemoteError>>) -> Self {
        *self.poll_script.lock().unwrap() = script.into();
        self
    }

    pub fn with_hanging_poll(mut self) -> Self {
        self.hanging_poll = true;
        self
    }

    /// Make every watchlist request take `delay`
    pub fn with_slow_watchlist(mut self, delay: Duration) -> Self {
        self.watchlist_delay = Some(delay);
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(String, Vec<RemoteEpisodeUpdate>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn watchlist_requests(&self) -> Vec<(String, Option<StatusType>)> {
        self.watchlist_requests.lock().unwrap().clone()
    }

    pub fn auth_starts(&self) -> u32 {
        self.auth_starts.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    fn is_authorized(&self) -> bool {
        self.authorized
    }

    async fn lookup_show(&self, external: &ExternalId) -> Result<RemoteShowInfo, RemoteError> {
        let key = external.to_string();
        self.lookups.lock().unwrap().push(key.clone());
        self.lookup_table
            .get(&key)
            .map(|id| RemoteShowInfo { id: *id, name: None })
            .ok_or_else(|| RemoteError::NotFound(format!("Unable to find a show by id {}", key)))
    }

    async fn send_episodes(
        &self,
        updates: &[RemoteEpisodeUpdate],
        show: &ExternalId,
    ) -> Result<SendOutcome, RemoteError> {
        if !self.authorized {
            return Err(RemoteError::missing_credentials());
        }
        self.sent
            .lock()
            .unwrap()
            .push((show.id.clone(), updates.to_vec()));
        if self.failing_sends.contains(&show.id) {
            return Err(RemoteError::Update("status: 500, message: boom".to_string()));
        }
        if self.partial_sends.contains(&show.id) {
            return Ok(SendOutcome::Partial("some episodes not found".to_string()));
        }
        Ok(SendOutcome::Accepted)
    }

    async fn get_watchlist(
        &self,
        remote_show_id: &str,
        status: Option<StatusType>,
    ) -> Result<Vec<WatchlistEpisode>, RemoteError> {
        self.watchlist_requests
            .lock()
            .unwrap()
            .push((remote_show_id.to_string(), status));
        if let Some(delay) = self.watchlist_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .watchlists
            .get(remote_show_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .collect())
    }

    async fn start_auth(&self, _email: &str) -> Result<AuthTicket, RemoteError> {
        self.auth_starts.fetch_add(1, Ordering::SeqCst);
        Ok(AuthTicket {
            token: "t0k3n".to_string(),
            confirm_url: "https://www.tvmaze.com/account/confirm".to_string(),
        })
    }

    async fn poll_auth(&self, _token: &str) -> Result<PollStatus, RemoteError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.hanging_poll {
            std::future::pending::<()>().await;
        }
        let next = self.poll_script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(PollStatus::Pending))
    }
}
