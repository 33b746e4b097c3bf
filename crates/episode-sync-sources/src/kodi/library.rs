use async_trait::async_trait;
use episode_sync_config::KodiConfig;
use episode_sync_models::{EpisodeRecord, TvShow};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::LibraryError;
use crate::traits::MediaLibrary;
use crate::types::EpisodeFilter;

const EPISODE_PROPERTIES: [&str; 4] = ["season", "episode", "playcount", "tvshowid"];
const SHOW_PROPERTIES: [&str; 2] = ["uniqueid", "title"];

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct KodiTvShow {
    tvshowid: i64,
    #[serde(default)]
    label: String,
    #[serde(default)]
    uniqueid: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct KodiEpisode {
    episodeid: i64,
    tvshowid: i64,
    season: u32,
    episode: u32,
    #[serde(default)]
    playcount: u32,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TvShowsResult {
    tvshows: Option<Vec<KodiTvShow>>,
}

#[derive(Debug, Deserialize)]
struct EpisodesResult {
    episodes: Option<Vec<KodiEpisode>>,
}

#[derive(Debug, Deserialize)]
struct TvShowDetailsResult {
    tvshowdetails: Option<KodiTvShow>,
}

#[derive(Debug, Deserialize)]
struct EpisodeDetailsResult {
    episodedetails: Option<KodiEpisode>,
}

impl From<KodiTvShow> for TvShow {
    fn from(show: KodiTvShow) -> Self {
        TvShow {
            show_id: show.tvshowid,
            label: show.label,
            unique_ids: show.uniqueid,
        }
    }
}

impl From<KodiEpisode> for EpisodeRecord {
    fn from(episode: KodiEpisode) -> Self {
        EpisodeRecord {
            episode_id: episode.episodeid,
            show_id: episode.tvshowid,
            season: episode.season,
            episode: episode.episode,
            playcount: episode.playcount,
            label: episode.label,
        }
    }
}

/// JSON-RPC filter for `VideoLibrary.GetEpisodes`. Kodi rejects an `and` group with a single rule.
fn filter_json(filter: &EpisodeFilter) -> Option<Value> {
    let rule = |field: &str, value: u32| {
        json!({"field": field, "operator": "is", "value": value.to_string()})
    };
    let mut rules: Vec<Value> = Vec::new();
    if let Some(season) = filter.season {
        rules.push(rule("season", season));
    }
    if let Some(episode) = filter.episode {
        rules.push(rule("episode", episode));
    }
    if let Some(playcount) = filter.playcount {
        rules.push(rule("playcount", playcount));
    }
    match rules.len() {
        0 => None,
        1 => rules.pop(),
        _ => Some(json!({ "and": rules })),
    }
}

/// Kodi media library over JSON-RPC/HTTP
pub struct KodiLibrary {
    client: Arc<Client>,
    url: String,
    auth: Option<(String, String)>,
    request_id: AtomicU64,
}

impl KodiLibrary {
    pub fn new(config: &KodiConfig) -> Result<Self, LibraryError> {
        let client = Client::builder().build()?;
        let auth = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };
        Ok(Self {
            client: Arc::new(client),
            url: config.url.clone(),
            auth,
            request_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LibraryError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": id});
        debug!(method, request = %body, "Calling Kodi JSON-RPC");

        let mut request = self.client.post(&self.url).json(&body);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(LibraryError::Transport(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let rpc: RpcResponse = response.json().await?;
        if let Some(error) = rpc.error {
            return Err(LibraryError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        rpc.result
            .ok_or_else(|| LibraryError::NoData(method.to_string()))
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LibraryError> {
        let result = self.call(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl MediaLibrary for KodiLibrary {
    async fn list_shows(&self) -> Result<Vec<TvShow>, LibraryError> {
        let method = "VideoLibrary.GetTVShows";
        let result: TvShowsResult = self
            .call_typed(method, json!({ "properties": SHOW_PROPERTIES }))
            .await?;
        let shows = result
            .tvshows
            .ok_or_else(|| LibraryError::NoData(method.to_string()))?;
        Ok(shows.into_iter().map(TvShow::from).collect())
    }

    async fn list_episodes(
        &self,
        show_id: i64,
        filter: Option<&EpisodeFilter>,
    ) -> Result<Vec<EpisodeRecord>, LibraryError> {
        let method = "VideoLibrary.GetEpisodes";
        let mut params = json!({ "tvshowid": show_id, "properties": EPISODE_PROPERTIES });
        if let Some(filter) = filter.and_then(filter_json) {
            params["filter"] = filter;
        }
        let result: EpisodesResult = self.call_typed(method, params).await?;
        let episodes = result
            .episodes
            .ok_or_else(|| LibraryError::NoData(method.to_string()))?;
        Ok(episodes.into_iter().map(EpisodeRecord::from).collect())
    }

    async fn recent_episodes(&self) -> Result<Vec<EpisodeRecord>, LibraryError> {
        let method = "VideoLibrary.GetRecentlyAddedEpisodes";
        let result: EpisodesResult = self
            .call_typed(method, json!({ "properties": EPISODE_PROPERTIES }))
            .await?;
        let episodes = result
            .episodes
            .ok_or_else(|| LibraryError::NoData(method.to_string()))?;
        Ok(episodes.into_iter().map(EpisodeRecord::from).collect())
    }

    async fn get_show(&self, show_id: i64) -> Result<TvShow, LibraryError> {
        let method = "VideoLibrary.GetTVShowDetails";
        let result: TvShowDetailsResult = self
            .call_typed(method, json!({ "tvshowid": show_id, "properties": SHOW_PROPERTIES }))
            .await?;
        result
            .tvshowdetails
            .map(TvShow::from)
            .ok_or_else(|| LibraryError::NoData(format!("{} tvshowid={}", method, show_id)))
    }

    async fn get_episode(&self, episode_id: i64) -> Result<EpisodeRecord, LibraryError> {
        let method = "VideoLibrary.GetEpisodeDetails";
        let result: EpisodeDetailsResult = self
            .call_typed(
                method,
                json!({ "episodeid": episode_id, "properties": EPISODE_PROPERTIES }),
            )
            .await?;
        result
            .episodedetails
            .map(EpisodeRecord::from)
            .ok_or_else(|| LibraryError::NoData(format!("{} episodeid={}", method, episode_id)))
    }

    async fn set_show_external_id(
        &self,
        show_id: i64,
        namespace: &str,
        value: &str,
    ) -> Result<(), LibraryError> {
        let mut uniqueid = serde_json::Map::new();
        uniqueid.insert(namespace.to_string(), Value::String(value.to_string()));
        self.call(
            "VideoLibrary.SetTVShowDetails",
            json!({ "tvshowid": show_id, "uniqueid": uniqueid }),
        )
        .await?;
        Ok(())
    }

    async fn set_episode_playcount(&self, episode_id: i64) -> Result<(), LibraryError> {
        self.call(
            "VideoLibrary.SetEpisodeDetails",
            json!({ "episodeid": episode_id, "playcount": 1 }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn library_for(server: &MockServer) -> KodiLibrary {
        let config = KodiConfig {
            url: format!("{}/jsonrpc", server.uri()),
            username: Some("kodi".to_string()),
            password: Some("kodi".to_string()),
            ..KodiConfig::default()
        };
        KodiLibrary::new(&config).unwrap()
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"id": 1, "jsonrpc": "2.0", "result": result}))
    }

    #[test]
    fn test_filter_json_shapes() {
        assert_eq!(filter_json(&EpisodeFilter::default()), None);

        let single = EpisodeFilter {
            playcount: Some(0),
            ..EpisodeFilter::default()
        };
        assert_eq!(
            filter_json(&single),
            Some(json!({"field": "playcount", "operator": "is", "value": "0"}))
        );

        assert_eq!(
            filter_json(&EpisodeFilter::unwatched_at(1, 2)),
            Some(json!({"and": [
                {"field": "season", "operator": "is", "value": "1"},
                {"field": "episode", "operator": "is", "value": "2"},
                {"field": "playcount", "operator": "is", "value": "0"}
            ]}))
        );
    }

    #[tokio::test]
    async fn test_list_shows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(basic_auth("kodi", "kodi"))
            .and(body_partial_json(json!({"method": "VideoLibrary.GetTVShows"})))
            .respond_with(rpc_result(json!({
                "limits": {"start": 0, "end": 2, "total": 2},
                "tvshows": [
                    {"tvshowid": 1, "label": "Game of Thrones", "title": "Game of Thrones",
                     "uniqueid": {"tvdb": "121361", "imdb": "tt0944947"}},
                    {"tvshowid": 2, "label": "Unknown", "title": "Unknown", "uniqueid": {}}
                ]
            })))
            .mount(&server)
            .await;

        let shows = library_for(&server).list_shows().await.unwrap();
        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].unique_ids.get("tvdb").map(String::as_str), Some("121361"));
        assert!(shows[1].preferred_external_id().is_none());
    }

    #[tokio::test]
    async fn test_missing_list_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!({"limits": {"start": 0, "end": 0, "total": 0}})))
            .mount(&server)
            .await;

        let err = library_for(&server).list_shows().await.unwrap_err();
        assert!(matches!(err, LibraryError::NoData(_)));
    }

    #[tokio::test]
    async fn test_rpc_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "jsonrpc": "2.0",
                "error": {"code": -32602, "message": "Invalid params."}
            })))
            .mount(&server)
            .await;

        let err = library_for(&server).get_episode(5).await.unwrap_err();
        assert!(matches!(err, LibraryError::Rpc { code: -32602, .. }));
    }

    #[tokio::test]
    async fn test_list_episodes_sends_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "VideoLibrary.GetEpisodes",
                "params": {
                    "tvshowid": 7,
                    "filter": {"and": [
                        {"field": "season", "operator": "is", "value": "2"},
                        {"field": "episode", "operator": "is", "value": "5"},
                        {"field": "playcount", "operator": "is", "value": "0"}
                    ]}
                }
            })))
            .respond_with(rpc_result(json!({
                "episodes": [{"episodeid": 70, "tvshowid": 7, "season": 2, "episode": 5,
                              "playcount": 0, "label": "2x05. Title"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let filter = EpisodeFilter::unwatched_at(2, 5);
        let episodes = library_for(&server)
            .list_episodes(7, Some(&filter))
            .await
            .unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].episode_id, 70);
        assert!(!episodes[0].is_watched());
    }

    #[tokio::test]
    async fn test_setters_send_expected_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "VideoLibrary.SetTVShowDetails",
                "params": {"tvshowid": 1, "uniqueid": {"tvmaze": "82"}}
            })))
            .respond_with(rpc_result(json!("OK")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "VideoLibrary.SetEpisodeDetails",
                "params": {"episodeid": 10, "playcount": 1}
            })))
            .respond_with(rpc_result(json!("OK")))
            .expect(1)
            .mount(&server)
            .await;

        let library = library_for(&server);
        library.set_show_external_id(1, "tvmaze", "82").await.unwrap();
        library.set_episode_playcount(10).await.unwrap();
    }
}
