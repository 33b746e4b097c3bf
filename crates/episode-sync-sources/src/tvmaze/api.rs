use episode_sync_models::{
    Credentials, ExternalId, RemoteEpisodeUpdate, StatusType, WatchlistEpisode,
};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::RemoteError;
use crate::types::{AuthTicket, PollStatus, RemoteShowInfo, SendOutcome};

const AUTH_START_PATH: &str = "/auth/start";
const AUTH_POLL_PATH: &str = "/auth/poll";
const SCROBBLE_SHOWS_PATH: &str = "/scrobble/shows";
const SHOW_LOOKUP_PATH: &str = "/lookup/shows";

#[derive(Debug, Serialize)]
struct AuthStartRequest<'a> {
    email: &'a str,
    email_confirmation: bool,
}

#[derive(Debug, Deserialize)]
struct AuthStartResponse {
    token: Option<String>,
    confirm_url: Option<String>,
}

#[derive(Serialize)]
struct AuthPollRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct AuthPollResponse {
    username: Option<String>,
    apikey: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrobbleEntry {
    /// Raw status code; codes this client does not know are skipped, not fatal
    #[serde(rename = "type", default)]
    status: Option<u8>,
    marked_at: Option<i64>,
    #[serde(rename = "_embedded", default)]
    embedded: Option<ScrobbleEmbedded>,
}

#[derive(Debug, Deserialize)]
struct ScrobbleEmbedded {
    episode: Option<ScrobbleEpisode>,
}

#[derive(Debug, Deserialize)]
struct ScrobbleEpisode {
    id: Option<u64>,
    season: Option<u32>,
    number: Option<u32>,
}

impl ScrobbleEntry {
    fn into_watchlist_episode(self) -> Option<WatchlistEpisode> {
        let status = match self.status.map(StatusType::try_from) {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                debug!(error = %e, "Skipping watchlist entry");
                return None;
            }
            None => {
                debug!("Skipping watchlist entry without a status type");
                return None;
            }
        };
        let episode = self.embedded.and_then(|e| e.episode);
        Some(WatchlistEpisode {
            remote_episode_id: episode.as_ref().and_then(|e| e.id),
            season: episode.as_ref().and_then(|e| e.season),
            number: episode.as_ref().and_then(|e| e.number),
            marked_at: self.marked_at,
            status,
        })
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Log a non-success response and hand back its status and body
async fn error_text(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), body = %text, "TVmaze returned error");
    (status, text)
}

/// Start the authorization handshake for the given account e-mail
pub async fn start_authorization(
    client: &Client,
    user_api_url: &str,
    email: &str,
) -> Result<AuthTicket, RemoteError> {
    let url = join(user_api_url, AUTH_START_PATH);
    debug!(url = %url, method = "POST", "Calling TVmaze API");

    let response = client
        .post(&url)
        .json(&AuthStartRequest {
            email,
            email_confirmation: true,
        })
        .send()
        .await
        .map_err(|e| RemoteError::Authorization(e.to_string()))?;

    if !response.status().is_success() {
        let (_, text) = error_text(response).await;
        return Err(RemoteError::Authorization(text));
    }

    let body: AuthStartResponse = response
        .json()
        .await
        .map_err(|e| RemoteError::Authorization(format!("Invalid response: {}", e)))?;

    match (body.token, body.confirm_url) {
        (Some(token), Some(confirm_url)) => Ok(AuthTicket { token, confirm_url }),
        _ => Err(RemoteError::Authorization(
            "TVmaze did not return an authorization token".to_string(),
        )),
    }
}

/// Check whether the user has confirmed the handshake. HTTP 403 means not yet.
pub async fn poll_authorization(
    client: &Client,
    user_api_url: &str,
    token: &str,
) -> Result<PollStatus, RemoteError> {
    let url = join(user_api_url, AUTH_POLL_PATH);
    debug!(url = %url, method = "POST", "Calling TVmaze API");

    let response = client
        .post(&url)
        .json(&AuthPollRequest { token })
        .send()
        .await
        .map_err(|e| RemoteError::Authorization(e.to_string()))?;

    if response.status() == StatusCode::FORBIDDEN {
        debug!("Authorization pending");
        return Ok(PollStatus::Pending);
    }
    if !response.status().is_success() {
        let (_, text) = error_text(response).await;
        return Err(RemoteError::Authorization(text));
    }

    let body: AuthPollResponse = response
        .json()
        .await
        .map_err(|e| RemoteError::Authorization(format!("Invalid response: {}", e)))?;

    let credentials = Credentials::new(
        body.username.unwrap_or_default(),
        body.apikey.unwrap_or_default(),
    );
    if !credentials.is_complete() {
        return Err(RemoteError::Authorization(
            "TVmaze returned incomplete credentials".to_string(),
        ));
    }
    Ok(PollStatus::Confirmed(credentials))
}

/// Push episode statuses of one show, identified by any supported provider
pub async fn send_episodes(
    client: &Client,
    user_api_url: &str,
    credentials: &Credentials,
    updates: &[RemoteEpisodeUpdate],
    show: &ExternalId,
) -> Result<SendOutcome, RemoteError> {
    let url = join(user_api_url, SCROBBLE_SHOWS_PATH);
    let provider_param = format!("{}_id", show.provider.wire_name());
    debug!(
        url = %url,
        method = "POST",
        show = %show,
        episodes = updates.len(),
        payload = %serde_json::to_string(updates).unwrap_or_default(),
        "Calling TVmaze API"
    );

    let response = client
        .post(&url)
        .query(&[(provider_param.as_str(), show.id.as_str())])
        .basic_auth(&credentials.username, Some(&credentials.api_key))
        .json(updates)
        .send()
        .await
        .map_err(|e| RemoteError::Update(e.to_string()))?;

    if !response.status().is_success() {
        let (status, text) = error_text(response).await;
        return Err(RemoteError::Update(format!(
            "status: {}, message: {}",
            status.as_u16(),
            text
        )));
    }

    if response.status() == StatusCode::MULTI_STATUS {
        let text = response.text().await.unwrap_or_default();
        warn!(show = %show, body = %text, "Failed to update some episode info");
        return Ok(SendOutcome::Partial(text));
    }

    Ok(SendOutcome::Accepted)
}

/// Look a show up on TVmaze by its ID in an external database
pub async fn lookup_show(
    client: &Client,
    api_url: &str,
    external: &ExternalId,
) -> Result<RemoteShowInfo, RemoteError> {
    let url = join(api_url, SHOW_LOOKUP_PATH);
    debug!(url = %url, method = "GET", show = %external, "Calling TVmaze API");
    let not_found = || RemoteError::NotFound(format!("Unable to find a show by id {}", external));

    let response = client
        .get(&url)
        .query(&[(external.provider.wire_name(), external.id.as_str())])
        .send()
        .await
        .map_err(|e| RemoteError::GetInfo(e.to_string()))?;

    if !response.status().is_success() {
        error_text(response).await;
        return Err(not_found());
    }

    response.json().await.map_err(|e| {
        debug!(error = %e, "Unexpected lookup response");
        not_found()
    })
}

/// Episodes of one show from the user's watchlist, optionally narrowed to one status
pub async fn get_watchlist(
    client: &Client,
    user_api_url: &str,
    credentials: &Credentials,
    remote_show_id: &str,
    status: Option<StatusType>,
) -> Result<Vec<WatchlistEpisode>, RemoteError> {
    let url = join(
        user_api_url,
        &format!("{}/{}", SCROBBLE_SHOWS_PATH, remote_show_id),
    );
    let mut params = vec![("embed", "episode".to_string())];
    if let Some(status) = status {
        params.push(("type", status.code().to_string()));
    }
    debug!(url = %url, method = "GET", params = ?params, "Calling TVmaze API");
    let failed = || {
        RemoteError::GetInfo(format!(
            "Unable to get watchlist for show id {}",
            remote_show_id
        ))
    };

    let response = client
        .get(&url)
        .query(&params)
        .basic_auth(&credentials.username, Some(&credentials.api_key))
        .send()
        .await
        .map_err(|e| RemoteError::GetInfo(e.to_string()))?;

    if !response.status().is_success() {
        error_text(response).await;
        return Err(failed());
    }

    let entries: Vec<ScrobbleEntry> = response.json().await.map_err(|e| {
        debug!(error = %e, "Unexpected watchlist response");
        failed()
    })?;

    Ok(entries
        .into_iter()
        .filter_map(ScrobbleEntry::into_watchlist_episode)
        .collect())
}
