use chrono::Utc;
use episode_sync_models::{EpisodeRecord, RemoteEpisodeUpdate, StatusType};

/// Convert library episodes into a TVmaze batch marked at `marked_at` (unix seconds).
///
/// Specials (season 0) are dropped. Watched episodes are sent as watched, everything else as
/// acquired.
pub fn project(episodes: &[EpisodeRecord], marked_at: i64) -> Vec<RemoteEpisodeUpdate> {
    episodes
        .iter()
        .filter(|episode| !episode.is_special())
        .map(|episode| RemoteEpisodeUpdate {
            season: episode.season,
            episode: episode.episode,
            marked_at,
            status: if episode.is_watched() {
                StatusType::Watched
            } else {
                StatusType::Acquired
            },
        })
        .collect()
}

pub fn project_now(episodes: &[EpisodeRecord]) -> Vec<RemoteEpisodeUpdate> {
    project(episodes, Utc::now().timestamp())
}
