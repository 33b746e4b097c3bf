use serde::{Deserialize, Serialize};
use std::fmt;

/// An episode as stored in the local media library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub episode_id: i64,
    pub show_id: i64,
    pub season: u32,
    pub episode: u32,
    pub playcount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EpisodeRecord {
    pub fn is_watched(&self) -> bool {
        self.playcount > 0
    }

    /// Season 0 holds specials, which are not synced
    pub fn is_special(&self) -> bool {
        self.season == 0
    }
}

/// Episode status on TVmaze. Serialized as its numeric code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum StatusType {
    Watched,
    Acquired,
    Skipped,
}

impl StatusType {
    pub fn code(&self) -> u8 {
        match self {
            StatusType::Watched => 0,
            StatusType::Acquired => 1,
            StatusType::Skipped => 2,
        }
    }
}

impl From<StatusType> for u8 {
    fn from(status: StatusType) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for StatusType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StatusType::Watched),
            1 => Ok(StatusType::Acquired),
            2 => Ok(StatusType::Skipped),
            other => Err(format!("unknown episode status type: {}", other)),
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusType::Watched => "watched",
            StatusType::Acquired => "acquired",
            StatusType::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// One entry of an episode batch pushed to TVmaze
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEpisodeUpdate {
    pub season: u32,
    pub episode: u32,
    /// Unix timestamp in seconds
    pub marked_at: i64,
    #[serde(rename = "type")]
    pub status: StatusType,
}

/// An episode from the user's TVmaze watchlist.
///
/// Season and number are optional because TVmaze reports specials without them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchlistEpisode {
    pub remote_episode_id: Option<u64>,
    pub season: Option<u32>,
    pub number: Option<u32>,
    pub marked_at: Option<i64>,
    pub status: StatusType,
}

/// A playcount change reported by the media library
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeChange {
    pub episode_id: i64,
    pub playcount: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_type_serializes_as_code() {
        let update = RemoteEpisodeUpdate {
            season: 1,
            episode: 2,
            marked_at: 1_600_000_000,
            status: StatusType::Acquired,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"season": 1, "episode": 2, "marked_at": 1_600_000_000, "type": 1})
        );
    }

    #[test]
    fn test_status_type_rejects_unknown_code() {
        assert_eq!(serde_json::from_str::<StatusType>("2").unwrap(), StatusType::Skipped);
        assert!(serde_json::from_str::<StatusType>("7").is_err());
    }

    #[test]
    fn test_episode_record_flags() {
        let special = EpisodeRecord {
            episode_id: 1,
            show_id: 1,
            season: 0,
            episode: 3,
            playcount: 2,
            label: None,
        };
        assert!(special.is_special());
        assert!(special.is_watched());
    }
}
