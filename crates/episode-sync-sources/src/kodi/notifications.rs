use async_trait::async_trait;
use episode_sync_models::EpisodeChange;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, info, trace};

use crate::error::LibraryError;
use crate::traits::ChangeFeed;

const UPDATE_METHOD: &str = "VideoLibrary.OnUpdate";

#[derive(Debug, Deserialize)]
struct Notification {
    method: String,
    #[serde(default)]
    params: Option<NotificationParams>,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    #[serde(default)]
    data: Option<UpdateData>,
}

#[derive(Debug, Deserialize)]
struct UpdateData {
    #[serde(default)]
    item: Option<UpdateItem>,
    #[serde(default)]
    playcount: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UpdateItem {
    id: i64,
    #[serde(rename = "type")]
    item_type: String,
}

/// Playcount change carried by a library notification, if it is one.
///
/// Only `VideoLibrary.OnUpdate` for an episode with a `playcount` in its data qualifies.
pub fn episode_change(message: Value) -> Option<EpisodeChange> {
    let notification: Notification = serde_json::from_value(message).ok()?;
    if notification.method != UPDATE_METHOD {
        return None;
    }
    let data = notification.params?.data?;
    let playcount = data.playcount?;
    let item = data.item?;
    (item.item_type == "episode").then_some(EpisodeChange {
        episode_id: item.id,
        playcount,
    })
}

/// Kodi JSON-RPC notification stream over TCP
pub struct KodiNotifications {
    stream: TcpStream,
    buffer: Vec<u8>,
    pending: VecDeque<EpisodeChange>,
}

impl KodiNotifications {
    pub async fn connect(address: &str) -> Result<Self, LibraryError> {
        let stream = TcpStream::connect(address).await?;
        info!(address, "Connected to Kodi notifications");
        Ok(Self {
            stream,
            buffer: Vec::new(),
            pending: VecDeque::new(),
        })
    }

    /// Parse every complete message in the buffer, keeping a trailing partial one
    fn drain_messages(&mut self) -> Result<(), LibraryError> {
        let mut consumed = 0;
        let mut messages = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
        loop {
            match messages.next() {
                Some(Ok(message)) => {
                    consumed = messages.byte_offset();
                    trace!(message = %message, "Kodi notification");
                    if let Some(change) = episode_change(message) {
                        debug!(episode_id = change.episode_id, playcount = change.playcount, "Episode playcount changed");
                        self.pending.push_back(change);
                    }
                }
                Some(Err(e)) if e.is_eof() => break,
                Some(Err(e)) => return Err(LibraryError::Decode(e.to_string())),
                None => {
                    consumed = self.buffer.len();
                    break;
                }
            }
        }
        self.buffer.drain(..consumed);
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for KodiNotifications {
    async fn next_change(&mut self) -> Result<Option<EpisodeChange>, LibraryError> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(change) = self.pending.pop_front() {
                return Ok(Some(change));
            }
            let read = self.stream.read(&mut chunk).await?;
            if read == 0 {
                info!("Kodi closed the notification connection");
                return Ok(None);
            }
            self.buffer.extend_from_slice(&chunk[..read]);
            self.drain_messages()?;
        }
    }
}
