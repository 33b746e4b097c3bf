use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::LedgerError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pulled_episodes(
    episode_id INTEGER PRIMARY KEY,
    timestamp INTEGER NOT NULL
)";

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Episodes recently marked watched from TVmaze.
///
/// Lets the change handler ignore the library notification caused by its own pull. Every
/// operation opens its own connection and commits before returning, so the ledger can be shared
/// between the pull path and the change path without locking.
#[derive(Debug, Clone)]
pub struct PulledEpisodes {
    path: PathBuf,
    window: Duration,
}

impl PulledEpisodes {
    /// Create the database file and table if needed
    pub fn open(path: impl Into<PathBuf>, window: Duration) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let ledger = Self { path, window };
        ledger.connect()?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn connect(&self) -> Result<Connection, LedgerError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    pub fn mark_pulled(&self, episode_id: i64) -> Result<(), LedgerError> {
        self.mark_pulled_at(episode_id, Utc::now().timestamp())
    }

    /// Upsert the pull time of an episode
    pub fn mark_pulled_at(&self, episode_id: i64, now: i64) -> Result<(), LedgerError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO pulled_episodes (episode_id, timestamp) VALUES (?1, ?2)
             ON CONFLICT(episode_id) DO UPDATE SET timestamp = excluded.timestamp",
            params![episode_id, now],
        )?;
        debug!(episode_id, timestamp = now, "Marked episode as pulled");
        Ok(())
    }

    pub fn was_recently_pulled(&self, episode_id: i64) -> Result<bool, LedgerError> {
        self.was_recently_pulled_at(episode_id, Utc::now().timestamp())
    }

    /// True iff the episode was pulled less than one window before `now`
    pub fn was_recently_pulled_at(&self, episode_id: i64, now: i64) -> Result<bool, LedgerError> {
        let conn = self.connect()?;
        let pulled_at: Option<i64> = conn
            .query_row(
                "SELECT timestamp FROM pulled_episodes WHERE episode_id = ?1",
                params![episode_id],
                |row| row.get(0),
            )
            .optional()?;
        let window = self.window.as_secs() as i64;
        Ok(pulled_at.is_some_and(|t| now - t < window))
    }

    /// Delete rows older than `older_than`, returning how many were removed
    pub fn prune(&self, older_than: Duration) -> Result<usize, LedgerError> {
        let cutoff = Utc::now().timestamp() - older_than.as_secs() as i64;
        self.prune_before(cutoff)
    }

    pub fn prune_before(&self, cutoff: i64) -> Result<usize, LedgerError> {
        let conn = self.connect()?;
        let removed = conn.execute(
            "DELETE FROM pulled_episodes WHERE timestamp < ?1",
            params![cutoff],
        )?;
        debug!(removed, cutoff, "Pruned pulled episodes");
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pulled_episodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<usize, LedgerError> {
        let conn = self.connect()?;
        Ok(conn.execute("DELETE FROM pulled_episodes", [])?)
    }
}
