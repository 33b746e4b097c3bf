//! Long-running sync: library changes are pushed as they arrive while pulls run on a timer

use episode_sync_models::EpisodeChange;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::SyncError;
use crate::sync::{ChangeOutcome, SyncEngine, SyncReport};

#[derive(Debug)]
pub enum WatchEvent {
    Pulled(Result<SyncReport, SyncError>),
    Changed {
        episode_id: i64,
        result: Result<ChangeOutcome, SyncError>,
    },
}

/// Drives a shared [`SyncEngine`] from a change channel and a pull timer.
///
/// Pulls run on their own task so a slow TVmaze response never holds back a change, which
/// must be checked against the ledger while the window is still open.
pub struct WatchService {
    engine: Arc<SyncEngine>,
    pull_interval: Duration,
    pull_on_startup: bool,
}

impl WatchService {
    pub fn new(engine: Arc<SyncEngine>, pull_interval: Duration) -> Self {
        Self {
            engine,
            pull_interval,
            pull_on_startup: true,
        }
    }

    pub fn with_pull_on_startup(mut self, pull_on_startup: bool) -> Self {
        self.pull_on_startup = pull_on_startup;
        self
    }

    /// Run until `shutdown` fires or the change channel closes.
    /// Results are reported on `events`; the service stops early if its receiver goes away.
    pub async fn run(
        self,
        mut changes: mpsc::Receiver<EpisodeChange>,
        events: mpsc::Sender<WatchEvent>,
        shutdown: CancellationToken,
    ) {
        let stop = shutdown.child_token();
        let puller = tokio::spawn(pull_loop(
            self.engine.clone(),
            self.pull_interval,
            self.pull_on_startup,
            events.clone(),
            stop.clone(),
        ));

        loop {
            let change = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                change = changes.recv() => change,
            };
            let Some(change) = change else {
                debug!("Change feed closed");
                break;
            };

            let episode_id = change.episode_id;
            let result = self.engine.handle_change(change).await;
            if events.send(WatchEvent::Changed { episode_id, result }).await.is_err() {
                break;
            }
        }

        stop.cancel();
        if let Err(e) = puller.await {
            error!(error = %e, "Pull task failed");
        }
        info!("Watch service stopped");
    }
}

async fn pull_loop(
    engine: Arc<SyncEngine>,
    interval: Duration,
    on_startup: bool,
    events: mpsc::Sender<WatchEvent>,
    stop: CancellationToken,
) {
    let first = if on_startup {
        Instant::now()
    } else {
        Instant::now() + interval
    };
    let mut ticks = tokio::time::interval_at(first, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticks.tick() => {}
        }
        let result = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            result = engine.reconcile() => result,
        };
        if events.send(WatchEvent::Pulled(result)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{PulledEpisodes, DEFAULT_WINDOW};
    use crate::testing::{episode, show, watched, FakeLibrary, FakeRemote};
    use tempfile::TempDir;

    fn service(library: FakeLibrary, remote: FakeRemote, dir: &TempDir) -> (WatchService, Arc<FakeRemote>) {
        let ledger = PulledEpisodes::open(dir.path().join("tvmaze.sqlite"), DEFAULT_WINDOW).unwrap();
        let remote = Arc::new(remote);
        let engine = SyncEngine::new(Arc::new(library), remote.clone(), ledger);
        (WatchService::new(Arc::new(engine), Duration::from_secs(3600)), remote)
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_handled_while_slow_pull_runs() {
        let dir = TempDir::new().unwrap();
        let pull_time = DEFAULT_WINDOW * 3;
        let (service, remote) = service(
            FakeLibrary::new(vec![show(1, "Show", &[("tvmaze", "55")])])
                .with_episodes(vec![episode(10, 1, 1, 1, 0), episode(11, 1, 1, 2, 1)]),
            FakeRemote::authorized()
                .with_watchlist("55", vec![watched(Some(1), Some(1))])
                .with_slow_watchlist(pull_time),
            &dir,
        );
        let (change_tx, change_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let started = Instant::now();
        let running = tokio::spawn(service.run(change_rx, event_tx, shutdown.clone()));

        change_tx
            .send(EpisodeChange { episode_id: 11, playcount: 1 })
            .await
            .unwrap();
        match event_rx.recv().await.unwrap() {
            WatchEvent::Changed { episode_id, result } => {
                assert_eq!(episode_id, 11);
                assert!(matches!(result, Ok(ChangeOutcome::Pushed { .. })));
            }
            other => panic!("change waited for the pull: {other:?}"),
        }
        assert!(started.elapsed() < pull_time);

        match event_rx.recv().await.unwrap() {
            WatchEvent::Pulled(result) => assert_eq!(result.unwrap().episodes_pulled, 1),
            other => panic!("unexpected event: {other:?}"),
        }

        // The library notification caused by the pull itself
        change_tx
            .send(EpisodeChange { episode_id: 10, playcount: 1 })
            .await
            .unwrap();
        match event_rx.recv().await.unwrap() {
            WatchEvent::Changed { episode_id, result } => {
                assert_eq!(episode_id, 10);
                assert_eq!(result.unwrap(), ChangeOutcome::Suppressed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(remote.sent().len(), 1);

        shutdown.cancel();
        running.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_change_feed_closes() {
        let dir = TempDir::new().unwrap();
        let (service, remote) = service(
            FakeLibrary::new(vec![show(1, "Show", &[("tvmaze", "55")])]),
            FakeRemote::authorized(),
            &dir,
        );
        let (change_tx, change_rx) = mpsc::channel(1);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        drop(change_tx);

        service
            .with_pull_on_startup(false)
            .run(change_rx, event_tx, CancellationToken::new())
            .await;
        assert!(event_rx.recv().await.is_none());
        assert!(remote.watchlist_requests().is_empty());
    }
}
