use super::context::AppContext;
use crate::output::Output;
use color_eyre::Result;
use episode_sync_config::PathManager;
use episode_sync_core::{ChangeOutcome, SyncError, SyncReport, WatchEvent, WatchService};
use episode_sync_models::EpisodeChange;
use episode_sync_sources::{ChangeFeed, KodiNotifications};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(15);
const CHANNEL_CAPACITY: usize = 32;

/// The watch service logs to a rolling file instead of stderr
pub fn log_file() -> PathBuf {
    PathManager::default().watch_log_file()
}

pub async fn run_watch(no_startup_pull: bool, output: &Output) -> Result<()> {
    let context = AppContext::load()?;
    if context.credentials.get_credentials().is_none() {
        output.error("Not authorized on TVmaze. Run `mazesync authorize` first.");
        return Err(SyncError::NotAuthorized.into());
    }

    let engine = Arc::new(context.engine()?);
    let retention = context.config.sync.ledger_retention();
    match engine.ledger().prune(retention) {
        Ok(removed) => info!(removed, "Pruned pulled-episode ledger"),
        Err(e) => warn!(error = %e, "Failed to prune pulled-episode ledger"),
    }

    let shutdown = CancellationToken::new();
    let ctrl_c = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, stopping watch service");
                shutdown.cancel();
            }
        })
    };

    output.info(format!(
        "Watching Kodi at {} for playcount changes. Press Ctrl-C to stop.",
        context.config.kodi.notifications
    ));
    output.info(format!("Logs: {}", log_file().display()));

    let (change_tx, change_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, mut event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_feed(
        context.config.kodi.notifications.clone(),
        change_tx,
        shutdown.clone(),
    ));
    let service = WatchService::new(engine, context.config.watch.pull_interval())
        .with_pull_on_startup(context.config.watch.pull_on_startup && !no_startup_pull);
    let running = tokio::spawn(service.run(change_rx, event_tx, shutdown.clone()));

    // Closes once the service has stopped
    while let Some(event) = event_rx.recv().await {
        match event {
            WatchEvent::Pulled(result) => report_pull(result, output),
            WatchEvent::Changed { episode_id, result } => report_change(episode_id, result, output),
        }
    }

    shutdown.cancel();
    if let Err(e) = running.await {
        error!(error = %e, "Watch service task failed");
    }
    if let Err(e) = reader.await {
        error!(error = %e, "Kodi notification reader failed");
    }
    ctrl_c.abort();
    output.success("Watch service stopped");
    Ok(())
}

/// Forward playcount changes from Kodi, reconnecting as needed, until shutdown
async fn read_feed(address: String, changes: mpsc::Sender<EpisodeChange>, shutdown: CancellationToken) {
    let mut feed: Option<KodiNotifications> = None;
    loop {
        let change = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            change = next_change(&mut feed, &address) => change,
        };
        if let Some(change) = change {
            if changes.send(change).await.is_err() {
                break;
            }
        }
    }
}

/// Next playcount change from Kodi, connecting first when needed.
/// Returns `None` after a lost connection so the reader can check for shutdown.
async fn next_change(feed: &mut Option<KodiNotifications>, address: &str) -> Option<EpisodeChange> {
    if feed.is_none() {
        match KodiNotifications::connect(address).await {
            Ok(connected) => *feed = Some(connected),
            Err(e) => {
                warn!(address, error = %e, "Unable to connect to Kodi notifications, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
                return None;
            }
        }
    }

    let connected = feed.as_mut()?;
    match connected.next_change().await {
        Ok(Some(change)) => Some(change),
        Ok(None) => {
            *feed = None;
            tokio::time::sleep(RECONNECT_DELAY).await;
            None
        }
        Err(e) => {
            warn!(error = %e, "Kodi notification stream failed, reconnecting");
            *feed = None;
            tokio::time::sleep(RECONNECT_DELAY).await;
            None
        }
    }
}

fn report_pull(result: Result<SyncReport, SyncError>, output: &Output) {
    match result {
        Ok(report) if report.episodes_pulled > 0 => {
            output.success(format!("Marked {} episode(s) watched from TVmaze", report.episodes_pulled));
        }
        Ok(_) => {}
        Err(SyncError::EmptyLibrary) => warn!("Kodi library has no TV shows"),
        Err(e) => {
            error!(error = %e, "Pull from TVmaze failed");
            output.warn(format!("Pull from TVmaze failed: {}", e));
        }
    }
}

fn report_change(episode_id: i64, result: Result<ChangeOutcome, SyncError>, output: &Output) {
    match result {
        Ok(ChangeOutcome::Pushed { remote_id, episodes }) => {
            info!(episode_id, remote_id = %remote_id, episodes, "Episode change pushed");
            output.success(format!("Updated episode {} on TVmaze", episode_id));
        }
        Ok(ChangeOutcome::PartiallyPushed { remote_id, message }) => {
            output.warn(format!(
                "Episode {} partially updated on TVmaze show {}: {}",
                episode_id, remote_id, message
            ));
        }
        Ok(ChangeOutcome::Suppressed) => {}
        Ok(ChangeOutcome::Unresolved) => {
            output.warn(format!("Episode {} belongs to a show without a TVmaze id", episode_id));
        }
        Err(e) => {
            output.warn(format!("Failed to push episode {}: {}", episode_id, e));
        }
    }
}
