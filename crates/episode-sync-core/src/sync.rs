use episode_sync_models::{EpisodeChange, EpisodeRecord, ShowIdentity, StatusType, TvShow};
use episode_sync_sources::{
    EpisodeFilter, LibraryError, MediaLibrary, RemoteService, SendOutcome,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::error::SyncError;
use crate::ledger::PulledEpisodes;
use crate::projector::project_now;
use crate::resolver::IdentityResolver;

/// Receives progress of a long-running sync operation
pub trait ProgressSink: Send + Sync {
    fn update(&self, percent: u8, message: &str);

    fn finish(&self) {}
}

/// Progress sink that discards updates
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _percent: u8, _message: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Completed,
    CompletedWithErrors,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub shows_total: usize,
    pub shows_pushed: usize,
    pub shows_skipped: usize,
    pub episodes_sent: usize,
    pub episodes_pulled: usize,
    /// Push failures, including partial ones. These set the terminal status.
    pub errors: Vec<String>,
    /// Pull problems that did not stop the operation
    pub warnings: Vec<String>,
    pub duration: Duration,
}

impl SyncReport {
    pub fn status(&self) -> SyncStatus {
        if self.errors.is_empty() {
            SyncStatus::Completed
        } else {
            SyncStatus::CompletedWithErrors
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// What happened to a single observed playcount change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The change came from our own pull and was not pushed back
    Suppressed,
    /// The show has no TVmaze id
    Unresolved,
    Pushed { remote_id: String, episodes: usize },
    PartiallyPushed { remote_id: String, message: String },
}

type ResolutionCache = HashMap<i64, Option<ShowIdentity>>;

/// Pushes library state to TVmaze and pulls watched state back.
///
/// Operations run show by show on the calling task. Per-show failures are logged and recorded
/// in the report; only missing credentials or an empty library abort an operation.
pub struct SyncEngine {
    library: Arc<dyn MediaLibrary>,
    remote: Arc<dyn RemoteService>,
    resolver: IdentityResolver,
    ledger: PulledEpisodes,
}

impl SyncEngine {
    pub fn new(
        library: Arc<dyn MediaLibrary>,
        remote: Arc<dyn RemoteService>,
        ledger: PulledEpisodes,
    ) -> Self {
        let resolver = IdentityResolver::new(library.clone(), remote.clone());
        Self {
            library,
            remote,
            resolver,
            ledger,
        }
    }

    pub fn ledger(&self) -> &PulledEpisodes {
        &self.ledger
    }

    fn ensure_authorized(&self) -> Result<(), SyncError> {
        if self.remote.is_authorized() {
            Ok(())
        } else {
            warn!("Not authorized on TVmaze");
            Err(SyncError::NotAuthorized)
        }
    }

    async fn fetch_shows(&self) -> Result<Vec<TvShow>, SyncError> {
        match self.library.list_shows().await {
            Ok(shows) if !shows.is_empty() => {
                debug!(count = shows.len(), "TV shows from library");
                Ok(shows)
            }
            Ok(_) | Err(LibraryError::NoData(_)) => {
                warn!("Media library has no TV shows");
                Err(SyncError::EmptyLibrary)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Push every episode of every show, after pulling watched state from TVmaze
    #[instrument(skip(self, progress), fields(operation = "push_all"))]
    pub async fn push_all(&self, progress: &dyn ProgressSink) -> Result<SyncReport, SyncError> {
        self.ensure_authorized()?;
        info!("Pushing all episodes to TVmaze");
        let start = Instant::now();
        let mut report = SyncReport::default();
        let mut cache = ResolutionCache::new();

        let shows = self.fetch_shows().await?;
        self.reconcile_shows(&shows, &mut cache, &mut report).await;

        let total = shows.len();
        report.shows_total = total;
        for (index, show) in shows.iter().enumerate() {
            self.push_show(show, &mut cache, &mut report).await;
            let done = index + 1;
            progress.update(
                (100 * done / total) as u8,
                &format!("Pushing episodes for show \"{}\": {}/{}", show.label, done, total),
            );
        }
        progress.finish();

        report.duration = start.elapsed();
        info!(
            shows = report.shows_total,
            pushed = report.shows_pushed,
            skipped = report.shows_skipped,
            episodes = report.episodes_sent,
            errors = report.errors.len(),
            duration_ms = report.duration.as_millis() as u64,
            "Push completed"
        );
        Ok(report)
    }

    async fn push_show(&self, show: &TvShow, cache: &mut ResolutionCache, report: &mut SyncReport) {
        let Some(identity) = self.resolver.resolve_cached(show, cache).await else {
            report.shows_skipped += 1;
            return;
        };

        let episodes = match self.library.list_episodes(show.show_id, None).await {
            Ok(episodes) => episodes,
            Err(LibraryError::NoData(_)) => {
                warn!(show_id = show.show_id, show = %show.label, "TV show has no episodes");
                report.shows_skipped += 1;
                return;
            }
            Err(e) => {
                error!(show_id = show.show_id, show = %show.label, error = %e, "Unable to read episodes");
                report.errors.push(format!("{}: {}", show.label, e));
                return;
            }
        };
        debug!(show = %show.label, count = episodes.len(), "Episodes from library");

        self.send_batch(&show.label, &identity, &episodes, report).await;
    }

    async fn send_batch(
        &self,
        label: &str,
        identity: &ShowIdentity,
        episodes: &[EpisodeRecord],
        report: &mut SyncReport,
    ) {
        let updates = project_now(episodes);
        match self.remote.send_episodes(&updates, &identity.external_id()).await {
            Ok(SendOutcome::Accepted) => {
                report.shows_pushed += 1;
                report.episodes_sent += updates.len();
            }
            Ok(SendOutcome::Partial(message)) => {
                warn!(show = %label, tvmaze_id = %identity.remote_id, message = %message, "Some episodes were not updated");
                report.shows_pushed += 1;
                report.episodes_sent += updates.len();
                report.errors.push(format!("{}: partial update: {}", label, message));
            }
            Err(e) => {
                error!(show = %label, tvmaze_id = %identity.remote_id, error = %e, "Unable to push episodes");
                report.errors.push(format!("{}: {}", label, e));
            }
        }
    }

    /// Push recently added episodes, grouped into one batch per show
    #[instrument(skip(self), fields(operation = "push_recent"))]
    pub async fn push_recent(&self) -> Result<SyncReport, SyncError> {
        self.ensure_authorized()?;
        info!("Pushing recent episodes to TVmaze");
        let start = Instant::now();
        let mut report = SyncReport::default();
        let mut cache = ResolutionCache::new();

        let shows = self.fetch_shows().await?;
        self.reconcile_shows(&shows, &mut cache, &mut report).await;

        let recent = match self.library.recent_episodes().await {
            Ok(episodes) => episodes,
            Err(LibraryError::NoData(_)) => {
                info!("No recent episodes");
                report.duration = start.elapsed();
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        };
        debug!(count = recent.len(), "Recent episodes from library");

        let known: HashMap<i64, &TvShow> = shows.iter().map(|s| (s.show_id, s)).collect();
        let mut groups: Vec<(String, ShowIdentity, Vec<EpisodeRecord>)> = Vec::new();
        let mut group_index: HashMap<i64, usize> = HashMap::new();
        let mut skipped: HashSet<i64> = HashSet::new();

        for episode in recent {
            if let Some(&index) = group_index.get(&episode.show_id) {
                groups[index].2.push(episode);
                continue;
            }
            if matches!(cache.get(&episode.show_id), Some(None)) {
                skipped.insert(episode.show_id);
                continue;
            }

            let show = match known.get(&episode.show_id) {
                Some(show) => (*show).clone(),
                None => match self.library.get_show(episode.show_id).await {
                    Ok(show) => show,
                    Err(e) => {
                        error!(show_id = episode.show_id, error = %e, "Unable to read show details");
                        cache.insert(episode.show_id, None);
                        skipped.insert(episode.show_id);
                        continue;
                    }
                },
            };
            match self.resolver.resolve_cached(&show, &mut cache).await {
                Some(identity) => {
                    group_index.insert(episode.show_id, groups.len());
                    groups.push((show.label, identity, vec![episode]));
                }
                None => {
                    skipped.insert(episode.show_id);
                }
            }
        }

        report.shows_skipped = skipped.len();
        report.shows_total = groups.len() + skipped.len();
        for (label, identity, episodes) in &groups {
            self.send_batch(label, identity, episodes, &mut report).await;
        }

        report.duration = start.elapsed();
        info!(
            shows = report.shows_pushed,
            episodes = report.episodes_sent,
            errors = report.errors.len(),
            "Push completed"
        );
        Ok(report)
    }

    /// Mark library episodes watched where TVmaze says they are
    #[instrument(skip(self), fields(operation = "pull"))]
    pub async fn reconcile(&self) -> Result<SyncReport, SyncError> {
        self.ensure_authorized()?;
        let start = Instant::now();
        let mut report = SyncReport::default();
        let mut cache = ResolutionCache::new();

        let shows = self.fetch_shows().await?;
        report.shows_total = shows.len();
        self.reconcile_shows(&shows, &mut cache, &mut report).await;

        report.duration = start.elapsed();
        info!(
            episodes = report.episodes_pulled,
            shows = report.shows_total,
            "Pulled watched episodes from TVmaze"
        );
        Ok(report)
    }

    async fn reconcile_shows(
        &self,
        shows: &[TvShow],
        cache: &mut ResolutionCache,
        report: &mut SyncReport,
    ) {
        debug!("Pulling watched episodes from TVmaze");
        for show in shows {
            let Some(identity) = self.resolver.resolve_cached(show, cache).await else {
                continue;
            };

            let watchlist = match self
                .remote
                .get_watchlist(&identity.remote_id, Some(StatusType::Watched))
                .await
            {
                Ok(watchlist) => watchlist,
                Err(e) => {
                    error!(show = %show.label, tvmaze_id = %identity.remote_id, error = %e, "Unable to get watchlist");
                    report.warnings.push(format!("{}: {}", show.label, e));
                    continue;
                }
            };
            debug!(tvmaze_id = %identity.remote_id, count = watchlist.len(), "Episodes from TVmaze");

            for entry in watchlist {
                if entry.status != StatusType::Watched {
                    continue;
                }
                let (Some(season), Some(number)) = (entry.season, entry.number) else {
                    continue;
                };
                if season == 0 {
                    continue;
                }

                let filter = EpisodeFilter::unwatched_at(season, number);
                let local = match self.library.list_episodes(show.show_id, Some(&filter)).await {
                    Ok(episodes) => episodes.into_iter().next(),
                    Err(LibraryError::NoData(_)) => None,
                    Err(e) => {
                        warn!(show_id = show.show_id, season, number, error = %e, "Unable to look up local episode");
                        report.warnings.push(format!("{} S{:02}E{:02}: {}", show.label, season, number, e));
                        None
                    }
                };
                let Some(local) = local else {
                    continue;
                };

                // Record the pull before the write so the resulting notification is recognised
                if let Err(e) = self.ledger.mark_pulled(local.episode_id) {
                    error!(episode_id = local.episode_id, error = %e, "Unable to record pulled episode");
                    report.warnings.push(format!("episode {}: {}", local.episode_id, e));
                    continue;
                }
                match self.library.set_episode_playcount(local.episode_id).await {
                    Ok(()) => {
                        debug!(episode_id = local.episode_id, show = %show.label, season, number, "Marked episode watched");
                        report.episodes_pulled += 1;
                    }
                    Err(e) => {
                        error!(episode_id = local.episode_id, error = %e, "Unable to mark episode watched");
                        report.warnings.push(format!("episode {}: {}", local.episode_id, e));
                    }
                }
            }
        }
    }

    /// Push a single episode whose playcount changed in the library
    #[instrument(skip(self, change), fields(operation = "episode_change", episode_id = change.episode_id))]
    pub async fn handle_change(&self, change: EpisodeChange) -> Result<ChangeOutcome, SyncError> {
        self.ensure_authorized()?;

        match self.ledger.was_recently_pulled(change.episode_id) {
            Ok(true) => {
                debug!("Episode was just pulled from TVmaze, not pushing it back");
                return Ok(ChangeOutcome::Suppressed);
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Unable to read pulled episodes, pushing anyway"),
        }

        let episode = self.library.get_episode(change.episode_id).await?;
        let show = self.library.get_show(episode.show_id).await?;
        let identity = match self.resolver.resolve(&show).await {
            Ok(identity) => identity,
            Err(e) => {
                error!(show = %show.label, unique_ids = ?show.unique_ids, error = %e, "Unable to determine TVmaze id from show info");
                return Ok(ChangeOutcome::Unresolved);
            }
        };

        let updates = project_now(std::slice::from_ref(&episode));
        match self.remote.send_episodes(&updates, &identity.external_id()).await {
            Ok(SendOutcome::Accepted) => {
                info!(show = %show.label, season = episode.season, episode = episode.episode, "Pushed episode status");
                Ok(ChangeOutcome::Pushed {
                    remote_id: identity.remote_id,
                    episodes: updates.len(),
                })
            }
            Ok(SendOutcome::Partial(message)) => Ok(ChangeOutcome::PartiallyPushed {
                remote_id: identity.remote_id,
                message,
            }),
            Err(e) => {
                error!(episode = ?episode, error = %e, "Failed to push episode status");
                Err(e.into())
            }
        }
    }
}
