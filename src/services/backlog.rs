//! Backlog discovery and the backlog searcher.
//!
//! A full pass looks at every aired episode since the epoch and then records
//! today's ordinal as the "last backlog" marker. Between full passes the
//! searcher only looks at the last few days, so a pass is cheap until the
//! cycle comes round again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{Days, Local, NaiveDate};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::events::NotificationEvent;
use crate::domain::{CompositeStatus, EpisodeState, ORDINAL_EPOCH, epoch_date, to_ordinal};
use crate::models::{Segment, Show};
use crate::quality::Quality;
use crate::services::{
    BacklogMarkerStore, LibraryError, LibraryService, Notifier, QueueItem, SearchQueue,
};

/// Whether an episode with `status` still belongs in the backlog.
///
/// WANTED always does; a snatched or downloaded episode does while its
/// quality is below the show's best preferred tier.
#[must_use]
pub fn is_wanted(status: CompositeStatus, highest_best: Quality) -> bool {
    let (state, quality) = status.decompose();
    state == EpisodeState::Wanted || (state.is_snatched_or_downloaded() && quality < highest_best)
}

/// Wanted episodes of `show` that aired after `from_date`, grouped by season.
pub async fn wanted_segments(
    library: &dyn LibraryService,
    show: &Show,
    from_date: NaiveDate,
) -> Result<Segment, LibraryError> {
    debug!(show = %show.name, from = %from_date, "Seeing if we need anything");

    let highest_best = show.quality.highest_best();
    let episodes = library.backlog_episodes(show, from_date).await?;

    Ok(episodes
        .into_iter()
        .filter(|episode| is_wanted(episode.status, highest_best))
        .collect())
}

/// Normalises a raw marker value: missing, blank, unparseable or future
/// values all become the epoch.
#[must_use]
pub fn normalize_marker(raw: Option<&str>, today: i64) -> i64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return ORDINAL_EPOCH;
    };

    match raw.parse::<i64>() {
        Ok(value) if value > today => {
            warn!(marker = value, today, "Last backlog marker is in the future, resetting");
            ORDINAL_EPOCH
        }
        Ok(value) => value.max(ORDINAL_EPOCH),
        Err(_) => {
            warn!(marker = raw, "Last backlog marker is corrupt, resetting");
            ORDINAL_EPOCH
        }
    }
}

/// How far along the current pass is.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SearchProgress {
    pub percent: u8,
    pub current: Option<String>,
}

struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct BacklogSearcher {
    library: Arc<dyn LibraryService>,
    markers: Arc<dyn BacklogMarkerStore>,
    queue: Arc<SearchQueue>,
    notifier: Arc<dyn Notifier>,
    cycle_days: i64,
    recent_days: i64,
    last_backlog: AtomicI64,
    active: AtomicBool,
    paused: AtomicBool,
    waiting: AtomicBool,
    progress: RwLock<SearchProgress>,
}

impl BacklogSearcher {
    /// Builds the searcher and loads the persisted marker.
    pub async fn new(
        library: Arc<dyn LibraryService>,
        markers: Arc<dyn BacklogMarkerStore>,
        queue: Arc<SearchQueue>,
        notifier: Arc<dyn Notifier>,
        cycle_days: u32,
        recent_days: u32,
    ) -> Result<Self, LibraryError> {
        let searcher = Self {
            library,
            markers,
            queue,
            notifier,
            cycle_days: i64::from(cycle_days.max(1)),
            recent_days: i64::from(recent_days),
            last_backlog: AtomicI64::new(ORDINAL_EPOCH),
            active: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            waiting: AtomicBool::new(false),
            progress: RwLock::new(SearchProgress::default()),
        };
        searcher.load_marker(Local::now().date_naive()).await?;
        Ok(searcher)
    }

    #[must_use]
    pub const fn cycle_days(&self) -> i64 {
        self.cycle_days
    }

    /// Last loaded marker value (ordinal day).
    #[must_use]
    pub fn last_backlog(&self) -> i64 {
        self.last_backlog.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Administrative pause: the scheduler skips its ticks while set. Any
    /// pass that does start clears it.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn set_waiting(&self, waiting: bool) {
        self.waiting.store(waiting, Ordering::SeqCst);
    }

    /// Active and not parked waiting on something else.
    #[must_use]
    pub fn am_running(&self) -> bool {
        !self.waiting.load(Ordering::SeqCst) && self.is_active()
    }

    pub async fn progress(&self) -> SearchProgress {
        if self.is_active() {
            self.progress.read().await.clone()
        } else {
            SearchProgress::default()
        }
    }

    /// Rereads the persisted marker and caches the normalised value.
    pub async fn load_marker(&self, today: NaiveDate) -> Result<i64, LibraryError> {
        let raw = self.markers.read_last_backlog().await?;
        let value = normalize_marker(raw.as_deref(), to_ordinal(today));
        self.last_backlog.store(value, Ordering::SeqCst);
        Ok(value)
    }

    pub async fn set_marker(&self, ordinal: i64) -> Result<(), LibraryError> {
        info!(marker = ordinal, "Setting the last backlog in the DB");
        self.markers.write_last_backlog(ordinal).await?;
        self.last_backlog.store(ordinal, Ordering::SeqCst);
        Ok(())
    }

    /// Forces the next pass to be a full one.
    pub async fn reset_marker(&self) -> Result<(), LibraryError> {
        self.set_marker(ORDINAL_EPOCH).await
    }

    pub async fn run(&self, shows: Option<Vec<Show>>) -> Result<usize, LibraryError> {
        self.run_on(Local::now().date_naive(), shows).await
    }

    /// One backlog pass as of `today`. Returns the number of items queued.
    ///
    /// A no-op while another pass is active. With `shows` given, only those
    /// shows are searched and the marker is left alone.
    pub async fn run_on(&self, today: NaiveDate, shows: Option<Vec<Show>>) -> Result<usize, LibraryError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Backlog is still running, not starting it again");
            return Ok(0);
        }
        let _active = ActiveGuard(&self.active);
        self.paused.store(false, Ordering::SeqCst);

        let last_backlog = self.load_marker(today).await?;
        let today_ordinal = to_ordinal(today);

        let from_date = if shows.is_none() && today_ordinal - last_backlog < self.cycle_days {
            today
                .checked_sub_days(Days::new(self.recent_days.unsigned_abs()))
                .unwrap_or_else(epoch_date)
        } else {
            epoch_date()
        };
        let full = from_date == epoch_date();
        let scope = if shows.is_some() {
            "selected"
        } else if full {
            "full"
        } else {
            "recent"
        };

        let filtered = shows.is_some();
        let shows = match shows {
            Some(shows) => shows,
            None => self.library.list_shows().await?,
        };

        info!(
            event = "backlog_started",
            scope,
            from = %from_date,
            shows = shows.len(),
            "Running backlog search"
        );
        metrics::counter!("backlog_passes_total", "scope" => scope).increment(1);
        self.notifier.publish(NotificationEvent::BacklogStarted {
            scope: scope.to_string(),
        });

        let total = shows.len();
        let mut queued = 0;
        for (index, show) in shows.into_iter().enumerate() {
            self.set_progress(index, total, Some(show.name.clone())).await;

            if show.paused {
                debug!(show = %show.name, "Skipping backlog for paused show");
                continue;
            }

            let segment = wanted_segments(self.library.as_ref(), &show, from_date).await?;
            if segment.is_empty() {
                debug!(show = %show.name, "Nothing needs to be downloaded, skipping");
                continue;
            }

            let name = show.name.clone();
            if self.queue.add(QueueItem::backlog(show, segment)).await {
                queued += 1;
            } else {
                debug!(show = %name, "Backlog search already queued");
            }
        }
        self.set_progress(total, total, None).await;

        if full && !filtered {
            self.set_marker(today_ordinal).await?;
        }

        info!(event = "backlog_finished", scope, queued, "Backlog search finished");
        self.notifier
            .publish(NotificationEvent::BacklogFinished { queued });

        Ok(queued)
    }

    async fn set_progress(&self, done: usize, total: usize, current: Option<String>) {
        let percent = if total == 0 {
            100
        } else {
            u8::try_from(done * 100 / total).unwrap_or(100)
        };
        *self.progress.write().await = SearchProgress { percent, current };
    }

    #[cfg(test)]
    pub(crate) fn force_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EpisodeKey, from_ordinal};
    use crate::quality::QualityProfile;
    use crate::services::testing::{Harness, RecordingNotifier, episode, show};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn days_ago(n: u64) -> Option<NaiveDate> {
        today().checked_sub_days(Days::new(n))
    }

    async fn searcher(h: &Harness) -> (BacklogSearcher, Arc<SearchQueue>) {
        let queue = Arc::new(SearchQueue::new(h.snatcher.clone()));
        let searcher = BacklogSearcher::new(
            h.library.clone(),
            h.library.clone(),
            Arc::clone(&queue),
            Arc::new(RecordingNotifier::default()),
            7,
            7,
        )
        .await
        .unwrap();
        (searcher, queue)
    }

    #[test]
    fn wanted_rules() {
        let best = Quality::FULLHDBLURAY;
        let status = |s, q| CompositeStatus::compose(s, q);

        assert!(is_wanted(status(EpisodeState::Wanted, Quality::NONE), Quality::NONE));
        assert!(is_wanted(status(EpisodeState::Downloaded, Quality::HDTV), best));
        assert!(is_wanted(status(EpisodeState::SnatchedProper, Quality::HDTV), best));
        assert!(!is_wanted(status(EpisodeState::Downloaded, best), best));
        assert!(!is_wanted(status(EpisodeState::Downloaded, Quality::HDTV), Quality::NONE));
        assert!(!is_wanted(status(EpisodeState::Skipped, Quality::NONE), best));
        assert!(!is_wanted(status(EpisodeState::Archived, Quality::HDTV), best));
        assert!(!is_wanted(status(EpisodeState::Failed, Quality::HDTV), best));
    }

    #[test]
    fn marker_normalisation() {
        let today = to_ordinal(today());
        assert_eq!(normalize_marker(None, today), ORDINAL_EPOCH);
        assert_eq!(normalize_marker(Some(""), today), ORDINAL_EPOCH);
        assert_eq!(normalize_marker(Some("  "), today), ORDINAL_EPOCH);
        assert_eq!(normalize_marker(Some("yesterday"), today), ORDINAL_EPOCH);
        assert_eq!(normalize_marker(Some(&(today + 1).to_string()), today), ORDINAL_EPOCH);
        assert_eq!(normalize_marker(Some("0"), today), ORDINAL_EPOCH);
        assert_eq!(normalize_marker(Some(&(today - 3).to_string()), today), today - 3);
    }

    #[tokio::test]
    async fn discovery_keeps_wanted_and_upgradable_episodes() {
        let mut upgrading = show(1, "Alpha");
        upgrading.quality = QualityProfile::new(vec![Quality::HDTV], vec![Quality::HDBLURAY]);
        let h = Harness::new(
            vec![upgrading.clone()],
            vec![
                episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE),
                episode(1, 1, 2, days_ago(90), EpisodeState::Downloaded, Quality::HDTV),
                episode(1, 1, 3, days_ago(80), EpisodeState::Downloaded, Quality::HDBLURAY),
                episode(1, 1, 4, days_ago(70), EpisodeState::Skipped, Quality::NONE),
                episode(1, 0, 1, days_ago(60), EpisodeState::Wanted, Quality::NONE),
                episode(1, 2, 1, None, EpisodeState::Wanted, Quality::NONE),
            ],
        );

        let segment = wanted_segments(h.library.as_ref(), &upgrading, epoch_date())
            .await
            .unwrap();

        assert_eq!(
            segment.episode_keys().into_iter().collect::<Vec<_>>(),
            vec![EpisodeKey::new(1, 1), EpisodeKey::new(1, 2)]
        );
    }

    #[tokio::test]
    async fn discovery_respects_the_from_date() {
        let alpha = show(1, "Alpha");
        let h = Harness::new(
            vec![alpha.clone()],
            vec![
                episode(1, 1, 1, days_ago(30), EpisodeState::Wanted, Quality::NONE),
                episode(1, 1, 2, days_ago(7), EpisodeState::Wanted, Quality::NONE),
                episode(1, 1, 3, days_ago(2), EpisodeState::Wanted, Quality::NONE),
            ],
        );

        let segment = wanted_segments(h.library.as_ref(), &alpha, today() - Days::new(7))
            .await
            .unwrap();
        assert_eq!(segment.episode_count(), 1);
    }

    #[tokio::test]
    async fn full_pass_advances_the_marker() {
        let h = Harness::new(
            vec![show(1, "Alpha"), show(2, "Beta")],
            vec![
                episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE),
                episode(2, 1, 1, days_ago(50), EpisodeState::Downloaded, Quality::HDTV),
            ],
        );
        let (searcher, queue) = searcher(&h).await;

        let queued = searcher.run_on(today(), None).await.unwrap();

        assert_eq!(queued, 1);
        assert_eq!(queue.len().await, 1);
        assert_eq!(h.library.marker_writes(), vec![to_ordinal(today())]);
        assert_eq!(searcher.last_backlog(), to_ordinal(today()));
        assert!(!searcher.is_active());
    }

    #[tokio::test]
    async fn recent_pass_leaves_the_marker_alone() {
        let h = Harness::new(
            vec![show(1, "Alpha")],
            vec![
                episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE),
                episode(1, 1, 2, days_ago(3), EpisodeState::Wanted, Quality::NONE),
            ],
        );
        let marker = to_ordinal(today()) - 2;
        h.library.set_marker(Some(&marker.to_string()));
        let (searcher, queue) = searcher(&h).await;

        searcher.run_on(today(), None).await.unwrap();

        assert!(h.library.marker_writes().is_empty());
        let snapshot = queue.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].episodes, 1);
    }

    #[tokio::test]
    async fn stale_marker_triggers_a_full_pass() {
        let h = Harness::new(
            vec![show(1, "Alpha")],
            vec![episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE)],
        );
        let marker = to_ordinal(today()) - 7;
        h.library.set_marker(Some(&marker.to_string()));
        let (searcher, _queue) = searcher(&h).await;

        assert_eq!(searcher.run_on(today(), None).await.unwrap(), 1);
        assert_eq!(h.library.marker_writes(), vec![to_ordinal(today())]);
    }

    #[tokio::test]
    async fn corrupt_or_future_marker_means_full_pass() {
        for raw in ["garbage", "", "99999999"] {
            let h = Harness::new(
                vec![show(1, "Alpha")],
                vec![episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE)],
            );
            h.library.set_marker(Some(raw));
            let (searcher, _queue) = searcher(&h).await;
            assert_eq!(searcher.last_backlog(), ORDINAL_EPOCH);

            searcher.run_on(today(), None).await.unwrap();
            assert_eq!(h.library.marker_writes(), vec![to_ordinal(today())], "marker {raw:?}");
        }
    }

    #[tokio::test]
    async fn show_filter_never_touches_the_marker() {
        let alpha = show(1, "Alpha");
        let h = Harness::new(
            vec![alpha.clone(), show(2, "Beta")],
            vec![
                episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE),
                episode(2, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE),
            ],
        );
        let (searcher, queue) = searcher(&h).await;

        assert_eq!(searcher.run_on(today(), Some(vec![alpha])).await.unwrap(), 1);
        assert!(h.library.marker_writes().is_empty());
        assert_eq!(queue.snapshot().await[0].show, "Alpha");
    }

    #[tokio::test]
    async fn paused_shows_are_skipped() {
        let mut alpha = show(1, "Alpha");
        alpha.paused = true;
        let h = Harness::new(
            vec![alpha],
            vec![episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE)],
        );
        let (searcher, queue) = searcher(&h).await;

        assert_eq!(searcher.run_on(today(), None).await.unwrap(), 0);
        assert!(queue.is_empty().await);
        assert_eq!(h.library.marker_writes(), vec![to_ordinal(today())]);
    }

    #[tokio::test]
    async fn second_pass_does_not_duplicate_queued_work() {
        let h = Harness::new(
            vec![show(1, "Alpha")],
            vec![episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE)],
        );
        let (searcher, queue) = searcher(&h).await;

        searcher.run_on(today(), None).await.unwrap();
        h.library.set_marker(None);
        assert_eq!(searcher.run_on(today(), None).await.unwrap(), 0);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn active_searcher_ignores_new_runs() {
        let h = Harness::new(
            vec![show(1, "Alpha")],
            vec![episode(1, 1, 1, days_ago(100), EpisodeState::Wanted, Quality::NONE)],
        );
        let (searcher, queue) = searcher(&h).await;

        searcher.force_active(true);
        assert!(searcher.am_running());
        searcher.set_waiting(true);
        assert!(!searcher.am_running());
        searcher.set_waiting(false);

        assert_eq!(searcher.run_on(today(), None).await.unwrap(), 0);
        assert!(searcher.is_active());
        assert!(queue.is_empty().await);
        assert!(h.library.marker_writes().is_empty());
    }

    struct BrokenMarkers;

    #[async_trait::async_trait]
    impl BacklogMarkerStore for BrokenMarkers {
        async fn read_last_backlog(&self) -> Result<Option<String>, LibraryError> {
            Err(LibraryError::Database("database is locked".to_string()))
        }

        async fn write_last_backlog(&self, _: i64) -> Result<(), LibraryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn errors_clear_the_active_flag() {
        let h = Harness::new(vec![show(1, "Alpha")], vec![]);
        let (searcher, _queue) = searcher(&h).await;
        let broken = BacklogSearcher {
            markers: Arc::new(BrokenMarkers),
            ..searcher
        };

        assert!(broken.run_on(today(), None).await.is_err());
        assert!(!broken.is_active());
        assert!(!broken.am_running());
        assert!(h.library.marker_writes().is_empty());
    }

    #[test]
    fn epoch_round_trips() {
        assert_eq!(from_ordinal(ORDINAL_EPOCH), Some(epoch_date()));
    }
}
