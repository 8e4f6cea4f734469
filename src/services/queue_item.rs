//! Units of search work.
//!
//! Every item targets one show. Manual items search a single episode, backlog
//! items search a wanted [`Segment`] season by season, and failed-retry items
//! revert previously snatched episodes before searching for them again.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::slice;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::events::NotificationEvent;
use crate::domain::{EpisodeKey, ShowId};
use crate::models::{Episode, SearchResult, Segment, Show};
use crate::services::{
    FailedHistory, FailedRelease, LibraryError, LibraryService, Notifier, SearchOutcome,
    SearchProvider, SearchQueue, SearchRequest, search_providers,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ItemKind {
    Manual,
    Backlog,
    FailedRetry,
}

impl ItemKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Backlog => "backlog",
            Self::FailedRetry => "failed_retry",
        }
    }

    #[must_use]
    pub const fn priority(self) -> Priority {
        match self {
            Self::Manual | Self::FailedRetry => Priority::High,
            Self::Backlog => Priority::Low,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    Waiting,
    InProgress,
    Done,
}

/// Identity used for queue deduplication: the show plus the exact set of
/// episodes the item covers. The item kind is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub show_id: ShowId,
    pub episodes: BTreeSet<EpisodeKey>,
}

impl ItemKey {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum ItemTarget {
    Manual(Episode),
    Backlog(Segment),
    /// One episode per season, keyed by season.
    FailedRetry(BTreeMap<i32, Episode>),
}

/// Collaborators a work item needs while it runs.
pub struct ItemContext {
    pub provider: Arc<dyn SearchProvider>,
    pub library: Arc<dyn LibraryService>,
    pub failed_history: Arc<dyn FailedHistory>,
    pub notifier: Arc<dyn Notifier>,
    /// Never fall back to season packs, even when a whole season is wanted.
    pub prefer_episode_releases: bool,
}

#[derive(Debug, Clone)]
pub struct QueueItem {
    show: Show,
    target: ItemTarget,
    key: ItemKey,
    state: ItemState,
    success: Option<bool>,
    results: Vec<SearchResult>,
    added_at: DateTime<Utc>,
}

impl QueueItem {
    fn new(show: Show, target: ItemTarget) -> Self {
        let episodes = match &target {
            ItemTarget::Manual(episode) => BTreeSet::from([episode.key()]),
            ItemTarget::Backlog(segment) => segment.episode_keys(),
            ItemTarget::FailedRetry(episodes) => episodes.values().map(Episode::key).collect(),
        };
        let key = ItemKey {
            show_id: show.id,
            episodes,
        };

        Self {
            show,
            target,
            key,
            state: ItemState::Waiting,
            success: None,
            results: Vec::new(),
            added_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn manual(show: Show, episode: Episode) -> Self {
        Self::new(show, ItemTarget::Manual(episode))
    }

    #[must_use]
    pub fn backlog(show: Show, segment: Segment) -> Self {
        Self::new(show, ItemTarget::Backlog(segment))
    }

    /// Builds a retry item; later episodes of the same season replace earlier ones.
    /// [`SearchQueue::queue_failed_retry`] splits such episodes over several items.
    #[must_use]
    pub fn failed_retry(show: Show, episodes: impl IntoIterator<Item = Episode>) -> Self {
        let by_season = episodes
            .into_iter()
            .map(|episode| (episode.season, episode))
            .collect();
        Self::new(show, ItemTarget::FailedRetry(by_season))
    }

    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self.target {
            ItemTarget::Manual(_) => ItemKind::Manual,
            ItemTarget::Backlog(_) => ItemKind::Backlog,
            ItemTarget::FailedRetry(_) => ItemKind::FailedRetry,
        }
    }

    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.kind().priority()
    }

    #[must_use]
    pub const fn key(&self) -> &ItemKey {
        &self.key
    }

    #[must_use]
    pub fn name(&self) -> String {
        let prefix = match self.kind() {
            ItemKind::Manual => "MANUAL",
            ItemKind::Backlog => "BACKLOG",
            ItemKind::FailedRetry => "RETRY",
        };
        format!("{prefix}-{}", self.show.id)
    }

    #[must_use]
    pub const fn show(&self) -> &Show {
        &self.show
    }

    #[must_use]
    pub const fn target(&self) -> &ItemTarget {
        &self.target
    }

    #[must_use]
    pub const fn state(&self) -> ItemState {
        self.state
    }

    #[must_use]
    pub const fn success(&self) -> Option<bool> {
        self.success
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.success == Some(true)
    }

    #[must_use]
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    #[must_use]
    pub const fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == ItemState::Done
    }

    pub(crate) fn start(&mut self) {
        self.state = ItemState::InProgress;
    }

    /// Idempotent.
    pub(crate) fn finish(&mut self) {
        self.state = ItemState::Done;
    }

    pub(crate) fn record_results(&mut self, results: Vec<SearchResult>) {
        self.results.extend(results);
    }

    pub(crate) fn set_success(&mut self, success: bool) {
        self.success = Some(success);
    }

    /// Runs the item to completion. Collaborator failures are logged, never returned.
    pub async fn execute(&mut self, ctx: &ItemContext, queue: &SearchQueue) {
        match self.target.clone() {
            ItemTarget::Manual(episode) => self.execute_manual(ctx, queue, episode).await,
            ItemTarget::Backlog(segment) => self.execute_backlog(ctx, queue, &segment).await,
            ItemTarget::FailedRetry(episodes) => {
                self.execute_failed_retry(ctx, queue, episodes).await;
            }
        }
        self.finish();
    }

    async fn execute_manual(&mut self, ctx: &ItemContext, queue: &SearchQueue, episode: Episode) {
        let title = episode.pretty_name(&self.show.name, self.show.air_by_date);
        info!(item = %self.name(), "Beginning manual search for [{title}]");

        let request = SearchRequest {
            origin: ItemKind::Manual,
            show: &self.show,
            season: episode.season,
            episodes: slice::from_ref(&episode),
            season_pack: false,
            manual: true,
        };

        let outcome = search_providers(ctx.provider.as_ref(), &request).await;
        match outcome {
            SearchOutcome::Found(results) => {
                if let Some(best) = results.first() {
                    info!("Downloading {} from {}", best.name, best.provider);
                }
                queue.snatch_item(self, results).await;
            }
            SearchOutcome::NotFound => {
                ctx.notifier.message(
                    "No downloads were found",
                    &format!("Couldn't find a download for {title}"),
                );
                info!("Unable to find a download for {title}");
            }
            SearchOutcome::Failed(e) => {
                warn!(item = %self.name(), error = %e, "Manual search failed");
            }
        }
    }

    async fn execute_backlog(&mut self, ctx: &ItemContext, queue: &SearchQueue, segment: &Segment) {
        for (season, wanted) in segment.seasons() {
            if wanted.is_empty() {
                continue;
            }

            let season_pack = if ctx.prefer_episode_releases {
                false
            } else {
                match ctx.library.season_episodes(self.show.id, season).await {
                    Ok(all) => all.len() == wanted.len(),
                    Err(e) => {
                        warn!(
                            show = %self.show.name,
                            season,
                            error = %e,
                            "Could not load season episodes, skipping season"
                        );
                        continue;
                    }
                }
            };

            info!(
                show = %self.show.name,
                season,
                wanted = wanted.len(),
                season_pack,
                "Beginning backlog search"
            );

            let request = SearchRequest {
                origin: ItemKind::Backlog,
                show: &self.show,
                season,
                episodes: wanted,
                season_pack,
                manual: false,
            };

            let outcome = search_providers(ctx.provider.as_ref(), &request).await;
            match outcome {
                SearchOutcome::Found(results) => {
                    queue.snatch_item(self, results).await;
                }
                SearchOutcome::NotFound => {
                    info!(show = %self.show.name, season, "No needed episodes found during backlog search");
                }
                SearchOutcome::Failed(e) => {
                    warn!(show = %self.show.name, season, error = %e, "Backlog search failed");
                }
            }
        }
    }

    async fn execute_failed_retry(
        &mut self,
        ctx: &ItemContext,
        queue: &SearchQueue,
        episodes: BTreeMap<i32, Episode>,
    ) {
        ctx.notifier.publish(NotificationEvent::RetryStarted {
            show: self.show.name.clone(),
            count: episodes.len(),
        });

        let mut reverted = Vec::with_capacity(episodes.len());

        for episode in episodes.into_values() {
            let title = episode.pretty_name(&self.show.name, self.show.air_by_date);

            let release = match ctx.failed_history.find_release(&episode).await {
                Ok(Some(release)) => release,
                Ok(None) => {
                    debug!("No snatched release found for {title}, nothing to mark as failed");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "Could not look up the failed release for {title}");
                    continue;
                }
            };

            info!("Marking release as bad: {}", release.release);
            match fail_and_revert(ctx, &episode, &release).await {
                Ok(episode) => {
                    info!("Beginning failed download search for [{title}]");
                    reverted.push(episode);
                }
                Err(e) => warn!(error = %e, "Could not revert {title} after a failed download"),
            }
        }

        let Some(first) = reverted.first() else {
            return;
        };

        let request = SearchRequest {
            origin: ItemKind::FailedRetry,
            show: &self.show,
            season: first.season,
            episodes: &reverted,
            season_pack: false,
            manual: true,
        };

        let outcome = search_providers(ctx.provider.as_ref(), &request).await;
        match outcome {
            SearchOutcome::Found(results) => {
                queue.snatch_item(self, results).await;
            }
            SearchOutcome::NotFound => {
                info!(show = %self.show.name, "No episodes found to retry for failed downloads");
            }
            SearchOutcome::Failed(e) => {
                warn!(show = %self.show.name, error = %e, "Failed-download retry search failed");
            }
        }
    }
}

async fn fail_and_revert(
    ctx: &ItemContext,
    episode: &Episode,
    release: &FailedRelease,
) -> Result<Episode, LibraryError> {
    ctx.failed_history.mark_failed(episode).await?;
    ctx.failed_history.log_failed(release).await?;
    ctx.failed_history.record_failure(episode, release).await?;
    ctx.failed_history.revert_episode(episode).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompositeStatus, EpisodeState};
    use crate::quality::Quality;
    use crate::services::testing::{Harness, release, show, wanted};
    use std::sync::atomic::Ordering;

    fn alpha() -> Show {
        show(1, "Alpha")
    }

    fn season_one() -> Vec<Episode> {
        vec![wanted(1, 1, 1), wanted(1, 1, 2), wanted(1, 1, 3)]
    }

    #[test]
    fn keys_and_names_follow_the_target() {
        let manual = QueueItem::manual(alpha(), wanted(1, 1, 2));
        assert_eq!(manual.kind(), ItemKind::Manual);
        assert_eq!(manual.priority(), Priority::High);
        assert_eq!(manual.name(), "MANUAL-1");
        assert_eq!(
            manual.key().episodes,
            BTreeSet::from([EpisodeKey::new(1, 2)])
        );

        let backlog = QueueItem::backlog(alpha(), season_one().into_iter().collect());
        assert_eq!(backlog.priority(), Priority::Low);
        assert_eq!(backlog.name(), "BACKLOG-1");
        assert_eq!(backlog.key().episodes.len(), 3);
        assert_eq!(backlog.state(), ItemState::Waiting);
        assert_eq!(backlog.success(), None);

        let retry = QueueItem::failed_retry(alpha(), [wanted(1, 1, 1), wanted(1, 2, 1)]);
        assert_eq!(retry.priority(), Priority::High);
        assert_eq!(retry.name(), "RETRY-1");
        assert_eq!(retry.key().episodes.len(), 2);
    }

    #[test]
    fn failed_retry_keeps_one_episode_per_season() {
        let retry = QueueItem::failed_retry(alpha(), [wanted(1, 1, 1), wanted(1, 1, 2)]);
        let ItemTarget::FailedRetry(episodes) = retry.target() else {
            panic!("wrong target");
        };
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[&1].episode, 2);
    }

    #[tokio::test]
    async fn manual_search_snatches_first_result() {
        let h = Harness::new(vec![alpha()], season_one());
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());
        h.provider.respond(Ok(vec![
            release(1, "Alpha.S01E02.720p.HDTV-A", &[EpisodeKey::new(1, 2)]),
            release(1, "Alpha.S01E02.720p.HDTV-B", &[EpisodeKey::new(1, 2)]),
        ]));

        let mut item = QueueItem::manual(alpha(), wanted(1, 1, 2));
        item.execute(&ctx, &queue).await;

        assert!(item.is_done());
        assert!(item.succeeded());
        assert_eq!(h.snatcher.snatched_names(), vec!["Alpha.S01E02.720p.HDTV-A"]);

        let searches = h.provider.requests();
        assert_eq!(searches.len(), 1);
        assert!(searches[0].manual);
        assert!(!searches[0].season_pack);
        assert_eq!(searches[0].episodes, vec![EpisodeKey::new(1, 2)]);
    }

    #[tokio::test]
    async fn manual_search_without_results_notifies_the_user() {
        let h = Harness::new(vec![alpha()], season_one());
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());

        let mut item = QueueItem::manual(alpha(), wanted(1, 1, 2));
        item.execute(&ctx, &queue).await;

        assert!(item.is_done());
        assert!(!item.succeeded());
        let events = h.notifier.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            NotificationEvent::NoDownloadFound { message, .. } if message.contains("Alpha - S01E02")
        ));
    }

    #[tokio::test]
    async fn provider_errors_are_absorbed() {
        let h = Harness::new(vec![alpha()], season_one());
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());
        h.provider.respond(Err("indexer down"));

        let mut item = QueueItem::manual(alpha(), wanted(1, 1, 2));
        item.execute(&ctx, &queue).await;

        assert!(item.is_done());
        assert!(!item.succeeded());
        assert!(h.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn whole_wanted_season_is_searched_as_a_pack() {
        let h = Harness::new(vec![alpha()], season_one());
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());

        let mut item = QueueItem::backlog(alpha(), season_one().into_iter().collect());
        item.execute(&ctx, &queue).await;

        let searches = h.provider.requests();
        assert_eq!(searches.len(), 1);
        assert!(searches[0].season_pack);
        assert_eq!(searches[0].origin, ItemKind::Backlog);
        assert!(!searches[0].manual);
        assert!(item.is_done());
        assert!(!item.succeeded());
    }

    #[tokio::test]
    async fn partial_season_is_searched_per_episode() {
        let h = Harness::new(vec![alpha()], season_one());
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());

        let segment = [wanted(1, 1, 1), wanted(1, 1, 3)].into_iter().collect();
        let mut item = QueueItem::backlog(alpha(), segment);
        item.execute(&ctx, &queue).await;

        let searches = h.provider.requests();
        assert_eq!(searches.len(), 1);
        assert!(!searches[0].season_pack);
        assert_eq!(searches[0].episodes.len(), 2);
    }

    #[tokio::test]
    async fn episode_releases_preference_disables_packs() {
        let h = Harness::new(vec![alpha()], season_one());
        let ctx = h.context(true);
        let queue = SearchQueue::new(h.snatcher.clone());

        let mut item = QueueItem::backlog(alpha(), season_one().into_iter().collect());
        item.execute(&ctx, &queue).await;

        assert!(!h.provider.requests()[0].season_pack);
    }

    #[tokio::test]
    async fn backlog_seasons_are_independent() {
        let mut episodes = season_one();
        episodes.push(wanted(1, 2, 1));
        let h = Harness::new(vec![alpha()], episodes.clone());
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());

        h.provider.respond(Err("timeout"));
        h.provider.respond(Ok(vec![release(
            1,
            "Alpha.S02E01.720p.HDTV-A",
            &[EpisodeKey::new(2, 1)],
        )]));

        let mut item = QueueItem::backlog(alpha(), episodes.into_iter().collect());
        item.execute(&ctx, &queue).await;

        let seasons: Vec<i32> = h.provider.requests().iter().map(|r| r.season).collect();
        assert_eq!(seasons, vec![1, 2]);
        assert!(item.succeeded());
        assert_eq!(item.results().len(), 1);
    }

    #[tokio::test]
    async fn season_lookup_failure_skips_the_season() {
        let h = Harness::new(vec![alpha()], season_one());
        h.library.fail_season_lookup.store(true, Ordering::SeqCst);
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());

        let mut item = QueueItem::backlog(alpha(), season_one().into_iter().collect());
        item.execute(&ctx, &queue).await;

        assert!(h.provider.requests().is_empty());
        assert!(item.is_done());
    }

    #[tokio::test]
    async fn failed_retry_reverts_then_searches_once() {
        let snatched = |s, e| {
            crate::services::testing::episode(
                1,
                s,
                e,
                None,
                EpisodeState::Snatched,
                Quality::HDTV,
            )
        };
        let h = Harness::new(vec![alpha()], vec![snatched(1, 4), snatched(2, 1)]);
        h.failed.snatched(EpisodeKey::new(1, 4), "Alpha.S01E04.720p.HDTV-BAD");
        h.failed.snatched(EpisodeKey::new(2, 1), "Alpha.S02E01.720p.HDTV-BAD");
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());
        h.provider.respond(Ok(vec![release(
            1,
            "Alpha.S01E04.720p.HDTV-GOOD",
            &[EpisodeKey::new(1, 4)],
        )]));

        let mut item = QueueItem::failed_retry(alpha(), [snatched(1, 4), snatched(2, 1)]);
        item.execute(&ctx, &queue).await;

        assert_eq!(
            h.failed.calls()[..4],
            [
                "mark_failed S01E04".to_string(),
                "log_failed Alpha.S01E04.720p.HDTV-BAD".to_string(),
                "record_failure S01E04 Alpha.S01E04.720p.HDTV-BAD".to_string(),
                "revert S01E04".to_string(),
            ]
        );
        assert_eq!(
            h.library.status_of(1, EpisodeKey::new(2, 1)),
            Some(CompositeStatus::compose(EpisodeState::Wanted, Quality::NONE))
        );

        let searches = h.provider.requests();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].origin, ItemKind::FailedRetry);
        assert_eq!(searches[0].episodes.len(), 2);
        assert!(searches[0].manual);
        assert!(item.succeeded());
    }

    #[tokio::test]
    async fn failed_retry_without_results_is_unsuccessful() {
        let h = Harness::new(vec![alpha()], season_one());
        h.failed.snatched(EpisodeKey::new(1, 1), "Alpha.S01E01.720p.HDTV-BAD");
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());

        let mut item = QueueItem::failed_retry(alpha(), [wanted(1, 1, 1)]);
        item.execute(&ctx, &queue).await;

        assert!(item.is_done());
        assert!(!item.succeeded());
        assert!(h.snatcher.snatched_names().is_empty());
    }

    #[tokio::test]
    async fn failed_retry_with_no_known_release_skips_the_search() {
        let h = Harness::new(vec![alpha()], season_one());
        let ctx = h.context(false);
        let queue = SearchQueue::new(h.snatcher.clone());

        let mut item = QueueItem::failed_retry(alpha(), [wanted(1, 1, 1)]);
        item.execute(&ctx, &queue).await;

        assert!(h.failed.calls().is_empty());
        assert!(h.provider.requests().is_empty());
        assert!(item.is_done());
    }
}
