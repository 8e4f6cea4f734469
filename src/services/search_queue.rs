//! Single-worker priority queue of search work.
//!
//! Items are executed strictly one at a time, highest priority first and FIFO
//! within a priority. While the backlog is paused, low-priority items stay
//! queued and are simply skipped by selection.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use crate::domain::events::NotificationEvent;
use crate::domain::{EpisodeKey, ShowId};
use crate::models::{Episode, SearchResult};
use crate::services::{
    ItemContext, ItemKey, ItemKind, ItemState, LibraryError, LibraryService, Notifier, Priority,
    QueueItem, Snatcher,
};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("{0} is already queued")]
    Duplicate(String),

    #[error("Nothing to search for: {0}")]
    NothingToSearch(String),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Read-only view of a queued or running item.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub name: String,
    pub show: String,
    pub kind: ItemKind,
    pub priority: Priority,
    pub state: ItemState,
    pub episodes: usize,
    pub added_at: DateTime<Utc>,
}

impl From<&QueueItem> for QueueEntry {
    fn from(item: &QueueItem) -> Self {
        Self {
            name: item.name(),
            show: item.show().name.clone(),
            kind: item.kind(),
            priority: item.priority(),
            state: item.state(),
            episodes: item.key().episodes.len(),
            added_at: item.added_at(),
        }
    }
}

struct CurrentItem {
    key: ItemKey,
    kind: ItemKind,
    entry: QueueEntry,
}

struct QueueState {
    pending: BTreeMap<(Reverse<Priority>, u64), QueueItem>,
    current: Option<CurrentItem>,
    min_priority: Priority,
    next_seq: u64,
}

impl QueueState {
    fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.current
            .iter()
            .map(|c| &c.key)
            .chain(self.pending.values().map(QueueItem::key))
    }

    fn kinds(&self) -> impl Iterator<Item = ItemKind> + '_ {
        self.current
            .iter()
            .map(|c| c.kind)
            .chain(self.pending.values().map(QueueItem::kind))
    }

    fn report_depth(&self) {
        metrics::gauge!("search_queue_depth")
            .set(f64::from(u32::try_from(self.pending.len()).unwrap_or(u32::MAX)));
    }
}

pub struct SearchQueue {
    state: Mutex<QueueState>,
    wakeup: Notify,
    snatcher: Arc<dyn Snatcher>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl SearchQueue {
    #[must_use]
    pub fn new(snatcher: Arc<dyn Snatcher>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: BTreeMap::new(),
                current: None,
                min_priority: Priority::Low,
                next_seq: 0,
            }),
            wakeup: Notify::new(),
            snatcher,
            notifier: None,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Queues `item` unless an item with the same key is queued or running.
    pub async fn add(&self, item: QueueItem) -> bool {
        let kind = item.kind();
        let name = item.name();

        if item.key().is_empty() {
            debug!(item = %name, "Not adding item with nothing to search");
            return false;
        }

        let mut state = self.state.lock().await;
        if state.keys().any(|key| key == item.key()) {
            drop(state);
            debug!(item = %name, "Not adding item, it's already in the queue");
            metrics::counter!("search_queue_items_rejected_total", "kind" => kind.as_str())
                .increment(1);
            return false;
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let show = item.show().name.clone();
        state.pending.insert((Reverse(item.priority()), seq), item);
        state.report_depth();
        drop(state);

        metrics::counter!("search_queue_items_added_total", "kind" => kind.as_str()).increment(1);
        if let Some(notifier) = &self.notifier {
            notifier.publish(NotificationEvent::SearchQueued {
                show,
                kind: kind.as_str().to_string(),
            });
        }
        info!(item = %name, kind = %kind, "Added item to search queue");

        self.wakeup.notify_one();
        true
    }

    /// Looks up one episode and queues a manual search for it.
    pub async fn queue_manual_search(
        &self,
        library: &dyn LibraryService,
        show_id: ShowId,
        key: EpisodeKey,
    ) -> Result<String, QueueError> {
        let show = library.get_show(show_id).await?;
        let episode = library
            .get_episode(show_id, key)
            .await?
            .ok_or(LibraryError::EpisodeNotFound { show_id, key })?;

        let item = QueueItem::manual(show, episode);
        let name = item.name();
        if self.add(item).await {
            Ok(name)
        } else {
            Err(QueueError::Duplicate(name))
        }
    }

    /// Queues failed-download retries for the given episodes of one show.
    ///
    /// A retry item holds one episode per season, so episodes sharing a
    /// season are spread over several items. Returns the names of the items
    /// that were queued.
    pub async fn queue_failed_retry(
        &self,
        library: &dyn LibraryService,
        show_id: ShowId,
        keys: &[EpisodeKey],
    ) -> Result<Vec<String>, QueueError> {
        let show = library.get_show(show_id).await?;

        let mut batches: Vec<BTreeMap<i32, Episode>> = Vec::new();
        for key in keys.iter().copied().collect::<BTreeSet<_>>() {
            let episode = library
                .get_episode(show_id, key)
                .await?
                .ok_or(LibraryError::EpisodeNotFound { show_id, key })?;

            match batches.iter_mut().find(|batch| !batch.contains_key(&key.season)) {
                Some(batch) => {
                    batch.insert(key.season, episode);
                }
                None => batches.push(BTreeMap::from([(key.season, episode)])),
            }
        }

        if batches.is_empty() {
            return Err(QueueError::NothingToSearch(show.name));
        }

        let mut queued = Vec::with_capacity(batches.len());
        let mut duplicate = None;
        for batch in batches {
            let item = QueueItem::failed_retry(show.clone(), batch.into_values());
            let name = item.name();
            if self.add(item).await {
                queued.push(name);
            } else {
                duplicate.get_or_insert(name);
            }
        }

        match duplicate {
            Some(name) if queued.is_empty() => Err(QueueError::Duplicate(name)),
            _ => Ok(queued),
        }
    }

    pub async fn pause_backlog(&self) {
        self.state.lock().await.min_priority = Priority::Normal;
        info!("Backlog searches paused");
    }

    pub async fn unpause_backlog(&self) {
        self.state.lock().await.min_priority = Priority::Low;
        info!("Backlog searches resumed");
        self.wakeup.notify_one();
    }

    pub async fn is_backlog_paused(&self) -> bool {
        self.state.lock().await.min_priority >= Priority::Normal
    }

    pub async fn is_backlog_in_progress(&self) -> bool {
        self.state
            .lock()
            .await
            .kinds()
            .any(|kind| kind == ItemKind::Backlog)
    }

    pub async fn is_manual_search_in_progress(&self) -> bool {
        self.state
            .lock()
            .await
            .kinds()
            .any(|kind| kind == ItemKind::Manual)
    }

    /// True when an item covering exactly `episodes` of `show_id` is queued or running.
    pub async fn is_in_queue(&self, show_id: ShowId, episodes: &BTreeSet<EpisodeKey>) -> bool {
        self.state
            .lock()
            .await
            .keys()
            .any(|key| key.show_id == show_id && &key.episodes == episodes)
    }

    /// True when any queued or running item covers this episode.
    pub async fn is_ep_in_queue(&self, show_id: ShowId, episode: EpisodeKey) -> bool {
        self.state
            .lock()
            .await
            .keys()
            .any(|key| key.show_id == show_id && key.episodes.contains(&episode))
    }

    /// Number of items waiting to run.
    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.pending.is_empty()
    }

    /// The running item first, then waiting items in execution order.
    pub async fn snapshot(&self) -> Vec<QueueEntry> {
        let state = self.state.lock().await;
        state
            .current
            .iter()
            .map(|c| c.entry.clone())
            .chain(state.pending.values().map(QueueEntry::from))
            .collect()
    }

    /// Records `results` on the item and snatches the first one.
    ///
    /// The item is marked done whatever the outcome; its success flag holds
    /// the outcome of this latest attempt.
    pub async fn snatch_item(&self, item: &mut QueueItem, results: Vec<SearchResult>) -> bool {
        let chosen = results.first().cloned();
        item.record_results(results);

        let success = match chosen {
            None => false,
            Some(result) => match self.snatcher.snatch(&result).await {
                Ok(true) => {
                    metrics::counter!("snatches_total", "outcome" => "success").increment(1);
                    info!(item = %item.name(), release = %result.name, "Snatched release");
                    if let Some(notifier) = &self.notifier {
                        notifier.publish(NotificationEvent::Snatched {
                            title: result.name.clone(),
                            provider: result.provider.clone(),
                        });
                    }
                    true
                }
                Ok(false) => {
                    metrics::counter!("snatches_total", "outcome" => "rejected").increment(1);
                    info!(item = %item.name(), release = %result.name, "Release was not snatched");
                    false
                }
                Err(e) => {
                    metrics::counter!("snatches_total", "outcome" => "error").increment(1);
                    warn!(item = %item.name(), release = %result.name, error = %e, "Snatch failed");
                    false
                }
            },
        };

        item.set_success(success);
        item.finish();
        success
    }

    async fn take_next(&self) -> Option<QueueItem> {
        let mut state = self.state.lock().await;
        let min_priority = state.min_priority;
        let next = state
            .pending
            .iter()
            .find(|(_, item)| item.priority() >= min_priority)
            .map(|(slot, _)| *slot)?;
        let item = state.pending.remove(&next)?;
        state.current = Some(CurrentItem {
            key: item.key().clone(),
            kind: item.kind(),
            entry: QueueEntry {
                state: ItemState::InProgress,
                ..QueueEntry::from(&item)
            },
        });
        state.report_depth();
        Some(item)
    }

    /// Runs the next eligible item to completion and returns it.
    ///
    /// Returns `None` when nothing is eligible: the queue is empty, or only
    /// low-priority items remain while the backlog is paused.
    pub async fn process_next(&self, ctx: &ItemContext) -> Option<QueueItem> {
        let mut item = self.take_next().await?;
        let name = item.name();
        let kind = item.kind();
        let start = Instant::now();

        item.start();
        info!(event = "search_item_started", item = %name, kind = %kind, "Starting search queue item");

        if AssertUnwindSafe(item.execute(ctx, self))
            .catch_unwind()
            .await
            .is_err()
        {
            error!(event = "search_item_panicked", item = %name, kind = %kind, "Search queue item panicked");
            item.finish();
        }

        let outcome = if item.succeeded() { "success" } else { "unsuccessful" };
        metrics::counter!(
            "search_queue_items_finished_total",
            "kind" => kind.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        info!(
            event = "search_item_finished",
            item = %name,
            kind = %kind,
            outcome,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Search queue item finished"
        );

        self.state.lock().await.current = None;
        Some(item)
    }

    /// Runs eligible items until none is left.
    pub async fn drain(&self, ctx: &ItemContext) -> Vec<QueueItem> {
        let mut finished = Vec::new();
        while let Some(item) = self.process_next(ctx).await {
            finished.push(item);
        }
        finished
    }

    /// Worker loop; never returns.
    pub async fn run_worker(self: Arc<Self>, ctx: Arc<ItemContext>) {
        info!("Search queue worker started");
        loop {
            if self.process_next(&ctx).await.is_none() {
                self.wakeup.notified().await;
            }
        }
    }
}
