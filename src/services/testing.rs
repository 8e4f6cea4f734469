//! In-memory doubles of the collaborator traits for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::events::NotificationEvent;
use crate::domain::{CompositeStatus, EpisodeKey, EpisodeState, ShowId};
use crate::models::{Episode, SearchResult, Show};
use crate::quality::{Quality, QualityProfile};
use crate::services::{
    BacklogMarkerStore, FailedHistory, FailedRelease, ItemContext, ItemKind, LibraryError,
    LibraryService, Notifier, SearchError, SearchProvider, SearchRequest, Snatcher,
};

pub fn show(id: i32, name: &str) -> Show {
    Show {
        id: ShowId::new(id),
        name: name.to_string(),
        paused: false,
        quality: QualityProfile::preset("hd").unwrap(),
        air_by_date: false,
    }
}

pub fn episode(
    show_id: i32,
    season: i32,
    number: i32,
    airdate: Option<NaiveDate>,
    state: EpisodeState,
    quality: Quality,
) -> Episode {
    Episode {
        show_id: ShowId::new(show_id),
        season,
        episode: number,
        name: None,
        airdate,
        status: CompositeStatus::compose(state, quality),
    }
}

pub fn wanted(show_id: i32, season: i32, number: i32) -> Episode {
    episode(
        show_id,
        season,
        number,
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|d| d.checked_add_days(chrono::Days::new(number.unsigned_abs().into()))),
        EpisodeState::Wanted,
        Quality::NONE,
    )
}

pub fn release(show_id: i32, name: &str, keys: &[EpisodeKey]) -> SearchResult {
    SearchResult {
        show_id: ShowId::new(show_id),
        provider: "test".to_string(),
        name: name.to_string(),
        url: format!("https://indexer.test/{name}"),
        quality: Quality::from_release_name(name),
        episodes: keys.to_vec(),
    }
}

#[derive(Default)]
pub struct MemoryLibrary {
    pub shows: Mutex<Vec<Show>>,
    pub episodes: Mutex<Vec<Episode>>,
    pub marker: Mutex<Option<String>>,
    pub marker_writes: Mutex<Vec<i64>>,
    pub fail_season_lookup: AtomicBool,
}

impl MemoryLibrary {
    pub fn new(shows: Vec<Show>, episodes: Vec<Episode>) -> Self {
        Self {
            shows: Mutex::new(shows),
            episodes: Mutex::new(episodes),
            ..Default::default()
        }
    }

    pub fn set_marker(&self, raw: Option<&str>) {
        *self.marker.lock().unwrap() = raw.map(ToString::to_string);
    }

    pub fn marker_writes(&self) -> Vec<i64> {
        self.marker_writes.lock().unwrap().clone()
    }

    pub fn status_of(&self, show_id: i32, key: EpisodeKey) -> Option<CompositeStatus> {
        self.episodes
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.show_id == ShowId::new(show_id) && e.key() == key)
            .map(|e| e.status)
    }
}

#[async_trait]
impl LibraryService for MemoryLibrary {
    async fn list_shows(&self) -> Result<Vec<Show>, LibraryError> {
        Ok(self.shows.lock().unwrap().clone())
    }

    async fn get_show(&self, id: ShowId) -> Result<Show, LibraryError> {
        self.shows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(LibraryError::ShowNotFound(id))
    }

    async fn backlog_episodes(
        &self,
        show: &Show,
        from_date: NaiveDate,
    ) -> Result<Vec<Episode>, LibraryError> {
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.show_id == show.id && e.season > 0)
            .filter(|e| e.airdate.is_some_and(|d| d > from_date))
            .cloned()
            .collect())
    }

    async fn season_episodes(
        &self,
        show_id: ShowId,
        season: i32,
    ) -> Result<Vec<Episode>, LibraryError> {
        if self.fail_season_lookup.load(Ordering::SeqCst) {
            return Err(LibraryError::Database("season lookup failed".to_string()));
        }
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.show_id == show_id && e.season == season)
            .cloned()
            .collect())
    }

    async fn get_episode(
        &self,
        show_id: ShowId,
        key: EpisodeKey,
    ) -> Result<Option<Episode>, LibraryError> {
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.show_id == show_id && e.key() == key)
            .cloned())
    }

    async fn set_episode_status(
        &self,
        show_id: ShowId,
        key: EpisodeKey,
        status: CompositeStatus,
    ) -> Result<(), LibraryError> {
        let mut episodes = self.episodes.lock().unwrap();
        let episode = episodes
            .iter_mut()
            .find(|e| e.show_id == show_id && e.key() == key)
            .ok_or(LibraryError::EpisodeNotFound { show_id, key })?;
        episode.status = status;
        Ok(())
    }
}

#[async_trait]
impl BacklogMarkerStore for MemoryLibrary {
    async fn read_last_backlog(&self) -> Result<Option<String>, LibraryError> {
        Ok(self.marker.lock().unwrap().clone())
    }

    async fn write_last_backlog(&self, ordinal: i64) -> Result<(), LibraryError> {
        *self.marker.lock().unwrap() = Some(ordinal.to_string());
        self.marker_writes.lock().unwrap().push(ordinal);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    pub origin: ItemKind,
    pub show_id: ShowId,
    pub season: i32,
    pub episodes: Vec<EpisodeKey>,
    pub season_pack: bool,
    pub manual: bool,
}

/// Replays queued responses in order; an exhausted script finds nothing.
#[derive(Default)]
pub struct ScriptedProvider {
    pub responses: Mutex<VecDeque<Result<Vec<SearchResult>, String>>>,
    pub requests: Mutex<Vec<RecordedSearch>>,
    pub panic_on_search: AtomicBool,
}

impl ScriptedProvider {
    pub fn respond(&self, response: Result<Vec<SearchResult>, &str>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.map_err(ToString::to_string));
    }

    pub fn requests(&self) -> Vec<RecordedSearch> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchResult>, SearchError> {
        assert!(
            !self.panic_on_search.load(Ordering::SeqCst),
            "provider exploded"
        );

        self.requests.lock().unwrap().push(RecordedSearch {
            origin: request.origin,
            show_id: request.show.id,
            season: request.season,
            episodes: request.episode_keys(),
            season_pack: request.season_pack,
            manual: request.manual,
        });

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(results)) => Ok(results),
            Some(Err(message)) => Err(SearchError::provider("scripted", message)),
            None => Ok(Vec::new()),
        }
    }
}

pub struct RecordingSnatcher {
    pub snatched: Mutex<Vec<SearchResult>>,
    pub accept: AtomicBool,
    pub fail: AtomicBool,
}

impl Default for RecordingSnatcher {
    fn default() -> Self {
        Self {
            snatched: Mutex::new(Vec::new()),
            accept: AtomicBool::new(true),
            fail: AtomicBool::new(false),
        }
    }
}

impl RecordingSnatcher {
    pub fn snatched_names(&self) -> Vec<String> {
        self.snatched
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }
}

#[async_trait]
impl Snatcher for RecordingSnatcher {
    async fn snatch(&self, result: &SearchResult) -> Result<bool> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("download client unreachable");
        }
        self.snatched.lock().unwrap().push(result.clone());
        Ok(self.accept.load(Ordering::SeqCst))
    }
}

/// Failed-history double backed by the same [`MemoryLibrary`] the items query.
pub struct MemoryFailedHistory {
    pub library: Arc<MemoryLibrary>,
    pub releases: Mutex<HashMap<EpisodeKey, FailedRelease>>,
    pub calls: Mutex<Vec<String>>,
}

impl MemoryFailedHistory {
    pub fn new(library: Arc<MemoryLibrary>) -> Self {
        Self {
            library,
            releases: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn snatched(&self, key: EpisodeKey, release: &str) {
        self.releases.lock().unwrap().insert(
            key,
            FailedRelease {
                release: release.to_string(),
                provider: "test".to_string(),
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl FailedHistory for MemoryFailedHistory {
    async fn find_release(&self, episode: &Episode) -> Result<Option<FailedRelease>, LibraryError> {
        Ok(self.releases.lock().unwrap().get(&episode.key()).cloned())
    }

    async fn mark_failed(&self, episode: &Episode) -> Result<(), LibraryError> {
        self.record(format!("mark_failed {}", episode.key()));
        self.library
            .set_episode_status(
                episode.show_id,
                episode.key(),
                episode.status.with_state(EpisodeState::Failed),
            )
            .await
    }

    async fn log_failed(&self, release: &FailedRelease) -> Result<(), LibraryError> {
        self.record(format!("log_failed {}", release.release));
        Ok(())
    }

    async fn record_failure(
        &self,
        episode: &Episode,
        release: &FailedRelease,
    ) -> Result<(), LibraryError> {
        self.record(format!("record_failure {} {}", episode.key(), release.release));
        Ok(())
    }

    async fn revert_episode(&self, episode: &Episode) -> Result<Episode, LibraryError> {
        self.record(format!("revert {}", episode.key()));
        let status = CompositeStatus::compose(EpisodeState::Wanted, Quality::NONE);
        self.library
            .set_episode_status(episode.show_id, episode.key(), status)
            .await?;
        Ok(Episode {
            status,
            ..episode.clone()
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, event: NotificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Everything a queue test needs, wired together.
pub struct Harness {
    pub library: Arc<MemoryLibrary>,
    pub provider: Arc<ScriptedProvider>,
    pub snatcher: Arc<RecordingSnatcher>,
    pub failed: Arc<MemoryFailedHistory>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(shows: Vec<Show>, episodes: Vec<Episode>) -> Self {
        let library = Arc::new(MemoryLibrary::new(shows, episodes));
        Self {
            failed: Arc::new(MemoryFailedHistory::new(Arc::clone(&library))),
            library,
            provider: Arc::new(ScriptedProvider::default()),
            snatcher: Arc::new(RecordingSnatcher::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn context(&self, prefer_episode_releases: bool) -> ItemContext {
        ItemContext {
            provider: self.provider.clone(),
            library: self.library.clone(),
            failed_history: self.failed.clone(),
            notifier: self.notifier.clone(),
            prefer_episode_releases,
        }
    }
}
