//! Search providers.
//!
//! A provider turns a [`SearchRequest`] into candidate releases. Work items
//! never see provider errors directly: [`search_providers`] folds the call into
//! a [`SearchOutcome`].

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::clients::torznab::{TorznabClient, TvSearch};
use crate::db::Store;
use crate::domain::EpisodeKey;
use crate::models::{Episode, SearchResult, Show};
use crate::quality::Quality;
use crate::services::ItemKind;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Provider {provider} failed: {message}")]
    Provider { provider: String, message: String },
}

impl SearchError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// What a work item asks the providers for.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub origin: ItemKind,
    pub show: &'a Show,
    pub season: i32,
    pub episodes: &'a [Episode],
    /// Look for one release covering the whole season.
    pub season_pack: bool,
    pub manual: bool,
}

impl SearchRequest<'_> {
    #[must_use]
    pub fn episode_keys(&self) -> Vec<EpisodeKey> {
        self.episodes.iter().map(Episode::key).collect()
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    Found(Vec<SearchResult>),
    NotFound,
    Failed(SearchError),
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchResult>, SearchError>;
}

pub async fn search_providers(
    provider: &dyn SearchProvider,
    request: &SearchRequest<'_>,
) -> SearchOutcome {
    match provider.search(request).await {
        Ok(results) if results.is_empty() => SearchOutcome::NotFound,
        Ok(results) => SearchOutcome::Found(results),
        Err(e) => SearchOutcome::Failed(e),
    }
}

/// Used when no indexer is configured; every search comes back empty.
pub struct DisabledProvider;

#[async_trait]
impl SearchProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchResult>, SearchError> {
        debug!(
            show = %request.show.name,
            season = request.season,
            "No search provider configured"
        );
        Ok(Vec::new())
    }
}

pub struct TorznabProvider {
    name: String,
    client: TorznabClient,
    store: Option<Store>,
}

impl TorznabProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, client: TorznabClient) -> Self {
        Self {
            name: name.into(),
            client,
            store: None,
        }
    }

    /// Skips releases that were logged as failed in `store`.
    #[must_use]
    pub fn with_failed_filter(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    async fn is_blocked(&self, release: &str) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.is_failed_release(release).await {
            Ok(blocked) => blocked,
            Err(e) => {
                debug!(error = %e, release, "Failed-release lookup failed");
                false
            }
        }
    }
}

/// Queries needed to cover a request, each with the episodes its results satisfy.
pub fn build_searches(request: &SearchRequest<'_>) -> Vec<(TvSearch, Vec<EpisodeKey>)> {
    let show = &request.show.name;

    if request.season_pack {
        return vec![(
            TvSearch {
                query: show.clone(),
                season: Some(request.season.to_string()),
                episode: None,
            },
            request.episode_keys(),
        )];
    }

    request
        .episodes
        .iter()
        .map(|episode| {
            let search = match episode.airdate {
                Some(date) if request.show.air_by_date => TvSearch {
                    query: show.clone(),
                    season: Some(date.format("%Y").to_string()),
                    episode: Some(date.format("%m/%d").to_string()),
                },
                _ => TvSearch {
                    query: show.clone(),
                    season: Some(episode.season.to_string()),
                    episode: Some(episode.episode.to_string()),
                },
            };
            (search, vec![episode.key()])
        })
        .collect()
}

#[async_trait]
impl SearchProvider for TorznabProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchResult>, SearchError> {
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for (search, episodes) in build_searches(request) {
            let items = self
                .client
                .search(&search)
                .await
                .map_err(|e| SearchError::provider(&self.name, format!("{e:#}")))?;

            for item in items {
                if !seen.insert(item.link.clone()) {
                    continue;
                }

                let quality = Quality::from_release_name(&item.title);
                if !request.show.quality.is_allowed(quality) {
                    debug!(release = %item.title, quality = %quality, "Quality not wanted");
                    continue;
                }

                if self.is_blocked(&item.title).await {
                    debug!(release = %item.title, "Skipping release previously marked as failed");
                    continue;
                }

                results.push(SearchResult {
                    show_id: request.show.id,
                    provider: self.name.clone(),
                    name: item.title,
                    url: item.link,
                    quality,
                    episodes: episodes.clone(),
                });
            }
        }

        // Best quality first; ties keep indexer order.
        results.sort_by(|a, b| b.quality.cmp(&a.quality));

        debug!(
            provider = %self.name,
            origin = request.origin.as_str(),
            show = %request.show.name,
            found = results.len(),
            "Provider search finished"
        );

        Ok(results)
    }
}
