//! Handing a chosen release to a download client.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::clients::qbittorrent::{AddTorrentOptions, QBitClient, sanitize_category};
use crate::db::{HistoryEntry, Store};
use crate::domain::{CompositeStatus, EpisodeKey, EpisodeState};
use crate::models::SearchResult;

#[async_trait]
pub trait Snatcher: Send + Sync {
    /// Returns `Ok(true)` once the release has been handed off.
    async fn snatch(&self, result: &SearchResult) -> Result<bool>;
}

/// Logs what would be snatched; used when no download client is configured.
pub struct DryRunSnatcher;

#[async_trait]
impl Snatcher for DryRunSnatcher {
    async fn snatch(&self, result: &SearchResult) -> Result<bool> {
        info!(
            release = %result.name,
            provider = %result.provider,
            "No download client configured, not snatching"
        );
        Ok(false)
    }
}

pub struct QBitSnatcher {
    client: QBitClient,
    category: Option<String>,
}

impl QBitSnatcher {
    #[must_use]
    pub fn new(client: QBitClient, category: Option<&str>) -> Self {
        Self {
            client,
            category: category
                .map(sanitize_category)
                .filter(|c| !c.is_empty()),
        }
    }
}

#[async_trait]
impl Snatcher for QBitSnatcher {
    async fn snatch(&self, result: &SearchResult) -> Result<bool> {
        let options = AddTorrentOptions {
            category: self.category.clone(),
            ..Default::default()
        };
        self.client.add_torrent_url(&result.url, options).await?;
        info!(release = %result.name, "Sent release to qBittorrent");
        Ok(true)
    }
}

/// Records a SNATCHED history row and flips episode status after the inner
/// snatcher accepted a release.
pub struct HistorySnatcher {
    inner: Arc<dyn Snatcher>,
    store: Store,
}

impl HistorySnatcher {
    #[must_use]
    pub fn new(inner: Arc<dyn Snatcher>, store: Store) -> Self {
        Self { inner, store }
    }

    async fn record(
        &self,
        result: &SearchResult,
        key: EpisodeKey,
        status: CompositeStatus,
        date: &str,
    ) -> Result<()> {
        let previous = match self.store.get_episode(result.show_id, key.season, key.episode).await {
            Ok(episode) => episode.map(|episode| episode.status),
            Err(e) => {
                warn!(episode = %key, error = %e, "Could not read the pre-snatch status");
                None
            }
        };

        if let Err(e) = self
            .store
            .append_history(&HistoryEntry {
                action: status,
                date: date.to_string(),
                show_id: result.show_id,
                episode: key,
                quality: result.quality,
                resource: result.name.clone(),
                provider: result.provider.clone(),
                previous_status: previous,
            })
            .await
        {
            warn!(episode = %key, release = %result.name, error = %e, "Could not write snatch history");
        }

        self.store.set_episode_status(result.show_id, key, status).await
    }
}

#[async_trait]
impl Snatcher for HistorySnatcher {
    /// Once the inner snatcher accepted the release this returns `Ok(true)`;
    /// bookkeeping errors are logged per episode.
    async fn snatch(&self, result: &SearchResult) -> Result<bool> {
        if !self.inner.snatch(result).await? {
            return Ok(false);
        }

        let snatched = CompositeStatus::compose(EpisodeState::Snatched, result.quality);
        let date = chrono::Utc::now().to_rfc3339();

        for key in &result.episodes {
            if let Err(e) = self.record(result, *key, snatched, &date).await {
                error!(
                    episode = %key,
                    release = %result.name,
                    error = %e,
                    "Release was snatched but the episode could not be updated"
                );
            }
        }

        Ok(true)
    }
}
