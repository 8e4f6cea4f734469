//! `SeaORM` implementation of [`FailedHistory`] on top of the history table.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::db::{HistoryEntry, Store};
use crate::domain::{CompositeStatus, EpisodeState};
use crate::models::Episode;
use crate::quality::Quality;
use crate::services::{FailedHistory, FailedRelease, LibraryError};

pub struct SeaOrmFailedHistory {
    store: Store,
}

impl SeaOrmFailedHistory {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn latest_snatch(&self, episode: &Episode) -> Result<Option<HistoryEntry>, LibraryError> {
        let history = self
            .store
            .episode_history(episode.show_id, episode.key())
            .await?;

        for entry in history {
            match entry.action.state() {
                EpisodeState::Failed => return Ok(None),
                state if state.is_snatched_or_downloaded() && state != EpisodeState::Downloaded => {
                    return Ok(Some(entry));
                }
                _ => {}
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl FailedHistory for SeaOrmFailedHistory {
    async fn find_release(&self, episode: &Episode) -> Result<Option<FailedRelease>, LibraryError> {
        Ok(self.latest_snatch(episode).await?.map(|entry| FailedRelease {
            release: entry.resource,
            provider: entry.provider,
        }))
    }

    async fn mark_failed(&self, episode: &Episode) -> Result<(), LibraryError> {
        let status = episode.status.with_state(EpisodeState::Failed);
        self.store
            .set_episode_status(episode.show_id, episode.key(), status)
            .await?;
        Ok(())
    }

    async fn log_failed(&self, release: &FailedRelease) -> Result<(), LibraryError> {
        if self.store.is_failed_release(&release.release).await? {
            debug!(release = %release.release, "Release already logged as failed");
            return Ok(());
        }
        self.store
            .log_failed_release(&release.release, &release.provider)
            .await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        episode: &Episode,
        release: &FailedRelease,
    ) -> Result<(), LibraryError> {
        let quality = episode.status.quality();
        let entry = HistoryEntry {
            action: CompositeStatus::compose(EpisodeState::Failed, quality),
            date: chrono::Utc::now().to_rfc3339(),
            show_id: episode.show_id,
            episode: episode.key(),
            quality,
            resource: release.release.clone(),
            provider: release.provider.clone(),
            previous_status: Some(episode.status),
        };
        self.store.append_history(&entry).await?;
        Ok(())
    }

    async fn revert_episode(&self, episode: &Episode) -> Result<Episode, LibraryError> {
        let history = self
            .store
            .episode_history(episode.show_id, episode.key())
            .await?;

        let restored = history
            .iter()
            .filter(|entry| {
                let state = entry.action.state();
                state.is_snatched_or_downloaded() && state != EpisodeState::Downloaded
            })
            .find_map(|entry| entry.previous_status)
            .filter(|status| {
                let state = status.state();
                !state.is_snatched_or_downloaded() && state != EpisodeState::Failed
            })
            .unwrap_or_else(|| CompositeStatus::compose(EpisodeState::Wanted, Quality::NONE));

        info!(
            episode = %episode.key(),
            status = %restored,
            "Reverting episode to its pre-snatch status"
        );

        self.store
            .set_episode_status(episode.show_id, episode.key(), restored)
            .await?;

        Ok(Episode {
            status: restored,
            ..episode.clone()
        })
    }
}
