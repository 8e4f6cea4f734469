//! `SeaORM` implementation of the library traits.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::Store;
use crate::domain::{CompositeStatus, EpisodeKey, ShowId, to_ordinal};
use crate::models::{Episode, Show};
use crate::services::{BacklogMarkerStore, LibraryError, LibraryService};

/// SeaORM-based implementation of [`LibraryService`] and [`BacklogMarkerStore`].
#[derive(Clone)]
pub struct SeaOrmLibraryService {
    store: Store,
}

impl SeaOrmLibraryService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LibraryService for SeaOrmLibraryService {
    async fn list_shows(&self) -> Result<Vec<Show>, LibraryError> {
        Ok(self.store.list_shows().await?)
    }

    async fn get_show(&self, id: ShowId) -> Result<Show, LibraryError> {
        self.store
            .get_show(id)
            .await?
            .ok_or(LibraryError::ShowNotFound(id))
    }

    async fn backlog_episodes(
        &self,
        show: &Show,
        from_date: NaiveDate,
    ) -> Result<Vec<Episode>, LibraryError> {
        Ok(self
            .store
            .episodes_aired_after(show.id, to_ordinal(from_date))
            .await?)
    }

    async fn season_episodes(
        &self,
        show_id: ShowId,
        season: i32,
    ) -> Result<Vec<Episode>, LibraryError> {
        Ok(self.store.season_episodes(show_id, season).await?)
    }

    async fn get_episode(
        &self,
        show_id: ShowId,
        key: EpisodeKey,
    ) -> Result<Option<Episode>, LibraryError> {
        Ok(self
            .store
            .get_episode(show_id, key.season, key.episode)
            .await?)
    }

    async fn set_episode_status(
        &self,
        show_id: ShowId,
        key: EpisodeKey,
        status: CompositeStatus,
    ) -> Result<(), LibraryError> {
        Ok(self.store.set_episode_status(show_id, key, status).await?)
    }
}

#[async_trait]
impl BacklogMarkerStore for SeaOrmLibraryService {
    async fn read_last_backlog(&self) -> Result<Option<String>, LibraryError> {
        Ok(self.store.read_last_backlog().await?)
    }

    async fn write_last_backlog(&self, ordinal: i64) -> Result<(), LibraryError> {
        Ok(self.store.write_last_backlog(ordinal).await?)
    }
}
