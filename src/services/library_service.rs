//! Domain service for the show library.
//!
//! The backlog and search-queue subsystems only ever see shows and episodes
//! through these traits, so they can run against the database or against an
//! in-memory double in tests.

use crate::domain::{CompositeStatus, EpisodeKey, ShowId};
use crate::models::{Episode, Show};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Domain errors for library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    #[error("Episode not found: {show_id} {key}")]
    EpisodeNotFound { show_id: ShowId, key: EpisodeKey },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for LibraryError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LibraryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait]
pub trait LibraryService: Send + Sync {
    async fn list_shows(&self) -> Result<Vec<Show>, LibraryError>;

    async fn get_show(&self, id: ShowId) -> Result<Show, LibraryError>;

    /// Regular-season episodes of `show` whose airdate is strictly after `from_date`.
    async fn backlog_episodes(
        &self,
        show: &Show,
        from_date: NaiveDate,
    ) -> Result<Vec<Episode>, LibraryError>;

    /// Every episode of one season, aired or not.
    async fn season_episodes(
        &self,
        show_id: ShowId,
        season: i32,
    ) -> Result<Vec<Episode>, LibraryError>;

    async fn get_episode(
        &self,
        show_id: ShowId,
        key: EpisodeKey,
    ) -> Result<Option<Episode>, LibraryError>;

    async fn set_episode_status(
        &self,
        show_id: ShowId,
        key: EpisodeKey,
        status: CompositeStatus,
    ) -> Result<(), LibraryError>;
}

/// Persistence of the "last full backlog pass" marker.
///
/// The raw value is text so that blank or corrupt rows can be told apart
/// from a missing one.
#[async_trait]
pub trait BacklogMarkerStore: Send + Sync {
    async fn read_last_backlog(&self) -> Result<Option<String>, LibraryError>;

    async fn write_last_backlog(&self, ordinal: i64) -> Result<(), LibraryError>;
}
