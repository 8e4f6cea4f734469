//! Failed-download bookkeeping used by retry searches.

use crate::models::Episode;
use crate::services::LibraryError;
use async_trait::async_trait;

/// The release that was snatched for an episode and later reported as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRelease {
    pub release: String,
    pub provider: String,
}

#[async_trait]
pub trait FailedHistory: Send + Sync {
    /// Most recent snatch of `episode` that has not been marked failed yet.
    async fn find_release(&self, episode: &Episode) -> Result<Option<FailedRelease>, LibraryError>;

    /// Flips the episode status to `Failed`, keeping its quality.
    async fn mark_failed(&self, episode: &Episode) -> Result<(), LibraryError>;

    /// Adds the release to the list of releases that must never be snatched again.
    async fn log_failed(&self, release: &FailedRelease) -> Result<(), LibraryError>;

    /// Appends a `Failed` row to the episode's history.
    async fn record_failure(
        &self,
        episode: &Episode,
        release: &FailedRelease,
    ) -> Result<(), LibraryError>;

    /// Restores the status the episode had before the failed snatch and
    /// returns the episode as it now stands.
    async fn revert_episode(&self, episode: &Episode) -> Result<Episode, LibraryError>;
}
