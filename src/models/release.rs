use crate::domain::{EpisodeKey, ShowId};
use crate::quality::Quality;
use serde::{Deserialize, Serialize};

/// A downloadable candidate returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub show_id: ShowId,

    pub provider: String,

    pub name: String,

    pub url: String,

    pub quality: Quality,

    /// Episodes the release covers; a season pack lists the whole season.
    pub episodes: Vec<EpisodeKey>,
}
