//! Domain types for show tracking with strong typing.
//!
//! This module provides the identifiers, the persisted episode status codec and
//! the ordinal-date helpers shared by the backlog and search-queue subsystems.

pub mod events;
pub mod status;

pub use status::{CompositeStatus, EpisodeState};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tracked show.
///
/// This newtype wrapper prevents mixing show IDs with season or episode numbers.
///
/// # Examples
///
/// ```rust
/// use backlogarr::domain::ShowId;
///
/// let id = ShowId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ShowId(i32);

impl ShowId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ShowId> for i32 {
    fn from(id: ShowId) -> Self {
        id.0
    }
}

impl From<i32> for ShowId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for ShowId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for ShowId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Season/episode coordinates of an episode within one show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub season: i32,
    pub episode: i32,
}

impl EpisodeKey {
    #[must_use]
    pub const fn new(season: i32, episode: i32) -> Self {
        Self { season, episode }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// Ordinal day used as the "never happened" sentinel (0001-01-01).
pub const ORDINAL_EPOCH: i64 = 1;

/// Converts a date to its proleptic Gregorian ordinal (0001-01-01 is day 1).
#[must_use]
pub fn to_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

/// Converts an ordinal day back into a date. Out-of-range values yield `None`.
#[must_use]
pub fn from_ordinal(ordinal: i64) -> Option<NaiveDate> {
    i32::try_from(ordinal)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// The sentinel date, 0001-01-01.
#[must_use]
pub fn epoch_date() -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(1).unwrap_or_default()
}
