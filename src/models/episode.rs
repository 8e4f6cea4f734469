use crate::domain::{CompositeStatus, EpisodeKey, ShowId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub show_id: ShowId,
    pub season: i32,
    pub episode: i32,
    pub name: Option<String>,
    pub airdate: Option<NaiveDate>,
    pub status: CompositeStatus,
}

impl Episode {
    #[must_use]
    pub const fn key(&self) -> EpisodeKey {
        EpisodeKey::new(self.season, self.episode)
    }

    /// Human-readable label used in logs and notifications.
    #[must_use]
    pub fn pretty_name(&self, show_name: &str, air_by_date: bool) -> String {
        match self.airdate {
            Some(date) if air_by_date => format!("{show_name} - {date}"),
            _ => format!("{show_name} - {}", self.key()),
        }
    }
}

/// Wanted episodes of one show, grouped by season.
///
/// Built fresh for every discovery pass and never mutated once it is attached
/// to a queue item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Segment {
    seasons: BTreeMap<i32, Vec<Episode>>,
}

impl Segment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, episode: Episode) {
        self.seasons.entry(episode.season).or_default().push(episode);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seasons.values().all(Vec::is_empty)
    }

    #[must_use]
    pub fn season_count(&self) -> usize {
        self.seasons.len()
    }

    #[must_use]
    pub fn episode_count(&self) -> usize {
        self.seasons.values().map(Vec::len).sum()
    }

    pub fn seasons(&self) -> impl Iterator<Item = (i32, &[Episode])> {
        self.seasons.iter().map(|(season, eps)| (*season, eps.as_slice()))
    }

    #[must_use]
    pub fn season(&self, season: i32) -> Option<&[Episode]> {
        self.seasons.get(&season).map(Vec::as_slice)
    }

    #[must_use]
    pub fn episode_keys(&self) -> BTreeSet<EpisodeKey> {
        self.seasons.values().flatten().map(Episode::key).collect()
    }
}

impl FromIterator<Episode> for Segment {
    fn from_iter<T: IntoIterator<Item = Episode>>(iter: T) -> Self {
        let mut segment = Self::new();
        for episode in iter {
            segment.push(episode);
        }
        segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EpisodeState;
    use crate::quality::Quality;

    fn episode(season: i32, number: i32) -> Episode {
        Episode {
            show_id: ShowId::new(1),
            season,
            episode: number,
            name: None,
            airdate: None,
            status: CompositeStatus::compose(EpisodeState::Wanted, Quality::NONE),
        }
    }

    #[test]
    fn groups_by_season() {
        let segment: Segment = [episode(2, 1), episode(1, 3), episode(1, 1)]
            .into_iter()
            .collect();

        assert_eq!(segment.season_count(), 2);
        assert_eq!(segment.episode_count(), 3);
        let seasons: Vec<i32> = segment.seasons().map(|(s, _)| s).collect();
        assert_eq!(seasons, vec![1, 2]);
        assert_eq!(segment.season(1).map(<[Episode]>::len), Some(2));
    }

    #[test]
    fn empty_segment_has_no_keys() {
        let segment = Segment::new();
        assert!(segment.is_empty());
        assert!(segment.episode_keys().is_empty());
    }

    #[test]
    fn pretty_name_uses_airdate_for_air_by_date_shows() {
        let mut ep = episode(2024, 5);
        ep.airdate = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(ep.pretty_name("Daily", true), "Daily - 2024-03-01");
        assert_eq!(ep.pretty_name("Daily", false), "Daily - S2024E05");
    }
}
