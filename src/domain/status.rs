//! Persisted episode status codec.
//!
//! An episode's status is stored as a single integer that packs the download
//! state together with the quality tier of the file (or snatched release):
//!
//! ```text
//!  31        24 23                     8 7          0
//! +------------+------------------------+------------+
//! |  reserved  |   quality tier (u16)   | state code |
//! +------------+------------------------+------------+
//! ```
//!
//! The reserved byte is always zero. State codes are the discriminants of
//! [`EpisodeState`]; quality bits are the flag values of [`Quality`].

use crate::quality::Quality;
use serde::{Deserialize, Serialize};
use std::fmt;

const STATE_MASK: u32 = 0xFF;
const QUALITY_SHIFT: u32 = 8;
const QUALITY_MASK: u32 = 0xFFFF;

/// Download state of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EpisodeState {
    Unknown = 0,
    Unaired = 1,
    Snatched = 2,
    Wanted = 3,
    Downloaded = 4,
    Skipped = 5,
    Archived = 6,
    Ignored = 7,
    SnatchedProper = 9,
    Subtitled = 10,
    Failed = 11,
    SnatchedBest = 12,
}

impl EpisodeState {
    pub const ALL: [Self; 12] = [
        Self::Unknown,
        Self::Unaired,
        Self::Snatched,
        Self::Wanted,
        Self::Downloaded,
        Self::Skipped,
        Self::Archived,
        Self::Ignored,
        Self::SnatchedProper,
        Self::Subtitled,
        Self::Failed,
        Self::SnatchedBest,
    ];

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a persisted state code. Codes outside the table map to `Unknown`.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Unaired,
            2 => Self::Snatched,
            3 => Self::Wanted,
            4 => Self::Downloaded,
            5 => Self::Skipped,
            6 => Self::Archived,
            7 => Self::Ignored,
            9 => Self::SnatchedProper,
            10 => Self::Subtitled,
            11 => Self::Failed,
            12 => Self::SnatchedBest,
            _ => Self::Unknown,
        }
    }

    /// States for which a file exists or is on its way; an upgrade may still be wanted.
    #[must_use]
    pub const fn is_snatched_or_downloaded(self) -> bool {
        matches!(
            self,
            Self::Downloaded | Self::Snatched | Self::SnatchedProper | Self::SnatchedBest
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Unaired => "Unaired",
            Self::Snatched => "Snatched",
            Self::Wanted => "Wanted",
            Self::Downloaded => "Downloaded",
            Self::Skipped => "Skipped",
            Self::Archived => "Archived",
            Self::Ignored => "Ignored",
            Self::SnatchedProper => "Snatched (Proper)",
            Self::Subtitled => "Subtitled",
            Self::Failed => "Failed",
            Self::SnatchedBest => "Snatched (Best)",
        }
    }
}

impl fmt::Display for EpisodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A packed (state, quality) pair as stored in the episode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeStatus(u32);

impl CompositeStatus {
    #[must_use]
    pub const fn compose(state: EpisodeState, quality: Quality) -> Self {
        Self(((quality.bits() as u32) << QUALITY_SHIFT) | state.code() as u32)
    }

    #[must_use]
    pub const fn decompose(self) -> (EpisodeState, Quality) {
        (self.state(), self.quality())
    }

    #[must_use]
    pub const fn state(self) -> EpisodeState {
        EpisodeState::from_code((self.0 & STATE_MASK) as u8)
    }

    #[must_use]
    pub const fn quality(self) -> Quality {
        Quality::from_bits(((self.0 >> QUALITY_SHIFT) & QUALITY_MASK) as u16)
    }

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Same quality, new state.
    #[must_use]
    pub const fn with_state(self, state: EpisodeState) -> Self {
        Self::compose(state, self.quality())
    }
}

impl From<(EpisodeState, Quality)> for CompositeStatus {
    fn from((state, quality): (EpisodeState, Quality)) -> Self {
        Self::compose(state, quality)
    }
}

impl fmt::Display for CompositeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, quality) = self.decompose();
        if quality.is_none() {
            write!(f, "{state}")
        } else {
            write!(f, "{state} ({quality})")
        }
    }
}
