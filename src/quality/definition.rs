use serde::{Deserialize, Serialize};
use std::fmt;

/// A single quality tier.
///
/// Every tier is one bit so that profiles can pack sets of tiers into a mask.
/// Tiers are ordered by their numeric value: a higher bit is a better release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u16);

impl Quality {
    pub const NONE: Self = Self(0);
    pub const SDTV: Self = Self(1);
    pub const SDDVD: Self = Self(1 << 1);
    pub const HDTV: Self = Self(1 << 2);
    pub const RAWHDTV: Self = Self(1 << 3);
    pub const FULLHDTV: Self = Self(1 << 4);
    pub const HDWEBDL: Self = Self(1 << 5);
    pub const FULLHDWEBDL: Self = Self(1 << 6);
    pub const HDBLURAY: Self = Self(1 << 7);
    pub const FULLHDBLURAY: Self = Self(1 << 8);
    pub const UNKNOWN: Self = Self(1 << 15);

    /// Every named tier, worst first.
    pub const ALL: [Self; 11] = [
        Self::NONE,
        Self::SDTV,
        Self::SDDVD,
        Self::HDTV,
        Self::RAWHDTV,
        Self::FULLHDTV,
        Self::HDWEBDL,
        Self::FULLHDWEBDL,
        Self::HDBLURAY,
        Self::FULLHDBLURAY,
        Self::UNKNOWN,
    ];

    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self.0 {
            0 => "N/A",
            1 => "SD TV",
            2 => "SD DVD",
            4 => "HD TV",
            8 => "RawHD TV",
            16 => "1080p HD TV",
            32 => "720p WEB-DL",
            64 => "1080p WEB-DL",
            128 => "720p BluRay",
            256 => "1080p BluRay",
            _ => "Unknown",
        }
    }

    /// Best-effort tier detection from a release name.
    #[must_use]
    pub fn from_release_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        let full_hd = lower.contains("1080p") || lower.contains("1080i");
        let hd = lower.contains("720p");

        if lower.contains("bluray") || lower.contains("blu-ray") || lower.contains("bdrip") {
            if full_hd {
                return Self::FULLHDBLURAY;
            }
            if hd {
                return Self::HDBLURAY;
            }
            return Self::SDDVD;
        }

        if lower.contains("web-dl") || lower.contains("webdl") || lower.contains("webrip") || lower.contains(".web.") {
            if full_hd {
                return Self::FULLHDWEBDL;
            }
            if hd {
                return Self::HDWEBDL;
            }
            return Self::SDTV;
        }

        if full_hd {
            return Self::FULLHDTV;
        }
        if hd {
            return if lower.contains("mpeg") || lower.contains("rawhd") {
                Self::RAWHDTV
            } else {
                Self::HDTV
            };
        }
        if lower.contains("dvdrip") || lower.contains("dvd") {
            return Self::SDDVD;
        }
        if lower.contains("hdtv") || lower.contains("pdtv") || lower.contains("xvid") {
            return Self::SDTV;
        }

        Self::UNKNOWN
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
