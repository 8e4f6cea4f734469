use super::definition::Quality;
use serde::{Deserialize, Serialize};

/// The set of qualities a show accepts, plus the subset it keeps upgrading towards.
///
/// `allowed` qualities are good enough to stop being WANTED; `preferred` ("best")
/// qualities are the upgrade target. An episode that was snatched or downloaded
/// below the highest preferred tier stays in the backlog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityProfile {
    pub allowed: Vec<Quality>,

    #[serde(default)]
    pub preferred: Vec<Quality>,
}

impl QualityProfile {
    #[must_use]
    pub fn new(allowed: Vec<Quality>, preferred: Vec<Quality>) -> Self {
        Self { allowed, preferred }
    }

    /// Packs the profile into one integer: allowed tiers in the low 16 bits,
    /// preferred tiers in the high 16 bits.
    #[must_use]
    pub fn combine(&self) -> u32 {
        let allowed = self.allowed.iter().fold(0u32, |acc, q| acc | u32::from(q.bits()));
        let preferred = self
            .preferred
            .iter()
            .fold(0u32, |acc, q| acc | u32::from(q.bits()));
        allowed | (preferred << 16)
    }

    /// Inverse of [`QualityProfile::combine`].
    #[must_use]
    pub fn split(packed: u32) -> Self {
        let allowed = Quality::ALL
            .iter()
            .copied()
            .filter(|q| !q.is_none() && packed & u32::from(q.bits()) != 0)
            .collect();
        let preferred = Quality::ALL
            .iter()
            .copied()
            .filter(|q| !q.is_none() && (packed >> 16) & u32::from(q.bits()) != 0)
            .collect();
        Self { allowed, preferred }
    }

    /// The upgrade target: the best preferred tier, or [`Quality::NONE`] when the
    /// profile defines no preferred tiers.
    #[must_use]
    pub fn highest_best(&self) -> Quality {
        self.preferred.iter().copied().max().unwrap_or(Quality::NONE)
    }

    #[must_use]
    pub fn is_allowed(&self, quality: Quality) -> bool {
        self.allowed.contains(&quality) || self.preferred.contains(&quality)
    }

    /// Looks up one of the built-in presets by name (case-insensitive).
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        let profile = match name.to_lowercase().as_str() {
            "sd" => Self::new(vec![Quality::SDTV, Quality::SDDVD], vec![]),
            "hd" => Self::new(
                vec![
                    Quality::HDTV,
                    Quality::FULLHDTV,
                    Quality::HDWEBDL,
                    Quality::FULLHDWEBDL,
                    Quality::HDBLURAY,
                    Quality::FULLHDBLURAY,
                ],
                vec![],
            ),
            "hd720p" => Self::new(
                vec![Quality::HDTV, Quality::HDWEBDL, Quality::HDBLURAY],
                vec![],
            ),
            "hd1080p" => Self::new(
                vec![Quality::FULLHDTV, Quality::FULLHDWEBDL, Quality::FULLHDBLURAY],
                vec![],
            ),
            "any" => Self::new(
                vec![
                    Quality::SDTV,
                    Quality::SDDVD,
                    Quality::HDTV,
                    Quality::FULLHDTV,
                    Quality::HDWEBDL,
                    Quality::FULLHDWEBDL,
                    Quality::HDBLURAY,
                    Quality::FULLHDBLURAY,
                    Quality::UNKNOWN,
                ],
                vec![],
            ),
            _ => return None,
        };
        Some(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_and_split_are_inverse() {
        let profile = QualityProfile::new(
            vec![Quality::SDTV, Quality::HDTV],
            vec![Quality::HDWEBDL, Quality::FULLHDBLURAY],
        );
        let packed = profile.combine();
        assert_eq!(packed & 0xFFFF, 1 | 4);
        assert_eq!(QualityProfile::split(packed), profile);
    }

    #[test]
    fn highest_best_is_zero_without_preferred_tiers() {
        let profile = QualityProfile::preset("hd").unwrap();
        assert_eq!(profile.highest_best(), Quality::NONE);

        let upgrading = QualityProfile::new(
            vec![Quality::HDTV],
            vec![Quality::HDWEBDL, Quality::HDBLURAY],
        );
        assert_eq!(upgrading.highest_best(), Quality::HDBLURAY);
    }

    #[test]
    fn presets_are_case_insensitive() {
        assert!(QualityProfile::preset("HD720p").is_some());
        assert!(QualityProfile::preset("nope").is_none());
    }
}
