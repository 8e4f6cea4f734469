use crate::domain::ShowId;
use crate::quality::QualityProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub name: String,
    pub paused: bool,
    pub quality: QualityProfile,
    /// Episodes are keyed by broadcast date rather than season/episode number.
    #[serde(default)]
    pub air_by_date: bool,
}
