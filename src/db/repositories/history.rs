use crate::domain::{CompositeStatus, EpisodeKey, ShowId};
use crate::entities::{failed, history, prelude::*};
use crate::quality::Quality;
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

/// One recorded action against an episode.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub action: CompositeStatus,
    pub date: String,
    pub show_id: ShowId,
    pub episode: EpisodeKey,
    pub quality: Quality,
    pub resource: String,
    pub provider: String,
    pub previous_status: Option<CompositeStatus>,
}

/// Repository for the action history and the failed-release log
pub struct HistoryRepository {
    conn: DatabaseConnection,
}

impl HistoryRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: history::Model) -> HistoryEntry {
        HistoryEntry {
            action: CompositeStatus::from_raw(u32::try_from(m.action).unwrap_or(0)),
            date: m.date,
            show_id: ShowId::new(m.show_id),
            episode: EpisodeKey::new(m.season, m.episode),
            quality: Quality::from_bits(u16::try_from(m.quality).unwrap_or(0)),
            resource: m.resource,
            provider: m.provider,
            previous_status: m
                .previous_status
                .and_then(|s| u32::try_from(s).ok())
                .map(CompositeStatus::from_raw),
        }
    }

    pub async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let active_model = history::ActiveModel {
            action: Set(i64::from(entry.action.raw())),
            date: Set(entry.date.clone()),
            show_id: Set(entry.show_id.value()),
            season: Set(entry.episode.season),
            episode: Set(entry.episode.episode),
            quality: Set(i32::from(entry.quality.bits())),
            resource: Set(entry.resource.clone()),
            provider: Set(entry.provider.clone()),
            previous_status: Set(entry.previous_status.map(|s| i64::from(s.raw()))),
            ..Default::default()
        };

        History::insert(active_model).exec(&self.conn).await?;
        Ok(())
    }

    /// History for one episode, newest first.
    pub async fn for_episode(&self, show_id: ShowId, key: EpisodeKey) -> Result<Vec<HistoryEntry>> {
        let rows = History::find()
            .filter(history::Column::ShowId.eq(show_id.value()))
            .filter(history::Column::Season.eq(key.season))
            .filter(history::Column::Episode.eq(key.episode))
            .order_by_desc(history::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn log_failed_release(&self, release: &str, provider: &str) -> Result<()> {
        let active_model = failed::ActiveModel {
            release: Set(release.to_string()),
            provider: Set(provider.to_string()),
            logged_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        Failed::insert(active_model).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn is_failed_release(&self, release: &str) -> Result<bool> {
        let row = Failed::find()
            .filter(failed::Column::Release.eq(release))
            .one(&self.conn)
            .await?;
        Ok(row.is_some())
    }
}
