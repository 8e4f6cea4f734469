use crate::domain::{CompositeStatus, ShowId, from_ordinal, to_ordinal};
use crate::entities::{prelude::*, tv_episodes};
use crate::models::Episode;
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Repository for episode rows and their composite status
pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: tv_episodes::Model) -> Episode {
        Episode {
            show_id: ShowId::new(m.show_id),
            season: m.season,
            episode: m.episode,
            name: m.name,
            airdate: if m.airdate > 1 { from_ordinal(m.airdate) } else { None },
            status: CompositeStatus::from_raw(u32::try_from(m.status).unwrap_or(0)),
        }
    }

    /// Regular-season episodes that aired after `from_ordinal`.
    ///
    /// Specials (season 0) never take part in backlog searches.
    pub async fn aired_after(&self, show_id: ShowId, from_ordinal: i64) -> Result<Vec<Episode>> {
        let rows = TvEpisodes::find()
            .filter(tv_episodes::Column::ShowId.eq(show_id.value()))
            .filter(tv_episodes::Column::Season.gt(0))
            .filter(tv_episodes::Column::Airdate.gt(from_ordinal))
            .order_by_asc(tv_episodes::Column::Season)
            .order_by_asc(tv_episodes::Column::Episode)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn for_season(&self, show_id: ShowId, season: i32) -> Result<Vec<Episode>> {
        let rows = TvEpisodes::find()
            .filter(tv_episodes::Column::ShowId.eq(show_id.value()))
            .filter(tv_episodes::Column::Season.eq(season))
            .order_by_asc(tv_episodes::Column::Episode)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn get(&self, show_id: ShowId, season: i32, episode: i32) -> Result<Option<Episode>> {
        let row = TvEpisodes::find_by_id((show_id.value(), season, episode))
            .one(&self.conn)
            .await?;

        Ok(row.map(Self::map_model))
    }

    pub async fn upsert(&self, episode: &Episode) -> Result<()> {
        let active_model = tv_episodes::ActiveModel {
            show_id: Set(episode.show_id.value()),
            season: Set(episode.season),
            episode: Set(episode.episode),
            name: Set(episode.name.clone()),
            airdate: Set(episode.airdate.map_or(1, to_ordinal)),
            status: Set(i64::from(episode.status.raw())),
        };

        TvEpisodes::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    tv_episodes::Column::ShowId,
                    tv_episodes::Column::Season,
                    tv_episodes::Column::Episode,
                ])
                .update_columns([
                    tv_episodes::Column::Name,
                    tv_episodes::Column::Airdate,
                    tv_episodes::Column::Status,
                ])
                .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn set_status(
        &self,
        show_id: ShowId,
        season: i32,
        episode: i32,
        status: CompositeStatus,
    ) -> Result<()> {
        TvEpisodes::update_many()
            .col_expr(
                tv_episodes::Column::Status,
                sea_orm::sea_query::Expr::value(i64::from(status.raw())),
            )
            .filter(tv_episodes::Column::ShowId.eq(show_id.value()))
            .filter(tv_episodes::Column::Season.eq(season))
            .filter(tv_episodes::Column::Episode.eq(episode))
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}
