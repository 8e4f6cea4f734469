use crate::domain::ShowId;
use crate::entities::{prelude::*, tv_shows};
use crate::models::Show;
use crate::quality::QualityProfile;
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

/// Repository for tracked shows
pub struct ShowRepository {
    conn: DatabaseConnection,
}

impl ShowRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: tv_shows::Model) -> Show {
        Show {
            id: ShowId::new(m.id),
            name: m.name,
            paused: m.paused,
            quality: QualityProfile::split(u32::try_from(m.quality).unwrap_or(0)),
            air_by_date: m.air_by_date,
        }
    }

    pub async fn list(&self) -> Result<Vec<Show>> {
        let rows = TvShows::find()
            .order_by_asc(tv_shows::Column::Name)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn get(&self, id: ShowId) -> Result<Option<Show>> {
        let row = TvShows::find_by_id(id.value()).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn upsert(&self, show: &Show) -> Result<()> {
        let active_model = tv_shows::ActiveModel {
            id: Set(show.id.value()),
            name: Set(show.name.clone()),
            paused: Set(show.paused),
            quality: Set(i64::from(show.quality.combine())),
            air_by_date: Set(show.air_by_date),
        };

        TvShows::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(tv_shows::Column::Id)
                    .update_columns([
                        tv_shows::Column::Name,
                        tv_shows::Column::Paused,
                        tv_shows::Column::Quality,
                        tv_shows::Column::AirByDate,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn set_paused(&self, id: ShowId, paused: bool) -> Result<()> {
        TvShows::update_many()
            .col_expr(
                tv_shows::Column::Paused,
                sea_orm::sea_query::Expr::value(paused),
            )
            .filter(tv_shows::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
