use crate::entities::{info, prelude::*};
use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::debug;

/// Repository for the single-row `info` table
pub struct InfoRepository {
    conn: DatabaseConnection,
}

impl InfoRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Raw persisted marker. `None` when the table is empty or the column is NULL.
    pub async fn read_last_backlog(&self) -> Result<Option<String>> {
        let row = Info::find()
            .order_by_asc(info::Column::Id)
            .one(&self.conn)
            .await?;

        Ok(row.and_then(|r| r.last_backlog))
    }

    /// Inserts the row with defaults when missing, otherwise overwrites the marker.
    pub async fn write_last_backlog(&self, when: i64) -> Result<()> {
        debug!("Setting the last backlog in the DB to {}", when);

        let existing = Info::find().one(&self.conn).await?;

        if existing.is_none() {
            let active_model = info::ActiveModel {
                last_backlog: Set(Some(when.to_string())),
                last_indexer: Set(0),
                ..Default::default()
            };
            Info::insert(active_model).exec(&self.conn).await?;
        } else {
            Info::update_many()
                .col_expr(
                    info::Column::LastBacklog,
                    sea_orm::sea_query::Expr::value(when.to_string()),
                )
                .exec(&self.conn)
                .await?;
        }

        Ok(())
    }
}
