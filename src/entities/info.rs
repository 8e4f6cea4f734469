use sea_orm::entity::prelude::*;

/// Single-row bookkeeping table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "info")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Ordinal day of the last full backlog pass, stored as text.
    pub last_backlog: Option<String>,
    pub last_indexer: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
