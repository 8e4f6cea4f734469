use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Composite status describing what happened (snatched, failed, ...).
    pub action: i64,
    pub date: String,
    pub show_id: i32,
    pub season: i32,
    pub episode: i32,
    pub quality: i32,
    pub resource: String,
    pub provider: String,
    /// Episode status before the action, used to revert failed snatches.
    pub previous_status: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
