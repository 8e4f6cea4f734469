use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tv_shows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub paused: bool,
    /// Packed quality profile, see `QualityProfile::combine`.
    pub quality: i64,
    pub air_by_date: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tv_episodes::Entity")]
    TvEpisodes,
}

impl Related<super::tv_episodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TvEpisodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
