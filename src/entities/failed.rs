use sea_orm::entity::prelude::*;

/// Releases known to be bad; providers should not offer them again.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "failed")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub release: String,
    pub provider: String,
    pub logged_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
