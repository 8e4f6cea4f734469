use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_tv_episodes_show_airdate")
                    .table(TvEpisodes::Table)
                    .col(TvEpisodes::ShowId)
                    .col(TvEpisodes::Airdate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_history_episode")
                    .table(History::Table)
                    .col(History::ShowId)
                    .col(History::Season)
                    .col(History::Episode)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_history_episode")
                    .table(History::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tv_episodes_show_airdate")
                    .table(TvEpisodes::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum TvEpisodes {
    Table,
    ShowId,
    Airdate,
}

#[derive(DeriveIden)]
enum History {
    Table,
    ShowId,
    Season,
    Episode,
}
