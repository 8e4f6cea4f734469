use crate::domain::{CompositeStatus, EpisodeKey, ShowId};
use crate::models::{Episode, Show};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::history::HistoryEntry;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn show_repo(&self) -> repositories::show::ShowRepository {
        repositories::show::ShowRepository::new(self.conn.clone())
    }

    fn episode_repo(&self) -> repositories::episode::EpisodeRepository {
        repositories::episode::EpisodeRepository::new(self.conn.clone())
    }

    fn info_repo(&self) -> repositories::info::InfoRepository {
        repositories::info::InfoRepository::new(self.conn.clone())
    }

    fn history_repo(&self) -> repositories::history::HistoryRepository {
        repositories::history::HistoryRepository::new(self.conn.clone())
    }

    pub async fn list_shows(&self) -> Result<Vec<Show>> {
        self.show_repo().list().await
    }

    pub async fn get_show(&self, id: ShowId) -> Result<Option<Show>> {
        self.show_repo().get(id).await
    }

    pub async fn add_show(&self, show: &Show) -> Result<()> {
        self.show_repo().upsert(show).await
    }

    pub async fn set_show_paused(&self, id: ShowId, paused: bool) -> Result<()> {
        self.show_repo().set_paused(id, paused).await
    }

    pub async fn episodes_aired_after(&self, show_id: ShowId, from_ordinal: i64) -> Result<Vec<Episode>> {
        self.episode_repo().aired_after(show_id, from_ordinal).await
    }

    pub async fn season_episodes(&self, show_id: ShowId, season: i32) -> Result<Vec<Episode>> {
        self.episode_repo().for_season(show_id, season).await
    }

    pub async fn get_episode(
        &self,
        show_id: ShowId,
        season: i32,
        episode: i32,
    ) -> Result<Option<Episode>> {
        self.episode_repo().get(show_id, season, episode).await
    }

    pub async fn save_episode(&self, episode: &Episode) -> Result<()> {
        self.episode_repo().upsert(episode).await
    }

    pub async fn set_episode_status(
        &self,
        show_id: ShowId,
        key: EpisodeKey,
        status: CompositeStatus,
    ) -> Result<()> {
        self.episode_repo()
            .set_status(show_id, key.season, key.episode, status)
            .await
    }

    pub async fn read_last_backlog(&self) -> Result<Option<String>> {
        self.info_repo().read_last_backlog().await
    }

    pub async fn write_last_backlog(&self, when: i64) -> Result<()> {
        self.info_repo().write_last_backlog(when).await
    }

    pub async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.history_repo().append(entry).await
    }

    pub async fn episode_history(&self, show_id: ShowId, key: EpisodeKey) -> Result<Vec<HistoryEntry>> {
        self.history_repo().for_episode(show_id, key).await
    }

    pub async fn log_failed_release(&self, release: &str, provider: &str) -> Result<()> {
        self.history_repo().log_failed_release(release, provider).await
    }

    pub async fn is_failed_release(&self, release: &str) -> Result<bool> {
        self.history_repo().is_failed_release(release).await
    }
}
