//! Persistence facade.
//!
//! The core only needs load-by-key and upsert-by-key for show and episode
//! rows; everything here maps 1:1 to `EpisodeRecord`/`ShowRecord`
//! attributes, composite status included, and must round-trip exactly —
//! the decision engine relies on it across restarts.

use crate::entities::{tv_episode, tv_show};
use crate::error::MediaError;
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

use repositories::episode::EpisodeRepository;
use repositories::show::ShowRepository;

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

        let url = if db_url.starts_with("sqlite:") {
            db_url.to_string()
        } else {
            format!("sqlite:{db_url}")
        };

        let mut opt = ConnectOptions::new(url);
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

    /// In-memory database for tests and dry runs. Pinned to a single
    /// connection — every pooled sqlite `:memory:` connection would be
    /// its own empty database.
    pub async fn in_memory() -> Result<Self> {
        Self::with_pool_options("sqlite::memory:", 1, 1).await
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn show_repo(&self) -> ShowRepository {
        ShowRepository::new(self.conn.clone())
    }

    fn episode_repo(&self) -> EpisodeRepository {
        EpisodeRepository::new(self.conn.clone())
    }

    pub async fn get_show(&self, id: i64) -> Result<Option<tv_show::Model>, MediaError> {
        self.show_repo().get(id).await
    }

    pub async fn list_shows(&self) -> Result<Vec<tv_show::Model>, MediaError> {
        self.show_repo().list().await
    }

    pub async fn upsert_show(&self, row: tv_show::Model) -> Result<(), MediaError> {
        self.show_repo().upsert(row).await
    }

    pub async fn delete_show(&self, id: i64) -> Result<bool, MediaError> {
        self.show_repo().delete(id).await
    }

    pub async fn show_exists(&self, id: i64) -> Result<bool, MediaError> {
        self.show_repo().exists(id).await
    }

    pub async fn get_episode_row(
        &self,
        show_id: i64,
        season: i32,
        episode: i32,
    ) -> Result<Option<tv_episode::Model>, MediaError> {
        self.episode_repo().get(show_id, season, episode).await
    }

    pub async fn list_episode_rows(
        &self,
        show_id: i64,
    ) -> Result<Vec<tv_episode::Model>, MediaError> {
        self.episode_repo().list_for_show(show_id).await
    }

    pub async fn episodes_sharing_location(
        &self,
        show_id: i64,
        location: &str,
        excluding_season: i32,
        excluding_episode: i32,
    ) -> Result<Vec<tv_episode::Model>, MediaError> {
        self.episode_repo()
            .list_sharing_location(show_id, location, excluding_season, excluding_episode)
            .await
    }

    pub async fn upsert_episode_row(&self, row: tv_episode::Model) -> Result<(), MediaError> {
        self.episode_repo().upsert(row).await
    }

    pub async fn delete_episode_row(
        &self,
        show_id: i64,
        season: i32,
        episode: i32,
    ) -> Result<bool, MediaError> {
        self.episode_repo().delete(show_id, season, episode).await
    }
}
