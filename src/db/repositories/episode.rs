use crate::entities::{prelude::*, tv_episode};
use crate::error::MediaError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Row access for episode records.
///
/// Identity is `(show_id, season, episode)`; the surrogate `id` column
/// exists only so duplicate identities remain detectable. Finding more
/// than one row for an identity is fatal for that show and is never
/// auto-resolved here.
pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn identity_filter(
        show_id: i64,
        season: i32,
        episode: i32,
    ) -> sea_orm::Select<tv_episode::Entity> {
        TvEpisode::find()
            .filter(tv_episode::Column::ShowId.eq(show_id))
            .filter(tv_episode::Column::Season.eq(season))
            .filter(tv_episode::Column::Episode.eq(episode))
    }

    pub async fn get(
        &self,
        show_id: i64,
        season: i32,
        episode: i32,
    ) -> Result<Option<tv_episode::Model>, MediaError> {
        let mut rows = Self::identity_filter(show_id, season, episode)
            .all(&self.conn)
            .await?;
        if rows.len() > 1 {
            return Err(MediaError::AmbiguousState(format!(
                "episode {show_id} {season}x{episode}"
            )));
        }
        Ok(rows.pop())
    }

    /// All episode rows of a show, season/episode ascending — the order
    /// multi-episode files must be renamed in.
    pub async fn list_for_show(
        &self,
        show_id: i64,
    ) -> Result<Vec<tv_episode::Model>, MediaError> {
        Ok(TvEpisode::find()
            .filter(tv_episode::Column::ShowId.eq(show_id))
            .order_by_asc(tv_episode::Column::Season)
            .order_by_asc(tv_episode::Column::Episode)
            .all(&self.conn)
            .await?)
    }

    /// Sibling rows stored in the same file (multi-episode releases),
    /// episode ascending, excluding the asking episode itself.
    pub async fn list_sharing_location(
        &self,
        show_id: i64,
        location: &str,
        excluding_season: i32,
        excluding_episode: i32,
    ) -> Result<Vec<tv_episode::Model>, MediaError> {
        if location.is_empty() {
            return Ok(Vec::new());
        }
        let rows = TvEpisode::find()
            .filter(tv_episode::Column::ShowId.eq(show_id))
            .filter(tv_episode::Column::Location.eq(location))
            .order_by_asc(tv_episode::Column::Episode)
            .all(&self.conn)
            .await?;
        Ok(rows
            .into_iter()
            .filter(|r| !(r.season == excluding_season && r.episode == excluding_episode))
            .collect())
    }

    /// Upserts by identity, preserving the surrogate id of an existing
    /// row.
    pub async fn upsert(&self, row: tv_episode::Model) -> Result<(), MediaError> {
        let existing = self.get(row.show_id, row.season, row.episode).await?;

        let active: tv_episode::ActiveModel = row.into();
        if let Some(existing) = existing {
            let mut active = active.reset_all();
            active.id = Set(existing.id);
            active.update(&self.conn).await?;
        } else {
            let mut active = active.reset_all();
            active.id = sea_orm::ActiveValue::NotSet;
            active.insert(&self.conn).await?;
        }
        Ok(())
    }

    pub async fn delete(
        &self,
        show_id: i64,
        season: i32,
        episode: i32,
    ) -> Result<bool, MediaError> {
        let result = TvEpisode::delete_many()
            .filter(tv_episode::Column::ShowId.eq(show_id))
            .filter(tv_episode::Column::Season.eq(season))
            .filter(tv_episode::Column::Episode.eq(episode))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
