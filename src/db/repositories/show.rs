use crate::entities::{prelude::*, tv_show};
use crate::error::MediaError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Row access for show records, keyed by indexer id.
pub struct ShowRepository {
    conn: DatabaseConnection,
}

impl ShowRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i64) -> Result<Option<tv_show::Model>, MediaError> {
        Ok(TvShow::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list(&self) -> Result<Vec<tv_show::Model>, MediaError> {
        Ok(TvShow::find()
            .order_by_asc(tv_show::Column::Name)
            .all(&self.conn)
            .await?)
    }

    pub async fn upsert(&self, row: tv_show::Model) -> Result<(), MediaError> {
        let existing = TvShow::find_by_id(row.id).one(&self.conn).await?;
        let active: tv_show::ActiveModel = row.into();
        let active = active.reset_all();
        if existing.is_some() {
            active.update(&self.conn).await?;
        } else {
            active.insert(&self.conn).await?;
        }
        Ok(())
    }

    /// Deletes the show row; episode rows go with it via the cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, MediaError> {
        let result = TvShow::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn exists(&self, id: i64) -> Result<bool, MediaError> {
        Ok(TvShow::find()
            .filter(tv_show::Column::Id.eq(id))
            .one(&self.conn)
            .await?
            .is_some())
    }
}
