use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tv_shows")]
pub struct Model {
    /// Indexer id of the show; assigned externally, never auto-generated.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub name: String,
    pub location: String,
    /// Combined quality preference (any flags low, best flags high).
    pub quality: i64,
    pub flatten_folders: bool,
    pub air_by_date: bool,
    pub paused: bool,
    pub subtitles: bool,
    /// Airing status as reported by the indexer ("Continuing", "Ended").
    pub status: String,
    /// ISO date of the last indexer refresh; sentinel 0001-01-01 = never.
    pub last_refreshed: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tv_episode::Entity")]
    TvEpisode,
}

impl Related<super::tv_episode::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TvEpisode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
