use sea_orm::entity::prelude::*;

/// One episode row. The surrogate key leaves `(show_id, season, episode)`
/// as a plain index, so duplicate-identity detection stays a real check
/// at load time instead of being silently absorbed by an upsert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tv_episodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub show_id: i64,
    pub season: i32,
    pub episode: i32,
    pub name: String,
    pub description: String,
    /// ISO date; sentinel 0001-01-01 = air date unknown.
    pub airdate: String,
    /// Composite status (lifecycle status + quality bit flag).
    pub status: i64,
    /// Absolute path of the file; empty = no file on disk.
    pub location: String,
    pub file_size: i64,
    pub release_name: String,
    pub is_proper: bool,
    /// Comma-joined subtitle language codes.
    pub subtitles: String,
    pub subtitles_searchcount: i32,
    /// Timestamp of the last subtitle search; empty = never searched.
    pub subtitles_lastsearch: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tv_show::Entity",
        from = "Column::ShowId",
        to = "super::tv_show::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    TvShow,
}

impl Related<super::tv_show::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TvShow.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
