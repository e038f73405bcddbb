use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(TvShow)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(TvEpisode)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // identity lookup index; intentionally NOT unique so duplicate
        // rows are detectable at load time
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tv_episodes_identity")
                    .table(TvEpisodes::Table)
                    .col(TvEpisodes::ShowId)
                    .col(TvEpisodes::Season)
                    .col(TvEpisodes::Episode)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TvEpisodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TvShows::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TvShows {
    Table,
}

#[derive(DeriveIden)]
enum TvEpisodes {
    Table,
    ShowId,
    Season,
    Episode,
}
