use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_catalog::Genre;

/// Reference genres every catalog starts with.
pub const GENRES: [&str; 10] = [
    "Action",
    "Adventure",
    "Comedy",
    "Crime",
    "Drama",
    "Fantasy",
    "Horror",
    "Romance",
    "Sci-Fi",
    "Thriller",
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert.into_table(Genre::Table).columns([Genre::Name]);
        for name in GENRES {
            insert.values_panic([name.into()]);
        }
        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Genre::Table)
            .and_where(Expr::col(Genre::Name).is_in(GENRES))
            .to_owned();
        manager.exec_stmt(delete).await?;

        Ok(())
    }
}
