use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(big_integer(Movie::OriginalId))
                    .col(string(Movie::Title))
                    .col(double(Movie::Popularity))
                    .col(string_null(Movie::PosterPath))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_popularity")
                    .table(Movie::Table)
                    .col(Movie::Popularity)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenre::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieGenre::Id))
                    .col(integer(MovieGenre::MovieId))
                    .col(string(MovieGenre::Genre))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_movie")
                            .from(MovieGenre::Table, MovieGenre::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_genre_unique")
                    .table(MovieGenre::Table)
                    .col(MovieGenre::MovieId)
                    .col(MovieGenre::Genre)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_genre_genre")
                    .table(MovieGenre::Table)
                    .col(MovieGenre::Genre)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieCountry::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieCountry::Id))
                    .col(integer(MovieCountry::MovieId))
                    .col(string(MovieCountry::Country))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_country_movie")
                            .from(MovieCountry::Table, MovieCountry::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_country_unique")
                    .table(MovieCountry::Table)
                    .col(MovieCountry::MovieId)
                    .col(MovieCountry::Country)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_country_country")
                    .table(MovieCountry::Table)
                    .col(MovieCountry::Country)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(pk_auto(Comment::Id))
                    .col(integer(Comment::MovieId))
                    .col(text(Comment::Text))
                    .col(big_integer(Comment::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_movie")
                            .from(Comment::Table, Comment::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_movie_created_at")
                    .table(Comment::Table)
                    .col(Comment::MovieId)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Comment::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieCountry::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieGenre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    OriginalId,
    Title,
    Popularity,
    PosterPath,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    Id,
    MovieId,
    Genre,
}

#[derive(DeriveIden)]
enum MovieCountry {
    Table,
    Id,
    MovieId,
    Country,
}

#[derive(DeriveIden)]
enum Comment {
    Table,
    Id,
    MovieId,
    Text,
    CreatedAt,
}
