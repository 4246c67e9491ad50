use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    EntityTrait, QueryFilter, QuerySelect, RelationTrait, Set, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{MovieStore, genre, parse_id};
use crate::{
    entities::{movie, movie_genres},
    error::StoreError,
    models::{Movie, MovieField, MovieListing, MoviePatch, MovieValue, NewMovie},
};

#[derive(Clone)]
pub struct SqlMovieStore {
    db: DatabaseConnection,
}

impl SqlMovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find(&self, id: Uuid) -> Result<Option<Movie>, StoreError> {
        let movie = movie::Entity::find_by_id(id).one(&self.db).await?;
        Ok(movie.map(Movie::from))
    }
}

#[async_trait]
impl MovieStore for SqlMovieStore {
    fn backend(&self) -> &'static str {
        match self.db.get_database_backend() {
            DbBackend::MySql => "mysql",
            DbBackend::Postgres => "postgres",
            DbBackend::Sqlite => "sqlite",
        }
    }

    async fn get_all(&self, genre: Option<&str>) -> Result<Vec<MovieListing>, StoreError> {
        let Some(name) = genre else {
            let movies = movie::Entity::find().all(&self.db).await?;
            return Ok(movies
                .into_iter()
                .map(|m| MovieListing { movie: m.into(), genre: None })
                .collect());
        };

        let Some(genre) = genre::resolve(&self.db, name).await? else {
            debug!(genre = %name, "unknown genre, empty listing");
            return Ok(Vec::new());
        };

        let movies = movie::Entity::find()
            .join(sea_orm::JoinType::InnerJoin, movie::Relation::MovieGenres.def())
            .filter(movie_genres::Column::GenreId.eq(genre.id))
            .all(&self.db)
            .await?;

        debug!(genre = %genre.name, count = movies.len(), "listed movies by genre");
        Ok(movies
            .into_iter()
            .map(|m| MovieListing { movie: m.into(), genre: Some(genre.name.clone()) })
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Movie>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        self.find(id).await
    }

    async fn create(&self, input: NewMovie) -> Result<Movie, StoreError> {
        let id = Uuid::new_v4();
        let txn = self.db.begin().await.map_err(StoreError::write("creating"))?;

        let inserted = insert_movie(&txn, id, input).await;
        match inserted {
            Ok(movie) => {
                txn.commit().await.map_err(StoreError::write("creating"))?;
                debug!(movie_id = %id, "created movie");
                Ok(movie)
            },
            Err(err) => {
                warn!(movie_id = %id, error = %err, "rolling back movie creation");
                if let Err(rollback) = txn.rollback().await {
                    warn!(movie_id = %id, error = %rollback, "rollback failed");
                }
                Err(err)
            },
        }
    }

    async fn update(&self, id: &str, patch: MoviePatch) -> Result<Option<Movie>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        if self.find(id).await?.is_none() {
            return Ok(None);
        }

        if !patch.is_empty() {
            let mut stmt = movie::Entity::update_many().filter(movie::Column::Id.eq(id));
            for (field, value) in patch.changes() {
                stmt = stmt.col_expr(column(*field), Expr::value(db_value(value)));
            }
            stmt.exec(&self.db).await.map_err(StoreError::write("updating"))?;
            debug!(movie_id = %id, columns = patch.changes().len(), "updated movie");
        }

        self.find(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };

        let txn = self.db.begin().await.map_err(StoreError::write("deleting"))?;
        if movie::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Ok(false);
        }

        // join rows first, the movie row is still referenced until then
        let unlinked = movie_genres::Entity::delete_many()
            .filter(movie_genres::Column::MovieId.eq(id))
            .exec(&txn)
            .await
            .map_err(StoreError::write("deleting"))?;
        movie::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(StoreError::write("deleting"))?;
        txn.commit().await.map_err(StoreError::write("deleting"))?;

        debug!(movie_id = %id, genre_links = unlinked.rows_affected, "deleted movie");
        Ok(true)
    }
}

async fn insert_movie(
    txn: &DatabaseTransaction,
    id: Uuid,
    input: NewMovie,
) -> Result<Movie, StoreError> {
    let model = movie::ActiveModel {
        id: Set(id),
        title: Set(input.title),
        year: Set(input.year),
        director: Set(input.director),
        duration: Set(input.duration),
        poster: Set(input.poster),
        rate: Set(input.rate),
    };
    movie::Entity::insert(model)
        .exec_without_returning(txn)
        .await
        .map_err(StoreError::write("creating"))?;

    let mut genre_ids = Vec::with_capacity(input.genre.len());
    for name in &input.genre {
        let resolved = genre::resolve(txn, name).await.map_err(StoreError::write("creating"))?;
        let Some(genre) = resolved else {
            return Err(StoreError::InvalidReference { genre: name.clone() });
        };
        if !genre_ids.contains(&genre.id) {
            genre_ids.push(genre.id);
        }
    }

    if !genre_ids.is_empty() {
        let links = genre_ids.into_iter().map(|genre_id| movie_genres::ActiveModel {
            movie_id: Set(id),
            genre_id: Set(genre_id),
        });
        movie_genres::Entity::insert_many(links)
            .exec_without_returning(txn)
            .await
            .map_err(StoreError::write("creating"))?;
    }

    let created = movie::Entity::find_by_id(id)
        .one(txn)
        .await
        .map_err(StoreError::write("creating"))?
        .ok_or_else(|| {
            StoreError::write("creating")(DbErr::RecordNotFound(format!("movie {id}")))
        })?;

    Ok(created.into())
}

fn column(field: MovieField) -> movie::Column {
    match field {
        MovieField::Title => movie::Column::Title,
        MovieField::Year => movie::Column::Year,
        MovieField::Director => movie::Column::Director,
        MovieField::Duration => movie::Column::Duration,
        MovieField::Poster => movie::Column::Poster,
        MovieField::Rate => movie::Column::Rate,
    }
}

fn db_value(value: &MovieValue) -> sea_orm::Value {
    match value {
        MovieValue::Text(s) => s.clone().into(),
        MovieValue::Int(i) => (*i).into(),
        MovieValue::Float(f) => (*f).into(),
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;
    use tempfile::TempDir;

    use super::*;
    use crate::{db, entities::genre as genre_entity};

    async fn store() -> (TempDir, SqlMovieStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("movies.db").display());
        let db = db::connect_and_migrate(&url).await.unwrap();
        (dir, SqlMovieStore::new(db))
    }

    fn dune(genre: &[&str]) -> NewMovie {
        NewMovie {
            title: "Dune".to_string(),
            year: 2021,
            director: "Villeneuve".to_string(),
            duration: 155,
            poster: "https://example.com/dune.jpg".to_string(),
            rate: 8.0,
            genre: genre.iter().map(|g| g.to_string()).collect(),
        }
    }

    async fn genre_id(store: &SqlMovieStore, name: &str) -> i32 {
        genre_entity::Entity::find()
            .filter(genre_entity::Column::Name.eq(name))
            .one(&store.db)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_then_get_by_id_returns_same_columns() {
        let (_dir, store) = store().await;

        let created = store.create(dune(&["Sci-Fi"])).await.unwrap();
        let loaded = store.get_by_id(&created.id.to_string()).await.unwrap().unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.title, "Dune");
        assert_eq!(loaded.year, 2021);
        assert_eq!(loaded.director, "Villeneuve");
        assert_eq!(loaded.duration, 155);
        assert_eq!(loaded.poster, "https://example.com/dune.jpg");
        assert_eq!(loaded.rate, 8.0);
    }

    #[tokio::test]
    async fn create_links_each_resolved_genre_once() {
        let (_dir, store) = store().await;
        let sci_fi = genre_id(&store, "Sci-Fi").await;

        let created = store.create(dune(&["Sci-Fi", "sci-fi"])).await.unwrap();

        let links = movie_genres::Entity::find()
            .filter(movie_genres::Column::MovieId.eq(created.id))
            .all(&store.db)
            .await
            .unwrap();
        assert_eq!(links, vec![movie_genres::Model { movie_id: created.id, genre_id: sci_fi }]);
    }

    #[tokio::test]
    async fn create_with_unknown_genre_leaves_no_movie() {
        let (_dir, store) = store().await;

        let err = store.create(dune(&["Sci-Fi", "Space Opera"])).await.unwrap_err();

        assert!(
            matches!(err, StoreError::InvalidReference { ref genre } if genre == "Space Opera")
        );
        assert_eq!(movie::Entity::find().count(&store.db).await.unwrap(), 0);
        assert_eq!(movie_genres::Entity::find().count(&store.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_write_failure_is_reported_and_rolled_back() {
        let (_dir, store) = store().await;
        store.db.execute_unprepared("DROP TABLE movie_genres").await.unwrap();

        let err = store.create(dune(&["Sci-Fi"])).await.unwrap_err();

        assert!(matches!(err, StoreError::Write { op: "creating", .. }));
        assert_eq!(movie::Entity::find().count(&store.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_all_without_filter_omits_genre() {
        let (_dir, store) = store().await;
        store.create(dune(&["Sci-Fi"])).await.unwrap();
        store.create(NewMovie { title: "Heat".to_string(), ..dune(&["Crime"]) }).await.unwrap();

        let all = store.get_all(None).await.unwrap();

        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|m| m.genre.is_none()));
    }

    #[tokio::test]
    async fn get_all_filters_by_genre_case_insensitively() {
        let (_dir, store) = store().await;
        let heat = NewMovie { title: "Heat".to_string(), ..dune(&["Drama"]) };
        let drama = store.create(heat).await.unwrap();
        store.create(dune(&["Sci-Fi"])).await.unwrap();

        let listed = store.get_all(Some("drama")).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].movie.id, drama.id);
        assert_eq!(listed[0].genre.as_deref(), Some("Drama"));
    }

    #[tokio::test]
    async fn get_all_with_unknown_genre_is_empty() {
        let (_dir, store) = store().await;
        store.create(dune(&["Sci-Fi"])).await.unwrap();

        assert!(store.get_all(Some("Western")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_id_treats_malformed_and_unknown_ids_as_missing() {
        let (_dir, store) = store().await;

        assert!(store.get_by_id("not-a-uuid").await.unwrap().is_none());
        assert!(store.get_by_id(&Uuid::new_v4().to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_changes_only_named_columns() {
        let (_dir, store) = store().await;
        let created = store.create(dune(&["Sci-Fi"])).await.unwrap();

        let mut patch = MoviePatch::default();
        patch.set(MovieField::Rate, MovieValue::Float(9.0));
        let updated = store.update(&created.id.to_string(), patch).await.unwrap().unwrap();

        assert_eq!(updated.rate, 9.0);
        assert_eq!(Movie { rate: created.rate, ..updated }, created);
    }

    #[tokio::test]
    async fn update_pairs_columns_with_values_in_any_order() {
        let (_dir, store) = store().await;
        let created = store.create(dune(&["Sci-Fi"])).await.unwrap();

        let mut patch = MoviePatch::default();
        patch.set(MovieField::Duration, MovieValue::Int(166));
        patch.set(MovieField::Title, MovieValue::Text("Dune: Part Two".to_string()));
        patch.set(MovieField::Year, MovieValue::Int(2024));
        let updated = store.update(&created.id.to_string(), patch).await.unwrap().unwrap();

        assert_eq!(updated.title, "Dune: Part Two");
        assert_eq!(updated.year, 2024);
        assert_eq!(updated.duration, 166);
        assert_eq!(updated.director, created.director);
    }

    #[tokio::test]
    async fn update_missing_movie_is_none() {
        let (_dir, store) = store().await;
        let mut patch = MoviePatch::default();
        patch.set(MovieField::Rate, MovieValue::Float(1.0));

        assert!(store.update(&Uuid::new_v4().to_string(), patch.clone()).await.unwrap().is_none());
        assert!(store.update("garbage", patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_update_returns_current_movie() {
        let (_dir, store) = store().await;
        let created = store.create(dune(&["Sci-Fi"])).await.unwrap();

        let same = store.update(&created.id.to_string(), MoviePatch::default()).await.unwrap();

        assert_eq!(same, Some(created));
    }

    #[tokio::test]
    async fn delete_removes_links_and_movie() {
        let (_dir, store) = store().await;
        let created = store.create(dune(&["Sci-Fi", "Adventure"])).await.unwrap();
        let id = created.id.to_string();

        assert!(store.delete(&id).await.unwrap());
        assert!(store.get_by_id(&id).await.unwrap().is_none());
        assert_eq!(movie_genres::Entity::find().count(&store.db).await.unwrap(), 0);
        assert!(!store.delete(&id).await.unwrap());
        assert!(!store.delete("not-a-uuid").await.unwrap());
    }

    #[tokio::test]
    async fn delete_leaves_other_movies_linked() {
        let (_dir, store) = store().await;
        let first = store.create(dune(&["Sci-Fi"])).await.unwrap();
        let arrival = NewMovie { title: "Arrival".to_string(), ..dune(&["Sci-Fi"]) };
        let second = store.create(arrival).await.unwrap();

        store.delete(&first.id.to_string()).await.unwrap();

        let listed = store.get_all(Some("Sci-Fi")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].movie.id, second.id);
    }

    #[tokio::test]
    async fn reports_sqlite_backend() {
        let (_dir, store) = store().await;
        assert_eq!(store.backend(), "sqlite");
    }
}
