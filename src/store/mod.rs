//! Movie persistence behind one async contract.
//!
//! The backend is chosen once at startup: [`SqlMovieStore`] talks to SQLite,
//! PostgreSQL or MySQL through sea-orm, [`JsonMovieStore`] keeps a seeded
//! catalog in memory.

mod genre;
mod json;
mod sql;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

pub use json::JsonMovieStore;
pub use sql::SqlMovieStore;

use crate::{
    config::{Backend, Config},
    db,
    error::StoreError,
    models::{Movie, MovieListing, MoviePatch, NewMovie},
};

#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Short backend name, used in logs and the health route.
    fn backend(&self) -> &'static str;

    /// Every movie, or only those linked to `genre` when given.
    /// An unknown genre yields an empty list.
    async fn get_all(&self, genre: Option<&str>) -> Result<Vec<MovieListing>, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Movie>, StoreError>;

    /// Inserts the movie and its genre links as one unit. Fails with
    /// [`StoreError::InvalidReference`] and leaves nothing behind when a
    /// genre name does not resolve.
    async fn create(&self, input: NewMovie) -> Result<Movie, StoreError>;

    async fn update(&self, id: &str, patch: MoviePatch) -> Result<Option<Movie>, StoreError>;

    /// Removes the genre links, then the movie. `false` when nothing matched.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

pub async fn open(config: &Config) -> anyhow::Result<Arc<dyn MovieStore>> {
    let store: Arc<dyn MovieStore> = match config.backend {
        Backend::Sql => {
            let db = db::connect_and_migrate(&config.database_url)
                .await
                .context("connecting to the movie database")?;
            Arc::new(SqlMovieStore::new(db))
        },
        Backend::Json => Arc::new(JsonMovieStore::from_path(&config.movies_json_path)?),
    };
    tracing::info!(backend = store.backend(), "movie store ready");
    Ok(store)
}

/// Identifiers that are not UUIDs cannot match any movie.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}
