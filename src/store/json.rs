use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{MovieStore, parse_id};
use crate::{
    error::StoreError,
    models::{Movie, MovieListing, MoviePatch, NewMovie},
};

#[derive(Clone, Debug, Deserialize)]
struct StoredMovie {
    #[serde(flatten)]
    movie: Movie,
    genre: Vec<String>,
}

impl StoredMovie {
    fn has_genre(&self, genre: &str) -> bool {
        self.genre.iter().any(|g| g.to_lowercase() == genre.to_lowercase())
    }
}

/// In-memory mock catalog seeded from a JSON file. Changes are not written back.
pub struct JsonMovieStore {
    movies: RwLock<Vec<StoredMovie>>,
}

impl JsonMovieStore {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading movie seed {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing movie seed {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let movies: Vec<StoredMovie> = serde_json::from_str(raw)?;
        debug!(count = movies.len(), "loaded movie seed");
        Ok(Self { movies: RwLock::new(movies) })
    }
}

/// Same reference genres the SQL schema is seeded with.
fn resolve_genre(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    migration::GENRES.into_iter().find(|g| g.to_lowercase() == name)
}

#[async_trait]
impl MovieStore for JsonMovieStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    async fn get_all(&self, genre: Option<&str>) -> Result<Vec<MovieListing>, StoreError> {
        let movies = self.movies.read().await;
        let Some(name) = genre else {
            return Ok(movies
                .iter()
                .map(|m| MovieListing { movie: m.movie.clone(), genre: None })
                .collect());
        };

        let Some(genre) = resolve_genre(name) else {
            debug!(genre = %name, "unknown genre, empty listing");
            return Ok(Vec::new());
        };

        Ok(movies
            .iter()
            .filter(|m| m.has_genre(genre))
            .map(|m| MovieListing { movie: m.movie.clone(), genre: Some(genre.to_string()) })
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Movie>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let movies = self.movies.read().await;
        Ok(movies.iter().find(|m| m.movie.id == id).map(|m| m.movie.clone()))
    }

    async fn create(&self, input: NewMovie) -> Result<Movie, StoreError> {
        let mut genre: Vec<String> = Vec::with_capacity(input.genre.len());
        for name in &input.genre {
            let resolved = resolve_genre(name)
                .ok_or_else(|| StoreError::InvalidReference { genre: name.clone() })?;
            if !genre.iter().any(|g| g == resolved) {
                genre.push(resolved.to_string());
            }
        }

        let movie = Movie {
            id: Uuid::new_v4(),
            title: input.title,
            year: input.year,
            director: input.director,
            duration: input.duration,
            poster: input.poster,
            rate: input.rate,
        };
        self.movies.write().await.push(StoredMovie { movie: movie.clone(), genre });

        debug!(movie_id = %movie.id, "created movie");
        Ok(movie)
    }

    async fn update(&self, id: &str, patch: MoviePatch) -> Result<Option<Movie>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let mut movies = self.movies.write().await;
        let Some(stored) = movies.iter_mut().find(|m| m.movie.id == id) else {
            return Ok(None);
        };

        stored.movie.apply(&patch);
        debug!(movie_id = %id, columns = patch.changes().len(), "updated movie");
        Ok(Some(stored.movie.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };
        let mut movies = self.movies.write().await;
        let Some(index) = movies.iter().position(|m| m.movie.id == id) else {
            return Ok(false);
        };

        movies.remove(index);
        debug!(movie_id = %id, "deleted movie");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovieField, MovieValue};

    const SEED: &str = include_str!("../../data/movies.json");
    const INCEPTION: &str = "5ad1a235-0d9c-410a-b32b-220d91689a08";

    fn store() -> JsonMovieStore {
        JsonMovieStore::from_json(SEED).unwrap()
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

    #[tokio::test]
    async fn lists_every_seeded_movie() {
        let all = store().get_all(None).await.unwrap();
        assert_eq!(all.len(), 6);
        assert!(all.iter().all(|m| m.genre.is_none()));
    }

    #[tokio::test]
    async fn filters_by_genre_ignoring_case() {
        let listed = store().get_all(Some("sci-fi")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].movie.title, "Inception");
        assert_eq!(listed[0].genre.as_deref(), Some("Sci-Fi"));
    }

    #[tokio::test]
    async fn unknown_genre_lists_nothing() {
        assert!(store().get_all(Some("Western")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_id_handles_malformed_ids() {
        let store = store();
        assert_eq!(store.get_by_id(INCEPTION).await.unwrap().unwrap().title, "Inception");
        assert!(store.get_by_id("inception").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_is_visible_under_its_genre() {
        let store = store();
        let created = store.create(dune(&["drama", "Drama"])).await.unwrap();

        assert_eq!(store.get_by_id(&created.id.to_string()).await.unwrap(), Some(created.clone()));
        let dramas = store.get_all(Some("DRAMA")).await.unwrap();
        assert!(dramas.iter().any(|m| m.movie.id == created.id));
    }

    #[tokio::test]
    async fn create_with_unknown_genre_adds_nothing() {
        let store = store();
        let err = store.create(dune(&["Drama", "Space Opera"])).await.unwrap_err();

        assert!(matches!(err, StoreError::InvalidReference { .. }));
        assert_eq!(store.get_all(None).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn update_changes_only_named_columns() {
        let store = store();
        let before = store.get_by_id(INCEPTION).await.unwrap().unwrap();

        let mut patch = MoviePatch::default();
        patch.set(MovieField::Rate, MovieValue::Float(9.0));
        let after = store.update(INCEPTION, patch).await.unwrap().unwrap();

        assert_eq!(after.rate, 9.0);
        assert_eq!(Movie { rate: before.rate, ..after }, before);
    }

    #[tokio::test]
    async fn delete_is_not_idempotent_success() {
        let store = store();
        assert!(store.delete(INCEPTION).await.unwrap());
        assert!(store.get_by_id(INCEPTION).await.unwrap().is_none());
        assert!(!store.delete(INCEPTION).await.unwrap());
    }
}
