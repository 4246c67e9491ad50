use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{Movie, MovieListing, MoviePatch, NewMovie},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/movies", get(list).post(create))
        .route("/movies/{id}", get(show).patch(update).delete(remove))
        .with_state(state)
}

/// Only origins in the allow-list receive CORS headers.
pub fn cors(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("CORS origin {o}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok", "backend": state.store.backend() }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    genre: Option<String>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<MovieListing>>> {
    let genre = q.genre.as_deref().map(str::trim).filter(|g| !g.is_empty());
    Ok(Json(state.store.get_all(genre).await?))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Movie>> {
    state.store.get_by_id(&id).await?.map(Json).ok_or(AppError::NotFound)
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let Json(body) = body?;
    let input = NewMovie::from_json(&body)?;
    let movie = state.store.create(input).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Movie>> {
    let Json(body) = body?;
    let patch = MoviePatch::from_json(&body)?;
    state.store.update(&id, patch).await?.map(Json).ok_or(AppError::NotFound)
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if state.store.delete(&id).await? { Ok(StatusCode::NO_CONTENT) } else { Err(AppError::NotFound) }
}
