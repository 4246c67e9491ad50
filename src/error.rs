use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::FieldError;

/// Failures raised by a [`MovieStore`](crate::store::MovieStore).
///
/// Missing movies and unparsable identifiers are not errors; they come back
/// as `None` / `false`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("genre '{genre}' does not exist")]
    InvalidReference { genre: String },

    #[error("error {op} the film")]
    Write {
        op: &'static str,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("error reading the catalog")]
    Read(#[from] sea_orm::DbErr),
}

impl StoreError {
    pub fn write(op: &'static str) -> impl FnOnce(sea_orm::DbErr) -> Self {
        move |source| StoreError::Write { op, source }
    }
}

#[derive(Debug)]
pub enum AppError {
    NotFound,
    Validation(Vec<FieldError>),
    Store(StoreError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound => f.write_str("Movie not found"),
            AppError::Validation(errors) => write!(f, "{} invalid field(s)", errors.len()),
            AppError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<Vec<FieldError>> for AppError {
    fn from(errors: Vec<FieldError>) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(vec![FieldError::new("", rejection.body_text())])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": "Movie not found" })))
                    .into_response()
            },
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": errors }))).into_response()
            },
            AppError::Store(StoreError::InvalidReference { genre }) => {
                let detail = FieldError::new("genre", format!("genre '{genre}' does not exist"));
                (StatusCode::BAD_REQUEST, Json(json!({ "error": [detail] }))).into_response()
            },
            AppError::Store(err) => internal(anyhow::Error::new(err)),
        }
    }
}

fn internal(err: anyhow::Error) -> Response {
    tracing::error!(error = ?err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": err.to_string() })))
        .into_response()
}

pub type AppResult<T> = Result<T, AppError>;
