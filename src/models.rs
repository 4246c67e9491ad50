use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entities::movie;

const DEFAULT_RATE: f64 = 5.0;
const MIN_YEAR: i64 = 1900;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub year: i32,
    pub director: String,
    pub duration: i32,
    pub poster: String,
    pub rate: f64,
}

impl Movie {
    pub fn apply(&mut self, patch: &MoviePatch) {
        for (field, value) in patch.changes() {
            match (field, value) {
                (MovieField::Title, MovieValue::Text(v)) => self.title = v.clone(),
                (MovieField::Director, MovieValue::Text(v)) => self.director = v.clone(),
                (MovieField::Poster, MovieValue::Text(v)) => self.poster = v.clone(),
                (MovieField::Year, MovieValue::Int(v)) => self.year = *v,
                (MovieField::Duration, MovieValue::Int(v)) => self.duration = *v,
                (MovieField::Rate, MovieValue::Float(v)) => self.rate = *v,
                _ => {},
            }
        }
    }
}

impl From<movie::Model> for Movie {
    fn from(m: movie::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            year: m.year,
            director: m.director,
            duration: m.duration,
            poster: m.poster,
            rate: m.rate,
        }
    }
}

/// A row of `get_all`. `genre` is only set when the listing was filtered by genre.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieListing {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub director: String,
    pub duration: i32,
    pub poster: String,
    pub rate: f64,
    pub genre: Vec<String>,
}

impl NewMovie {
    pub fn from_json(body: &Value) -> Result<Self, Vec<FieldError>> {
        let Some(obj) = body.as_object() else {
            return Err(vec![FieldError::new("", "expected a JSON object")]);
        };

        let mut errors = Vec::new();
        let title = required(obj, MovieField::Title, &mut errors).and_then(MovieValue::into_text);
        let year = required(obj, MovieField::Year, &mut errors).and_then(MovieValue::into_int);
        let director =
            required(obj, MovieField::Director, &mut errors).and_then(MovieValue::into_text);
        let duration =
            required(obj, MovieField::Duration, &mut errors).and_then(MovieValue::into_int);
        let poster = required(obj, MovieField::Poster, &mut errors).and_then(MovieValue::into_text);
        let rate = match obj.get(MovieField::Rate.as_str()) {
            None => Some(DEFAULT_RATE),
            Some(v) => match MovieField::Rate.validate(v) {
                Ok(v) => v.into_float(),
                Err(message) => {
                    errors.push(FieldError::new(MovieField::Rate.as_str(), message));
                    None
                },
            },
        };
        let genre = match obj.get("genre") {
            None => {
                errors.push(FieldError::new("genre", "genre is required"));
                None
            },
            Some(v) => match validate_genres(v) {
                Ok(genres) => Some(genres),
                Err(message) => {
                    errors.push(FieldError::new("genre", message));
                    None
                },
            },
        };

        match (title, year, director, duration, poster, rate, genre) {
            (
                Some(title),
                Some(year),
                Some(director),
                Some(duration),
                Some(poster),
                Some(rate),
                Some(genre),
            ) if errors.is_empty() => {
                Ok(Self { title, year, director, duration, poster, rate, genre })
            },
            _ => Err(errors),
        }
    }
}

/// The closed set of movie columns a caller may write. `id` is not part of it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MovieField {
    Title,
    Year,
    Director,
    Duration,
    Poster,
    Rate,
}

impl MovieField {
    pub const ALL: [MovieField; 6] = [
        MovieField::Title,
        MovieField::Year,
        MovieField::Director,
        MovieField::Duration,
        MovieField::Poster,
        MovieField::Rate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MovieField::Title => "title",
            MovieField::Year => "year",
            MovieField::Director => "director",
            MovieField::Duration => "duration",
            MovieField::Poster => "poster",
            MovieField::Rate => "rate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    fn validate(self, value: &Value) -> Result<MovieValue, String> {
        match self {
            MovieField::Title | MovieField::Director => match value.as_str().map(str::trim) {
                Some(s) if !s.is_empty() => Ok(MovieValue::Text(s.to_string())),
                _ => Err(format!("{} must be a non-empty string", self.as_str())),
            },
            MovieField::Poster => match value.as_str().map(str::trim) {
                Some(s) if is_http_url(s) => Ok(MovieValue::Text(s.to_string())),
                _ => Err("poster must be a valid http(s) URL".to_string()),
            },
            MovieField::Year => {
                let max = i64::from(current_year());
                match value.as_i64() {
                    Some(y) if (MIN_YEAR..=max).contains(&y) => Ok(MovieValue::Int(y as i32)),
                    _ => Err(format!("year must be an integer between {MIN_YEAR} and {max}")),
                }
            },
            MovieField::Duration => match value.as_i64().map(i32::try_from) {
                Some(Ok(d)) if d > 0 => Ok(MovieValue::Int(d)),
                _ => Err("duration must be a positive integer".to_string()),
            },
            MovieField::Rate => match value.as_f64() {
                Some(r) if (0.0..=10.0).contains(&r) => Ok(MovieValue::Float(r)),
                _ => Err("rate must be a number between 0 and 10".to_string()),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MovieValue {
    Text(String),
    Int(i32),
    Float(f64),
}

impl MovieValue {
    fn into_text(self) -> Option<String> {
        match self {
            MovieValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn into_int(self) -> Option<i32> {
        match self {
            MovieValue::Int(i) => Some(i),
            _ => None,
        }
    }

    fn into_float(self) -> Option<f64> {
        match self {
            MovieValue::Float(f) => Some(f),
            _ => None,
        }
    }
}

/// Partial update of a movie's own columns.
///
/// Each change keeps its column and value together, so the order callers
/// supply them in never matters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoviePatch {
    changes: Vec<(MovieField, MovieValue)>,
}

impl MoviePatch {
    pub fn from_json(body: &Value) -> Result<Self, Vec<FieldError>> {
        let Some(obj) = body.as_object() else {
            return Err(vec![FieldError::new("", "expected a JSON object")]);
        };

        let mut patch = Self::default();
        let mut errors = Vec::new();
        for (name, value) in obj {
            let Some(field) = MovieField::from_name(name) else {
                let message = match name.as_str() {
                    "id" => "id cannot be changed",
                    "genre" => "genres cannot be changed after creation",
                    _ => "unknown movie field",
                };
                errors.push(FieldError::new(name, message));
                continue;
            };
            match field.validate(value) {
                Ok(value) => patch.set(field, value),
                Err(message) => errors.push(FieldError::new(name, message)),
            }
        }

        if errors.is_empty() { Ok(patch) } else { Err(errors) }
    }

    pub fn set(&mut self, field: MovieField, value: MovieValue) {
        match self.changes.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.changes.push((field, value)),
        }
    }

    pub fn changes(&self) -> &[(MovieField, MovieValue)] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

fn required(
    obj: &Map<String, Value>,
    field: MovieField,
    errors: &mut Vec<FieldError>,
) -> Option<MovieValue> {
    let Some(value) = obj.get(field.as_str()) else {
        errors.push(FieldError::new(field.as_str(), format!("{} is required", field.as_str())));
        return None;
    };
    match field.validate(value) {
        Ok(v) => Some(v),
        Err(message) => {
            errors.push(FieldError::new(field.as_str(), message));
            None
        },
    }
}

fn validate_genres(value: &Value) -> Result<Vec<String>, String> {
    const MESSAGE: &str = "genre must be a non-empty array of genre names";

    let items = value.as_array().filter(|a| !a.is_empty()).ok_or(MESSAGE)?;
    items
        .iter()
        .map(|g| match g.as_str().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(MESSAGE.to_string()),
        })
        .collect()
}

/// Calendar year in UTC, independent of the host time zone.
fn current_year() -> i16 {
    jiff::Timestamp::now().to_zoned(jiff::tz::TimeZone::UTC).year()
}

fn is_http_url(s: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| s.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty() && !rest.contains(' ')))
}
