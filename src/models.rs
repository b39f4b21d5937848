use serde::{Deserialize, Serialize};

use crate::entities::{comment, movie};

/// A movie as the API serves it, with its genre and production-country
/// sets folded back in from the join tables.
#[derive(Clone, Debug, Serialize)]
pub struct MovieDoc {
    pub id: i32,
    pub original_id: i64,
    pub title: String,
    pub popularity: f64,
    pub poster_path: Option<String>,
    pub genres: Vec<String>,
    pub production_countries: Vec<String>,
}

impl MovieDoc {
    pub fn from_model(movie: movie::Model, genres: Vec<String>, countries: Vec<String>) -> Self {
        Self {
            id: movie.id,
            original_id: movie.original_id,
            title: movie.title,
            popularity: movie.popularity,
            poster_path: movie.poster_path,
            genres,
            production_countries: countries,
        }
    }
}

/// A comment with its movie relation resolved.
#[derive(Clone, Debug, Serialize)]
pub struct CommentDoc {
    pub id: i32,
    pub text: String,
    pub created_at: i64,
    pub movie: MovieDoc,
}

impl CommentDoc {
    pub fn from_model(comment: comment::Model, movie: MovieDoc) -> Self {
        Self { id: comment.id, text: comment.text, created_at: comment.created_at, movie }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Pagination {
    pub page: u64,
    #[serde(rename = "pageCount")]
    pub page_count: u64,
}

/// One slice of an ordered result set plus its pagination metadata.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: u64,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleSearchRequest {
    pub search: String,
}
