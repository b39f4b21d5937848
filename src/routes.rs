use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    AppState,
    error::ApiResult,
    models::{CommentDoc, CommentRequest, MovieDoc, Page, PageQuery, TitleSearchRequest},
    queries,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(movie_by_id))
        .route("/movies/{id}/comments", post(add_comment).get(list_comments))
        .route("/search/movies", post(search_by_title))
        .route("/search/movies/by-genres", post(search_by_genres))
        .route("/search/movies/by-countries", post(search_by_countries))
        .with_state(state)
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<MovieDoc>>> {
    Ok(Json(queries::list_movies(&state.db, q.page).await?))
}

pub async fn movie_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MovieDoc>> {
    Ok(Json(queries::movie_by_id(&state.db, id).await?))
}

pub async fn search_by_genres(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
    Json(genres): Json<Vec<String>>,
) -> ApiResult<Json<Page<MovieDoc>>> {
    Ok(Json(queries::search_by_genres(&state.db, &genres, q.page).await?))
}

pub async fn search_by_countries(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
    Json(countries): Json<Vec<String>>,
) -> ApiResult<Json<Page<MovieDoc>>> {
    Ok(Json(queries::search_by_countries(&state.db, &countries, q.page).await?))
}

pub async fn search_by_title(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TitleSearchRequest>,
) -> ApiResult<Json<Page<MovieDoc>>> {
    Ok(Json(queries::search_by_title(&state.db, &req.search).await?))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<CommentDoc>> {
    Ok(Json(queries::add_comment(&state.db, id, &req.text).await?))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<CommentDoc>>> {
    Ok(Json(queries::list_comments(&state.db, id, q.page).await?))
}
