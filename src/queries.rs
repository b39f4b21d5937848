use std::collections::{BTreeSet, HashMap};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Query, SimpleExpr},
};

use crate::{
    entities::{comment, movie, movie_country, movie_genre},
    error::{ApiError, ApiResult},
    models::{CommentDoc, MovieDoc, Page, Pagination},
};

pub const MOVIES_PER_PAGE: u64 = 9;
pub const COMMENTS_PER_PAGE: u64 = 3;

/// 1-based page number to a row offset. Missing or non-positive pages
/// mean "no skip", mirroring the list endpoints' lenient contract.
/// The offset saturates (capped to what SQLite accepts as an integer),
/// so an absurd page number reads past the end instead of overflowing.
fn slice(page: Option<i64>, page_size: u64) -> (u64, u64) {
    match page {
        Some(p) if p > 0 => {
            let skip = (p as u64 - 1).saturating_mul(page_size).min(i64::MAX as u64);
            (skip, p as u64)
        },
        _ => (0, 1),
    }
}

fn page_count(count: u64, page_size: u64) -> u64 {
    count.div_ceil(page_size)
}

/// All movies, most popular first, id ascending as the tie-break so
/// pagination stays stable across pages with equal popularity.
pub async fn list_movies(db: &DatabaseConnection, page: Option<i64>) -> ApiResult<Page<MovieDoc>> {
    let (skip, page_no) = slice(page, MOVIES_PER_PAGE);

    let count = movie::Entity::find().count(db).await?;
    let rows = movie::Entity::find()
        .order_by_desc(movie::Column::Popularity)
        .order_by_asc(movie::Column::Id)
        .offset(skip)
        .limit(MOVIES_PER_PAGE)
        .all(db)
        .await?;

    let data = attach_terms(db, rows).await?;
    Ok(Page {
        data,
        count,
        pagination: Pagination { page: page_no, page_count: page_count(count, MOVIES_PER_PAGE) },
    })
}

pub async fn movie_by_id(db: &DatabaseConnection, id: i32) -> ApiResult<MovieDoc> {
    let movie = movie::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no movie with id {id}")))?;

    let mut docs = attach_terms(db, vec![movie]).await?;
    Ok(docs.remove(0))
}

/// Movies whose genre set contains every requested genre (AND across the
/// request). An empty request matches the whole collection.
pub async fn search_by_genres(
    db: &DatabaseConnection,
    genres: &[String],
    page: Option<i64>,
) -> ApiResult<Page<MovieDoc>> {
    let mut query = movie::Entity::find();
    if let Some(filter) = genre_superset_filter(genres) {
        query = query.filter(filter);
    }

    let count = query.clone().count(db).await?;
    if count == 0 {
        return Err(ApiError::NotFound("no movies contain these genres".to_string()));
    }

    paged_movies(db, query, count, page).await
}

/// Movies produced in any of the requested countries (OR across the
/// request). An empty request matches nothing.
pub async fn search_by_countries(
    db: &DatabaseConnection,
    countries: &[String],
    page: Option<i64>,
) -> ApiResult<Page<MovieDoc>> {
    let query = movie::Entity::find().filter(country_any_filter(countries));

    let count = query.clone().count(db).await?;
    if count == 0 {
        return Err(ApiError::NotFound(
            "no movies were produced in any of these countries".to_string(),
        ));
    }

    paged_movies(db, query, count, page).await
}

/// Case-insensitive title substring search, first page semantics only.
pub async fn search_by_title(db: &DatabaseConnection, search: &str) -> ApiResult<Page<MovieDoc>> {
    let query = movie::Entity::find().filter(movie::Column::Title.contains(search));
    let count = query.clone().count(db).await?;
    paged_movies(db, query, count, None).await
}

pub async fn add_comment(
    db: &DatabaseConnection,
    movie_id: i32,
    text: &str,
) -> ApiResult<CommentDoc> {
    if text.is_empty() {
        return Err(ApiError::InvalidInput("comment text must not be empty".to_string()));
    }

    let movie = movie_by_id(db, movie_id).await?;

    let inserted = comment::ActiveModel {
        movie_id: Set(movie_id),
        text: Set(text.to_string()),
        created_at: Set(now_sec()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(CommentDoc::from_model(inserted, movie))
}

/// Comments for one movie, newest first, each with the movie resolved.
pub async fn list_comments(
    db: &DatabaseConnection,
    movie_id: i32,
    page: Option<i64>,
) -> ApiResult<Page<CommentDoc>> {
    let movie = movie_by_id(db, movie_id).await?;

    let (skip, page_no) = slice(page, COMMENTS_PER_PAGE);

    let count =
        comment::Entity::find().filter(comment::Column::MovieId.eq(movie_id)).count(db).await?;
    let rows = comment::Entity::find()
        .filter(comment::Column::MovieId.eq(movie_id))
        .order_by_desc(comment::Column::CreatedAt)
        .order_by_desc(comment::Column::Id)
        .offset(skip)
        .limit(COMMENTS_PER_PAGE)
        .all(db)
        .await?;

    let data =
        rows.into_iter().map(|c| CommentDoc::from_model(c, movie.clone())).collect::<Vec<_>>();

    Ok(Page {
        data,
        count,
        pagination: Pagination { page: page_no, page_count: page_count(count, COMMENTS_PER_PAGE) },
    })
}

async fn paged_movies(
    db: &DatabaseConnection,
    query: sea_orm::Select<movie::Entity>,
    count: u64,
    page: Option<i64>,
) -> ApiResult<Page<MovieDoc>> {
    let (skip, page_no) = slice(page, MOVIES_PER_PAGE);

    let rows = query
        .order_by_desc(movie::Column::Popularity)
        .order_by_asc(movie::Column::Id)
        .offset(skip)
        .limit(MOVIES_PER_PAGE)
        .all(db)
        .await?;

    let data = attach_terms(db, rows).await?;
    Ok(Page {
        data,
        count,
        pagination: Pagination { page: page_no, page_count: page_count(count, MOVIES_PER_PAGE) },
    })
}

fn genre_superset_filter(genres: &[String]) -> Option<SimpleExpr> {
    // Duplicates in the request would inflate the match count below.
    let genres: BTreeSet<&String> = genres.iter().collect();
    if genres.is_empty() {
        return None;
    }

    let wanted = genres.len() as i64;
    let sub = Query::select()
        .column(movie_genre::Column::MovieId)
        .from(movie_genre::Entity)
        .and_where(movie_genre::Column::Genre.is_in(genres.into_iter().cloned()))
        .group_by_col(movie_genre::Column::MovieId)
        .and_having(Expr::col(movie_genre::Column::Genre).count().eq(wanted))
        .to_owned();

    Some(movie::Column::Id.in_subquery(sub))
}

fn country_any_filter(countries: &[String]) -> SimpleExpr {
    let sub = Query::select()
        .column(movie_country::Column::MovieId)
        .from(movie_country::Entity)
        .and_where(movie_country::Column::Country.is_in(countries.iter().cloned()))
        .to_owned();

    movie::Column::Id.in_subquery(sub)
}

/// Folds the join-table rows for a batch of movies back into per-movie
/// genre and country lists with two queries, not one per movie.
async fn attach_terms(
    db: &DatabaseConnection,
    movies: Vec<movie::Model>,
) -> ApiResult<Vec<MovieDoc>> {
    let ids: Vec<i32> = movies.iter().map(|m| m.id).collect();

    let mut genres: HashMap<i32, Vec<String>> = HashMap::new();
    for row in movie_genre::Entity::find()
        .filter(movie_genre::Column::MovieId.is_in(ids.clone()))
        .order_by_asc(movie_genre::Column::Genre)
        .all(db)
        .await?
    {
        genres.entry(row.movie_id).or_default().push(row.genre);
    }

    let mut countries: HashMap<i32, Vec<String>> = HashMap::new();
    for row in movie_country::Entity::find()
        .filter(movie_country::Column::MovieId.is_in(ids))
        .order_by_asc(movie_country::Column::Country)
        .all(db)
        .await?
    {
        countries.entry(row.movie_id).or_default().push(row.country);
    }

    Ok(movies
        .into_iter()
        .map(|m| {
            let g = genres.remove(&m.id).unwrap_or_default();
            let c = countries.remove(&m.id).unwrap_or_default();
            MovieDoc::from_model(m, g, c)
        })
        .collect())
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
