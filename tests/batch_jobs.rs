use std::path::PathBuf;

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use cinelist::{
    db,
    enrich::{backfill_posters, fetch_poster_changes},
    entities::movie,
    export::crawl_discover,
    tmdb::TmdbClient,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};
use serde_json::json;

// Original id 500 plays the broken record in every test.
const BROKEN_ID: i64 = 500;

async fn movie_details(Path(id): Path<i64>) -> Response {
    if id == BROKEN_ID {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    } else {
        Json(json!({ "poster_path": format!("/p{id}.jpg") })).into_response()
    }
}

#[derive(serde::Deserialize)]
struct DiscoverQuery {
    page: u32,
}

async fn discover(Query(q): Query<DiscoverQuery>) -> Response {
    if q.page == 1 {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let results: Vec<_> = (0..q.page + 2)
        .map(|i| {
            json!({
                "id": q.page * 100 + i,
                "title": format!("Movie {i}"),
                "popularity": 1.0,
            })
        })
        .collect();
    Json(json!({ "results": results })).into_response()
}

/// Local stand-in for the TMDB API on an ephemeral port.
async fn spawn_tmdb_mock() -> TmdbClient {
    let app = Router::new()
        .route("/movie/{id}", get(movie_details))
        .route("/discover/movie", get(discover));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TmdbClient::new(
        reqwest::Client::new(),
        "test-token".to_string(),
        format!("http://{addr}"),
        1000,
    )
}

fn temp_db_url(name: &str) -> (PathBuf, String) {
    let path = std::env::temp_dir().join(format!("cinelist-{name}-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}?mode=rwc", path.display());
    (path, url)
}

async fn seed_movie(
    db: &sea_orm::DatabaseConnection,
    original_id: i64,
    title: &str,
    poster: &str,
) {
    movie::ActiveModel {
        original_id: Set(original_id),
        title: Set(title.to_string()),
        popularity: Set(1.0),
        poster_path: Set(Some(poster.to_string())),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

async fn poster_of(db: &sea_orm::DatabaseConnection, original_id: i64) -> Option<String> {
    movie::Entity::find()
        .filter(movie::Column::OriginalId.eq(original_id))
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .poster_path
}

#[tokio::test]
async fn failed_lookup_leaves_the_record_out_without_failing_the_batch() {
    let tmdb = spawn_tmdb_mock().await;

    let movies = vec![
        movie::Model {
            id: 1,
            original_id: 7,
            title: "Fine".to_string(),
            popularity: 1.0,
            poster_path: Some("/old7.jpg".to_string()),
        },
        movie::Model {
            id: 2,
            original_id: BROKEN_ID,
            title: "Broken".to_string(),
            popularity: 1.0,
            poster_path: Some("/old500.jpg".to_string()),
        },
    ];

    let changes = fetch_poster_changes(movies, &tmdb, 4).await;

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].movie_id, 1);
    assert_eq!(changes[0].new.as_deref(), Some("/p7.jpg"));
    assert!(changes[0].is_change());
}

#[tokio::test]
async fn backfill_with_apply_persists_only_successful_lookups() {
    let tmdb = spawn_tmdb_mock().await;
    let (path, url) = temp_db_url("backfill-apply");

    let db = db::connect_and_migrate(&url).await.unwrap();
    seed_movie(&db, 7, "Fine", "/old7.jpg").await;
    seed_movie(&db, BROKEN_ID, "Broken", "/old500.jpg").await;

    let report = backfill_posters(db, &tmdb, 4, true).await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.written, 1);

    let db = Database::connect(&url).await.unwrap();
    assert_eq!(poster_of(&db, 7).await.as_deref(), Some("/p7.jpg"));
    assert_eq!(poster_of(&db, BROKEN_ID).await.as_deref(), Some("/old500.jpg"));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn backfill_dry_run_writes_nothing() {
    let tmdb = spawn_tmdb_mock().await;
    let (path, url) = temp_db_url("backfill-dry");

    let db = db::connect_and_migrate(&url).await.unwrap();
    seed_movie(&db, 7, "Fine", "/old7.jpg").await;

    let report = backfill_posters(db, &tmdb, 4, false).await.unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(report.written, 0);

    let db = Database::connect(&url).await.unwrap();
    assert_eq!(poster_of(&db, 7).await.as_deref(), Some("/old7.jpg"));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn crawl_accumulates_every_page_and_skips_failures() {
    let tmdb = spawn_tmdb_mock().await;

    // pages 0 and 2 answer with 2 and 4 results, page 1 always fails
    let movies = crawl_discover(&tmdb, 2, 4).await;

    assert_eq!(movies.len(), 6);
    let mut ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 200, 201, 202, 203]);
}
