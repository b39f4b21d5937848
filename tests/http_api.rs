use std::sync::Arc;

use cinelist::{AppState, config::Config, routes};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, Set};
use serde_json::{Value, json};

fn test_config() -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        tmdb_access_token: "".to_string(),
        tmdb_base_url: "".to_string(),
        tmdb_rps: 15,
        max_concurrent: 4,
        max_discover_page: 0,
    }
}

/// Serves the API over a real socket against an in-memory store and
/// returns its base URL plus the id of one seeded movie.
async fn spawn_api() -> (String, i32) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let movie = cinelist::entities::movie::ActiveModel {
        original_id: Set(550),
        title: Set("Fight Club".to_string()),
        popularity: Set(9.0),
        poster_path: Set(None),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let state = Arc::new(AppState { config: Arc::new(test_config()), db });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), movie.id)
}

#[tokio::test]
async fn comment_creation_answers_with_plain_200() {
    let (base, movie_id) = spawn_api().await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{base}/movies/{movie_id}/comments"))
        .json(&json!({ "text": "great movie" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["text"], "great movie");
    assert_eq!(body["movie"]["id"], movie_id);
}

#[tokio::test]
async fn error_kinds_map_to_distinct_status_codes() {
    let (base, movie_id) = spawn_api().await;
    let http = reqwest::Client::new();

    let resp = http.get(format!("{base}/movies/{}", movie_id + 99)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = http
        .post(format!("{base}/movies/{movie_id}/comments"))
        .json(&json!({ "text": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn list_movies_answers_with_the_page_envelope() {
    let (base, movie_id) = spawn_api().await;
    let http = reqwest::Client::new();

    let resp = http.get(format!("{base}/movies")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], movie_id);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["pageCount"], 1);
}
