pub mod config;
pub mod db;
pub mod entities;
pub mod enrich;
pub mod error;
pub mod export;
pub mod models;
pub mod queries;
pub mod routes;
pub mod tmdb;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
}
