use std::time::Duration;

use cinelist::{config::Config, db, enrich, tmdb::TmdbClient};

/// Refreshes every movie's poster path from TMDB. Dry-run by default;
/// pass --apply to write the fetched paths back to the store.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinelist=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;
    let apply = std::env::args().any(|arg| arg == "--apply");

    let http = reqwest::Client::builder()
        .user_agent("cinelist/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let tmdb = TmdbClient::new(
        http,
        config.tmdb_access_token.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_rps,
    );

    let db = db::connect_and_migrate(&config.database_url).await?;
    tracing::info!("connected");

    let report = enrich::backfill_posters(db, &tmdb, config.max_concurrent, apply).await?;

    if !apply && report.changed > 0 {
        tracing::info!(changed = report.changed, "dry run; re-run with --apply to persist");
    }

    Ok(())
}
