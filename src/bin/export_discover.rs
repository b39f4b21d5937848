use std::{io::BufWriter, path::PathBuf, time::Duration};

use cinelist::{config::Config, export, tmdb::TmdbClient};

/// Crawls the TMDB discovery feed page by page and accumulates every
/// result. Pass --out <path> to write the combined list as JSON;
/// without it the list is counted and discarded.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinelist=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let mut out: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--out" {
            out = args.next().map(PathBuf::from);
        }
    }

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

    let movies =
        export::crawl_discover(&tmdb, config.max_discover_page, config.max_concurrent).await;

    match out {
        Some(path) => {
            let file = std::fs::File::create(&path)?;
            serde_json::to_writer(BufWriter::new(file), &movies)?;
            tracing::info!(path = %path.display(), movies = movies.len(), "wrote export");
        },
        None => {
            tracing::info!(movies = movies.len(), "no --out given, discarding results");
        },
    }

    Ok(())
}
