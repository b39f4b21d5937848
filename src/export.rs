use futures::{StreamExt, stream};
use tracing::{debug, info, warn};

use crate::tmdb::{DiscoverMovie, TmdbClient};

/// Pulls discovery pages `0..=max_page` and concatenates their results.
/// Admission to the network is paced by the client's limiter; pages run
/// concurrently once admitted, so the accumulator holds completion
/// order, not page order. A failed page is logged and contributes
/// nothing.
pub async fn crawl_discover(
    tmdb: &TmdbClient,
    max_page: u32,
    max_concurrent: usize,
) -> Vec<DiscoverMovie> {
    let pages: Vec<Vec<DiscoverMovie>> = stream::iter(0..=max_page)
        .map(|page| async move {
            match tmdb.discover_page(page).await {
                Ok(results) => {
                    debug!(page = page, results = results.len(), "fetched discover page");
                    results
                },
                Err(err) => {
                    warn!(page = page, error = %err, "discover page failed");
                    vec![]
                },
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let all: Vec<DiscoverMovie> = pages.into_iter().flatten().collect();
    info!(movies = all.len(), pages = u64::from(max_page) + 1, "discover crawl complete");
    all
}
