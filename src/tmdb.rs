use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;

/// TMDB client shared by the API and the batch jobs. Every outbound call
/// waits on the limiter first, so one client instance enforces the quota
/// across however many tasks are in flight.
pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

pub fn request_quota(rps: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(rps.max(1)).unwrap())
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, access_token: String, base_url: String, rps: u32) -> Self {
        // Warn once on startup if running against mock data
        if access_token.trim().is_empty() {
            tracing::warn!("Using mock TMDB data - no TMDB_ACCESS_TOKEN provided");
        }

        let limiter = Arc::new(RateLimiter::direct(request_quota(rps)));
        Self { client, access_token, base_url, limiter }
    }

    /// Current poster path for a movie, keyed by its TMDB id.
    pub async fn movie_details(&self, original_id: i64) -> ApiResult<Option<String>> {
        if self.access_token.trim().is_empty() {
            return Ok(Some(format!("/mock-poster-{original_id}.jpg")));
        }

        self.limiter.until_ready().await;

        let url = format!("{}/movie/{}", self.base_url.trim_end_matches('/'), original_id);
        let resp: MovieDetails = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("language", "en-US")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.poster_path)
    }

    /// One page of the discovery feed, most popular first.
    pub async fn discover_page(&self, page: u32) -> ApiResult<Vec<DiscoverMovie>> {
        if self.access_token.trim().is_empty() {
            return Ok(vec![]);
        }

        self.limiter.until_ready().await;

        let url = format!("{}/discover/movie", self.base_url.trim_end_matches('/'));
        let resp: DiscoverResponse = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("language", "en-US"),
                ("sort_by", "popularity.desc"),
                ("include_adult", "false"),
                ("include_video", "false"),
                ("with_watch_monetization_types", "flatrate"),
            ])
            .query(&[("page", page)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.results)
    }
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    results: Vec<DiscoverMovie>,
}

/// The slice of a discovery result the export job keeps.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DiscoverMovie {
    pub id: i64,
    pub title: String,
    pub popularity: f64,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    pub original_language: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use governor::clock::FakeRelativeClock;

    use super::*;

    #[test]
    fn quota_admits_rps_cells_per_second() {
        let clock = FakeRelativeClock::default();
        let limiter = RateLimiter::direct_with_clock(request_quota(15), clock.clone());

        for _ in 0..15 {
            assert!(limiter.check().is_ok());
        }
        assert!(limiter.check().is_err());

        clock.advance(Duration::from_secs(1));
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn quota_never_panics_on_zero_rate() {
        // rps 0 is clamped to 1 rather than feeding NonZeroU32 a zero
        let limiter = RateLimiter::direct(request_quota(0));
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
