use futures::{StreamExt, stream};
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection, EntityTrait};
use tracing::{debug, info, warn};

use crate::{entities::movie, error::ApiResult, tmdb::TmdbClient};

/// One movie's poster refresh, resolved but not yet persisted.
#[derive(Clone, Debug)]
pub struct PosterChange {
    pub movie_id: i32,
    pub title: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl PosterChange {
    pub fn is_change(&self) -> bool {
        self.new != self.old
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BackfillReport {
    pub total: usize,
    pub fetched: usize,
    pub failed: usize,
    pub changed: usize,
    pub written: usize,
}

/// Refreshes every movie's poster path from TMDB. A failed lookup is
/// logged and skipped, never retried, and never fails the run. Writes
/// happen only when `apply` is set; the default pass just reports what
/// would change.
pub async fn backfill_posters(
    db: DatabaseConnection,
    tmdb: &TmdbClient,
    max_concurrent: usize,
    apply: bool,
) -> ApiResult<BackfillReport> {
    let movies = movie::Entity::find().all(&db).await?;
    let total = movies.len();
    info!(total = total, apply = apply, "loaded movie collection");

    // Dry runs do not touch the store again; drop the connection before
    // the fan-out starts.
    let db = if apply {
        Some(db)
    } else {
        db.close().await?;
        None
    };

    let changes = fetch_poster_changes(movies, tmdb, max_concurrent).await;

    let mut report = BackfillReport {
        total,
        fetched: changes.len(),
        failed: total - changes.len(),
        changed: changes.iter().filter(|c| c.is_change()).count(),
        written: 0,
    };

    if let Some(db) = db {
        report.written = apply_poster_changes(&db, &changes).await?;
        db.close().await?;
    }

    info!(
        total = report.total,
        fetched = report.fetched,
        failed = report.failed,
        changed = report.changed,
        written = report.written,
        "poster backfill complete"
    );

    Ok(report)
}

/// One lookup per movie, at most `max_concurrent` in flight, awaited to
/// completion before returning.
pub async fn fetch_poster_changes(
    movies: Vec<movie::Model>,
    tmdb: &TmdbClient,
    max_concurrent: usize,
) -> Vec<PosterChange> {
    let items: Vec<Option<PosterChange>> = stream::iter(movies)
        .map(|movie| async move {
            match tmdb.movie_details(movie.original_id).await {
                Ok(new) => {
                    let change = PosterChange {
                        movie_id: movie.id,
                        title: movie.title,
                        old: movie.poster_path,
                        new,
                    };
                    debug!(
                        movie_id = change.movie_id,
                        title = %change.title,
                        changed = change.is_change(),
                        "poster lookup"
                    );
                    Some(change)
                },
                Err(err) => {
                    warn!(movie_id = movie.id, title = %movie.title, error = %err, "poster lookup failed");
                    None
                },
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    items.into_iter().flatten().collect()
}

pub async fn apply_poster_changes(
    db: &DatabaseConnection,
    changes: &[PosterChange],
) -> ApiResult<usize> {
    let mut written = 0;
    for change in changes.iter().filter(|c| c.is_change()) {
        let model = movie::ActiveModel {
            id: ActiveValue::Unchanged(change.movie_id),
            poster_path: ActiveValue::Set(change.new.clone()),
            ..Default::default()
        };
        model.update(db).await?;
        written += 1;
    }
    Ok(written)
}
