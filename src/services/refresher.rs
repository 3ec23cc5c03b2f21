use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::cache::{CacheError, CacheKey, CacheManager};
use super::postgres::{PostgresClient, PostgresError};
use crate::core::Matcher;
use crate::models::RefreshCursor;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Database(#[from] PostgresError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result of one refresh pass
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RefreshReport {
    pub users_processed: usize,
    pub scores_updated: usize,
    pub failures: usize,
}

/// Name under which the refresher's cursor is persisted
pub const REFRESH_CURSOR_NAME: &str = "match_scores";

/// Recomputes cached compatibility after profiles change.
///
/// Each tick picks up users changed after the stored cursor, drops their
/// cached discovery pages and rescored pairs, and rewrites the stored score
/// of each of their active matches. The cursor lives in Postgres and is
/// ordered by `(updated_at, id)`, so restarts and timestamp ties lose nothing.
pub struct ScoreRefresher {
    db: Arc<PostgresClient>,
    cache: Arc<CacheManager>,
    matcher: Matcher,
    max_distance_km: f64,
    interval: Duration,
    batch_size: i64,
}

impl ScoreRefresher {
    pub fn new(
        db: Arc<PostgresClient>,
        cache: Arc<CacheManager>,
        matcher: Matcher,
        max_distance_km: f64,
        interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            db,
            cache,
            matcher,
            max_distance_km,
            interval,
            batch_size,
        }
    }

    /// Run until `shutdown` flips to true
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut cursor: Option<RefreshCursor> = None;

        tracing::info!("Score refresher started (interval {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(&mut cursor).await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Score refresher stopped");
    }

    async fn tick(&self, cursor: &mut Option<RefreshCursor>) {
        let current = match *cursor {
            Some(current) => current,
            None => match self.initial_cursor().await {
                Ok(loaded) => loaded,
                Err(e) => {
                    tracing::error!("Could not load refresh cursor: {}", e);
                    return;
                }
            },
        };

        match self.refresh_once(current).await {
            Ok((report, next)) => {
                if next != current {
                    if let Err(e) = self.db.save_refresh_cursor(REFRESH_CURSOR_NAME, &next).await {
                        tracing::warn!("Could not persist refresh cursor: {}", e);
                    }
                }
                *cursor = Some(next);

                if report.users_processed > 0 {
                    tracing::info!(
                        "Refreshed {} users, {} match scores updated, {} failures",
                        report.users_processed,
                        report.scores_updated,
                        report.failures
                    );
                }
            }
            Err(e) => {
                *cursor = Some(current);
                tracing::error!("Score refresh failed: {}", e);
            }
        }
    }

    /// Stored cursor, or the database's current time on first start
    pub async fn initial_cursor(&self) -> Result<RefreshCursor, RefreshError> {
        if let Some(stored) = self.db.load_refresh_cursor(REFRESH_CURSOR_NAME).await? {
            return Ok(stored);
        }
        let now = self.db.database_now().await?;
        Ok(RefreshCursor::starting_at(now))
    }

    /// One pass over at most `batch_size` users after `cursor`.
    ///
    /// Returns the report and the cursor for the next pass; persisting it is
    /// left to the caller. A failing user is logged and skipped and is not
    /// retried until it changes again.
    pub async fn refresh_once(
        &self,
        cursor: RefreshCursor,
    ) -> Result<(RefreshReport, RefreshCursor), RefreshError> {
        let changed = self.db.users_changed_after(&cursor, self.batch_size).await?;

        let mut report = RefreshReport::default();
        let mut next = cursor;

        for position in changed {
            next = position;
            report.users_processed += 1;

            match self.refresh_user(position.user_id).await {
                Ok(updated) => report.scores_updated += updated,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("Refresh failed for user {}: {}", position.user_id, e);
                }
            }
        }

        Ok((report, next))
    }

    async fn refresh_user(&self, user_id: Uuid) -> Result<usize, RefreshError> {
        self.cache.invalidate_user(user_id).await?;

        let user = match self.db.find_user(user_id).await? {
            Some(user) => user,
            None => return Ok(0),
        };

        let matches = self.db.active_matches_for(user_id).await?;
        let partner_ids: Vec<Uuid> = matches.iter().map(|m| m.partner_of(user_id)).collect();
        let partners = self.db.find_users_by_ids(&partner_ids).await?;

        let mut updated = 0;
        for record in &matches {
            let partner_id = record.partner_of(user_id);
            let Some(partner) = partners.iter().find(|p| p.id == partner_id) else {
                continue;
            };

            let compatibility = self.matcher.score_pair(&user, partner, self.max_distance_km);
            self.cache
                .store(&CacheKey::compatibility(user_id, partner_id), &compatibility)
                .await;

            if (compatibility.score - record.compatibility_score).abs() > 0.01 {
                self.db.update_match_score(record.id, compatibility.score).await?;
                updated += 1;
            }
        }

        Ok(updated)
    }
}
