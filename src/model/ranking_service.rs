use crate::{
    database::store::{ActivityError, ActivitySource, RatingStore, StoreError},
    model::{
        constants::MAX_CONFLICT_RETRIES,
        rating_engine, score_calculator,
        structures::{rating::Rating, week_window::WeekWindow, weekly_score::WeeklyScore}
    },
    utils::progress_utils::progress_style
};
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex}
};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Activity unavailable: {0}")]
    ActivityUnavailable(#[source] ActivityError),

    #[error("Persistence error: {0}")]
    Persistence(#[source] StoreError),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Week starting {week} predates the last scored week {scored_week}")]
    StaleWeek { week: NaiveDate, scored_week: NaiveDate },

    /// The source returned no records, so the week is left unscored
    #[error("No activity recorded for the week starting {week}")]
    NoActivity { week: NaiveDate }
}

impl From<StoreError> for RankingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvariantViolation(reason) => RankingError::InvariantViolation(reason),
            other => RankingError::Persistence(other)
        }
    }
}

/// A failed refresh together with the rating the caller can keep displaying.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct RefreshFailure {
    pub last_known: Option<Rating>,
    pub source: RankingError
}

impl RefreshFailure {
    /// Nothing was wrong, there was simply nothing to score.
    pub fn is_skipped(&self) -> bool {
        matches!(self.source, RankingError::NoActivity { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    /// First score stored for the week
    Created,
    /// Score or rating rewritten
    Updated,
    /// Nothing changed since the last refresh; no writes
    Unchanged
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRefresh {
    pub weekly_score: WeeklyScore,
    pub rating: Rating,
    /// Change relative to the week's baseline
    pub lp_delta: i32,
    pub mmr_delta: i32,
    pub status: RefreshStatus
}

/// Runs the weekly pipeline against a rating store and an activity source.
///
/// Refreshes for the same user are serialized in-process; writes from other
/// processes are detected by the store's optimistic check and retried. A
/// user's lock is dropped from the map once no refresh holds or awaits it.
pub struct RankingService<S, A> {
    store: Arc<S>,
    activity: Arc<A>,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>
}

impl<S: RatingStore, A: ActivitySource> RankingService<S, A> {
    pub fn new(store: Arc<S>, activity: Arc<A>) -> RankingService<S, A> {
        RankingService {
            store,
            activity,
            locks: Mutex::new(HashMap::new())
        }
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        Arc::clone(locks.entry(user_id).or_default())
    }

    fn release_lock(&self, user_id: Uuid, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Clones are taken and dropped only under the map lock, so the map and
        // `lock` holding the last two references means nobody else is waiting
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&user_id);
        }
        drop(lock);
    }

    /// # Weekly refresh
    ///
    /// Scores `window` for `user_id` and applies the result to the rating:
    ///
    /// 1. Load the rating, creating the default row for new users
    /// 2. Fetch the week's activity and compute its components, stopping
    ///    without writes if the source fails or returns nothing
    /// 3. Upsert the weekly score with its baseline
    /// 4. Apply the score to the baseline and save the rating
    ///
    /// Refreshing a week again recomputes from the same baseline, so LP and
    /// MMR never compound. Conflicting writes are retried a bounded number
    /// of times; any other failure is returned with the last known rating.
    pub async fn refresh_week(&self, user_id: Uuid, window: &WeekWindow) -> Result<WeeklyRefresh, RefreshFailure> {
        let lock = self.user_lock(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.refresh_with_retries(user_id, window).await
        };
        self.release_lock(user_id, lock);

        result
    }

    async fn refresh_with_retries(&self, user_id: Uuid, window: &WeekWindow) -> Result<WeeklyRefresh, RefreshFailure> {
        let mut last_known = None;
        let mut attempt = 0;
        loop {
            match self.refresh_once(user_id, window, &mut last_known).await {
                Err(RankingError::Persistence(StoreError::Conflict(_))) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    warn!(
                        "Rating of user {} changed concurrently, retrying ({}/{})",
                        user_id, attempt, MAX_CONFLICT_RETRIES
                    );
                }
                Err(source @ RankingError::NoActivity { .. }) => {
                    info!("User {} has no activity for week {}, skipping", user_id, window.start());
                    return Err(RefreshFailure { last_known, source });
                }
                Err(source) => {
                    warn!("Refresh of user {} for week {} failed: {}", user_id, window.start(), source);
                    return Err(RefreshFailure { last_known, source });
                }
                Ok(refresh) => return Ok(refresh)
            }
        }
    }

    async fn refresh_once(
        &self,
        user_id: Uuid,
        window: &WeekWindow,
        last_known: &mut Option<Rating>
    ) -> Result<WeeklyRefresh, RankingError> {
        let week = window.start();
        let now = Utc::now();

        let rating = match self.store.get_rating(user_id).await? {
            Some(rating) => rating,
            None => self.store.create_rating_if_absent(&Rating::initial(user_id, now)).await?
        };
        *last_known = Some(rating.clone());

        if let Some(scored_week) = rating.scored_week() {
            if week < scored_week {
                return Err(RankingError::StaleWeek { week, scored_week });
            }
        }

        let activity = self
            .activity
            .fetch_activity(user_id, window)
            .await
            .map_err(RankingError::ActivityUnavailable)?;
        if activity.is_empty() {
            return Err(RankingError::NoActivity { week });
        }
        let components = score_calculator::calculate(&activity, window);

        let existing = self.store.get_weekly_score(user_id, week).await?;
        let applied = rating.scored_week() == Some(week);

        let baseline = match (&existing, applied) {
            (Some(stored), true) => stored.baseline,
            (None, true) => {
                return Err(RankingError::InvariantViolation(format!(
                    "rating of user {} reflects week {} but no score is stored for it",
                    user_id, week
                )))
            }
            (_, false) => rating.baseline()
        };

        if let Some(stored) = existing.as_ref().filter(|s| applied && s.components == components) {
            let change = rating_engine::evaluate(user_id, baseline, stored.score(), Some(week), now);
            debug!("Week {} of user {} is unchanged", week, user_id);

            return Ok(WeeklyRefresh {
                weekly_score: stored.clone(),
                rating,
                lp_delta: change.lp_delta,
                mmr_delta: change.mmr_delta,
                status: RefreshStatus::Unchanged
            });
        }

        let weekly_score = self
            .store
            .upsert_weekly_score(&WeeklyScore::new(user_id, week, components, baseline, now))
            .await?;

        let change = rating_engine::evaluate(
            user_id,
            baseline,
            weekly_score.score(),
            Some(week),
            next_update_time(now, rating.updated_at())
        );
        self.store.save_rating(&change.rating, rating.updated_at()).await?;

        info!(
            "User {} week {}: score {}, LP {} -> {} ({:+}), {} {}",
            user_id,
            week,
            weekly_score.score(),
            baseline.lp,
            change.rating.lp(),
            change.lp_delta,
            change.rating.rank(),
            change
                .rating
                .division()
                .map(|d| d.to_string())
                .unwrap_or_default()
        );

        Ok(WeeklyRefresh {
            weekly_score,
            rating: change.rating,
            lp_delta: change.lp_delta,
            mmr_delta: change.mmr_delta,
            status: match existing {
                Some(_) => RefreshStatus::Updated,
                None => RefreshStatus::Created
            }
        })
    }

    /// Refreshes `window` for every user in `user_ids`, at most `concurrency`
    /// at a time. Results are returned in completion order.
    pub async fn refresh_many(
        &self,
        user_ids: &[Uuid],
        window: &WeekWindow,
        concurrency: usize
    ) -> Vec<(Uuid, Result<WeeklyRefresh, RefreshFailure>)> {
        let span = info_span!("refresh", week = %window.start());
        span.pb_set_style(&progress_style());
        span.pb_set_length(user_ids.len() as u64);

        stream::iter(user_ids.iter().copied())
            .map(|user_id| {
                let span = span.clone();
                async move {
                    let result = self.refresh_week(user_id, window).await;
                    span.pb_inc(1);
                    (user_id, result)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect::<Vec<_>>()
            .instrument(span.clone())
            .await
    }

    pub async fn current_rating(&self, user_id: Uuid) -> Result<Option<Rating>, RankingError> {
        Ok(self.store.get_rating(user_id).await?)
    }

    /// Up to `limit` stored weeks, newest first.
    pub async fn recent_scores(&self, user_id: Uuid, limit: i64) -> Result<Vec<WeeklyScore>, RankingError> {
        Ok(self.store.recent_weekly_scores(user_id, limit).await?)
    }
}

/// The stored `updated_at` must move strictly forward even if the clock
/// does not, otherwise the optimistic check could accept a stale writer.
fn next_update_time(now: DateTime<Utc>, previous: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(6).max(previous + Duration::microseconds(1))
}
