use super::store::{ActivityError, ActivitySource, RatingStore, StoreError};
use crate::model::structures::{
    activity::WeeklyActivity, rating::Rating, week_window::WeekWindow, weekly_score::WeeklyScore
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Mutex, MutexGuard}
};
use uuid::Uuid;

#[derive(Default)]
struct State {
    ratings: HashMap<Uuid, Rating>,
    weekly_scores: BTreeMap<(Uuid, NaiveDate), WeeklyScore>,
    activity: HashMap<Uuid, WeeklyActivity>,
    unavailable: HashSet<Uuid>,
    failing_rating_saves: u32,
    conflicting_rating_saves: u32,
    failing_score_saves: u32,
    rating_writes: u32
}

/// Process-local [`RatingStore`] and [`ActivitySource`].
///
/// Used by tests. The fault hooks make the next N writes fail
/// so retry paths can be exercised deterministically.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn guard(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the activity returned for `user_id`. Records are filtered to
    /// the requested window when fetched.
    pub fn set_activity(&self, user_id: Uuid, activity: WeeklyActivity) {
        let mut state = self.guard();
        state.unavailable.remove(&user_id);
        state.activity.insert(user_id, activity);
    }

    pub fn set_activity_unavailable(&self, user_id: Uuid) {
        self.guard().unavailable.insert(user_id);
    }

    pub fn insert_rating(&self, rating: Rating) {
        self.guard().ratings.insert(rating.user_id(), rating);
    }

    pub fn fail_next_rating_saves(&self, n: u32) {
        self.guard().failing_rating_saves = n;
    }

    /// Simulates another writer updating the rating between read and write.
    pub fn conflict_next_rating_saves(&self, n: u32) {
        self.guard().conflicting_rating_saves = n;
    }

    pub fn fail_next_score_saves(&self, n: u32) {
        self.guard().failing_score_saves = n;
    }

    pub fn weekly_score_count(&self) -> usize {
        self.guard().weekly_scores.len()
    }

    /// Number of successful rating saves, excluding default-row creation.
    pub fn rating_writes(&self) -> u32 {
        self.guard().rating_writes
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn get_rating(&self, user_id: Uuid) -> Result<Option<Rating>, StoreError> {
        Ok(self.state()?.ratings.get(&user_id).cloned())
    }

    async fn create_rating_if_absent(&self, rating: &Rating) -> Result<Rating, StoreError> {
        let mut state = self.state()?;

        Ok(state
            .ratings
            .entry(rating.user_id())
            .or_insert_with(|| rating.clone())
            .clone())
    }

    async fn save_rating(&self, rating: &Rating, expected_updated_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state()?;

        if state.failing_rating_saves > 0 {
            state.failing_rating_saves -= 1;
            return Err(StoreError::Unavailable("injected rating save failure".to_string()));
        }

        if state.conflicting_rating_saves > 0 {
            state.conflicting_rating_saves -= 1;
            if let Some(stored) = state.ratings.get(&rating.user_id()).cloned() {
                // Another writer touched the row without changing its values
                let touched = Rating::new(
                    stored.user_id(),
                    stored.mmr(),
                    stored.lp(),
                    stored.scored_week(),
                    stored.updated_at() + chrono::Duration::milliseconds(1)
                );
                state.ratings.insert(stored.user_id(), touched);
            }
            return Err(StoreError::Conflict(rating.user_id()));
        }

        match state.ratings.get(&rating.user_id()) {
            Some(stored) if stored.updated_at() == expected_updated_at => {
                state.ratings.insert(rating.user_id(), rating.clone());
                state.rating_writes += 1;
                Ok(())
            }
            _ => Err(StoreError::Conflict(rating.user_id()))
        }
    }

    async fn get_weekly_score(&self, user_id: Uuid, week_start: NaiveDate) -> Result<Option<WeeklyScore>, StoreError> {
        Ok(self.state()?.weekly_scores.get(&(user_id, week_start)).cloned())
    }

    async fn upsert_weekly_score(&self, score: &WeeklyScore) -> Result<WeeklyScore, StoreError> {
        let mut state = self.state()?;

        if state.failing_score_saves > 0 {
            state.failing_score_saves -= 1;
            return Err(StoreError::Unavailable("injected weekly score save failure".to_string()));
        }

        let stored = match state.weekly_scores.get(&(score.user_id, score.week_start)) {
            Some(existing) => WeeklyScore {
                id: existing.id,
                created_at: existing.created_at,
                ..score.clone()
            },
            None => score.clone()
        };

        state
            .weekly_scores
            .insert((score.user_id, score.week_start), stored.clone());
        Ok(stored)
    }

    async fn recent_weekly_scores(&self, user_id: Uuid, limit: i64) -> Result<Vec<WeeklyScore>, StoreError> {
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(self
            .state()?
            .weekly_scores
            .range((user_id, NaiveDate::MIN)..=(user_id, NaiveDate::MAX))
            .rev()
            .take(limit)
            .map(|(_, score)| score.clone())
            .collect())
    }

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let state = self.state()?;
        let mut ids = state
            .ratings
            .keys()
            .chain(state.activity.keys())
            .copied()
            .collect::<Vec<_>>();

        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl ActivitySource for MemoryStore {
    async fn fetch_activity(&self, user_id: Uuid, window: &WeekWindow) -> Result<WeeklyActivity, ActivityError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ActivityError::Unavailable("memory store lock poisoned".to_string()))?;

        if state.unavailable.contains(&user_id) {
            return Err(ActivityError::Unavailable(format!("no health data access for user {}", user_id)));
        }

        let Some(activity) = state.activity.get(&user_id) else {
            return Ok(WeeklyActivity::default());
        };

        Ok(WeeklyActivity {
            workouts: activity
                .workouts
                .iter()
                .filter(|w| window.contains(w.start_time))
                .cloned()
                .collect(),
            sleep: activity
                .sleep
                .iter()
                .filter(|s| window.contains(s.start_time) && s.stage.is_asleep())
                .cloned()
                .collect()
        })
    }
}
