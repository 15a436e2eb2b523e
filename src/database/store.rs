use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::structures::{
    activity::WeeklyActivity, rating::Rating, week_window::WeekWindow, weekly_score::WeeklyScore
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Rating for user {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("Invalid stored row: {0}")]
    InvariantViolation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String)
}

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Activity source unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Invalid activity record: {0}")]
    InvalidRecord(String)
}

/// Persistence for ratings and weekly scores.
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn get_rating(&self, user_id: Uuid) -> Result<Option<Rating>, StoreError>;

    /// Inserts `rating` unless the user already has one, and returns
    /// whichever row is stored afterwards.
    async fn create_rating_if_absent(&self, rating: &Rating) -> Result<Rating, StoreError>;

    /// Overwrites the user's rating if it still carries `expected_updated_at`.
    /// Fails with [`StoreError::Conflict`] otherwise.
    async fn save_rating(&self, rating: &Rating, expected_updated_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn get_weekly_score(&self, user_id: Uuid, week_start: NaiveDate) -> Result<Option<WeeklyScore>, StoreError>;

    /// Inserts or overwrites the score and baseline for `(user_id, week_start)`.
    /// An existing row keeps its id and creation time. Returns the stored row.
    async fn upsert_weekly_score(&self, score: &WeeklyScore) -> Result<WeeklyScore, StoreError>;

    /// Most recent weeks first.
    async fn recent_weekly_scores(&self, user_id: Uuid, limit: i64) -> Result<Vec<WeeklyScore>, StoreError>;

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, StoreError>;
}

/// Read-only access to recorded workouts and sleep.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Records starting inside `window`. Sleep is limited to asleep stages.
    async fn fetch_activity(&self, user_id: Uuid, window: &WeekWindow) -> Result<WeeklyActivity, ActivityError>;
}
