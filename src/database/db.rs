use super::store::{ActivityError, ActivitySource, RatingStore, StoreError};
use crate::model::structures::{
    activity::{SleepInterval, SleepStage, WeeklyActivity, Workout},
    rating::{Rating, RatingBaseline},
    score_components::ScoreComponents,
    week_window::WeekWindow,
    weekly_score::WeeklyScore
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use postgres_types::ToSql;
use std::{str::FromStr, sync::Arc};
use tokio_postgres::{Client, Error, NoTls, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const RATING_COLUMNS: &str = "user_id, mmr, lp, rank, division, scored_week, updated_at";
const WEEKLY_SCORE_COLUMNS: &str =
    "id, user_id, week_start, score, consistency, volume, intensity, recovery, mmr_before, lp_before, created_at";

#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    /// Creates the rating tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), Error> {
        self.client.batch_execute(SCHEMA).await?;

        info!("Schema verified");
        Ok(())
    }

    fn rating_from_row(row: &Row) -> Result<Rating, StoreError> {
        let user_id: Uuid = row.try_get("user_id")?;
        let rank: String = row.try_get("rank")?;

        Rating::from_stored(
            user_id,
            row.try_get::<_, i32>("mmr")? as i64,
            row.try_get::<_, i32>("lp")? as i64,
            rank.as_str(),
            row.try_get("division")?,
            row.try_get("scored_week")?,
            row.try_get("updated_at")?
        )
        .map_err(|e| StoreError::InvariantViolation(format!("rating of user {}: {}", user_id, e)))
    }

    fn weekly_score_from_row(row: &Row) -> Result<WeeklyScore, StoreError> {
        let id: Uuid = row.try_get("id")?;
        let invalid = |reason: String| StoreError::InvariantViolation(format!("weekly score {}: {}", id, reason));

        let components = ScoreComponents::checked(
            row.try_get::<_, i32>("consistency")? as i64,
            row.try_get::<_, i32>("volume")? as i64,
            row.try_get::<_, i32>("intensity")? as i64,
            row.try_get::<_, i32>("recovery")? as i64
        )
        .map_err(|e| invalid(e.to_string()))?;

        let score: i32 = row.try_get("score")?;
        if score as i64 != components.total() as i64 {
            return Err(invalid(format!(
                "score {} does not match component total {}",
                score,
                components.total()
            )));
        }

        let lp_before: i32 = row.try_get("lp_before")?;
        let lp_before = u32::try_from(lp_before).map_err(|_| invalid(format!("lp_before {} is negative", lp_before)))?;

        Ok(WeeklyScore {
            id,
            user_id: row.try_get("user_id")?,
            week_start: row.try_get("week_start")?,
            components,
            baseline: RatingBaseline {
                mmr: row.try_get("mmr_before")?,
                lp: lp_before
            },
            created_at: row.try_get("created_at")?
        })
    }

    fn workout_from_row(row: &Row) -> Result<Workout, Error> {
        Ok(Workout {
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            active_energy_kcal: row.try_get("active_energy_kcal")?
        })
    }

    fn sleep_from_row(row: &Row) -> Result<SleepInterval, ActivityError> {
        let stage: String = row.try_get("stage")?;

        Ok(SleepInterval {
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            stage: SleepStage::from_str(&stage)
                .map_err(|_| ActivityError::InvalidRecord(format!("unknown sleep stage '{}'", stage)))?
        })
    }
}

#[async_trait]
impl RatingStore for DbClient {
    async fn get_rating(&self, user_id: Uuid) -> Result<Option<Rating>, StoreError> {
        let query = format!("SELECT {} FROM ratings WHERE user_id = $1", RATING_COLUMNS);
        let row = self.client.query_opt(query.as_str(), &[&user_id]).await?;

        row.as_ref().map(Self::rating_from_row).transpose()
    }

    async fn create_rating_if_absent(&self, rating: &Rating) -> Result<Rating, StoreError> {
        let query = "INSERT INTO ratings (user_id, mmr, lp, rank, division, scored_week, updated_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (user_id) DO NOTHING";
        let lp = rating.lp() as i32;
        let rank = rating.rank();
        let division = rating.division().map(|d| d.number());
        let values: &[&(dyn ToSql + Sync)] = &[
            &rating.user_id(),
            &rating.mmr(),
            &lp,
            &rank.tag(),
            &division,
            &rating.scored_week(),
            &rating.updated_at()
        ];

        let inserted = self.client.execute(query, values).await?;
        if inserted > 0 {
            info!("Created initial rating for user {}", rating.user_id());
        }

        self.get_rating(rating.user_id()).await?.ok_or_else(|| {
            StoreError::Unavailable(format!("rating of user {} missing after insert", rating.user_id()))
        })
    }

    async fn save_rating(&self, rating: &Rating, expected_updated_at: DateTime<Utc>) -> Result<(), StoreError> {
        let query = "UPDATE ratings SET mmr = $2, lp = $3, rank = $4, division = $5, scored_week = $6, updated_at = $7 \
            WHERE user_id = $1 AND updated_at = $8";
        let lp = rating.lp() as i32;
        let rank = rating.rank();
        let division = rating.division().map(|d| d.number());
        let values: &[&(dyn ToSql + Sync)] = &[
            &rating.user_id(),
            &rating.mmr(),
            &lp,
            &rank.tag(),
            &division,
            &rating.scored_week(),
            &rating.updated_at(),
            &expected_updated_at
        ];

        let updated = self.client.execute(query, values).await?;
        if updated == 0 {
            return Err(StoreError::Conflict(rating.user_id()));
        }

        debug!("Saved rating for user {}", rating.user_id());
        Ok(())
    }

    async fn get_weekly_score(&self, user_id: Uuid, week_start: NaiveDate) -> Result<Option<WeeklyScore>, StoreError> {
        let query = format!(
            "SELECT {} FROM weekly_scores WHERE user_id = $1 AND week_start = $2",
            WEEKLY_SCORE_COLUMNS
        );
        let row = self.client.query_opt(query.as_str(), &[&user_id, &week_start]).await?;

        row.as_ref().map(Self::weekly_score_from_row).transpose()
    }

    async fn upsert_weekly_score(&self, score: &WeeklyScore) -> Result<WeeklyScore, StoreError> {
        // id and created_at of an existing row are left untouched
        let query = format!(
            "INSERT INTO weekly_scores ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
            ON CONFLICT (user_id, week_start) DO UPDATE SET score = EXCLUDED.score, \
            consistency = EXCLUDED.consistency, volume = EXCLUDED.volume, \
            intensity = EXCLUDED.intensity, recovery = EXCLUDED.recovery, \
            mmr_before = EXCLUDED.mmr_before, lp_before = EXCLUDED.lp_before \
            RETURNING {}",
            WEEKLY_SCORE_COLUMNS, WEEKLY_SCORE_COLUMNS
        );
        let total = score.score() as i32;
        let consistency = score.components.consistency() as i32;
        let volume = score.components.volume() as i32;
        let intensity = score.components.intensity() as i32;
        let recovery = score.components.recovery() as i32;
        let lp_before = score.baseline.lp as i32;
        let values: &[&(dyn ToSql + Sync)] = &[
            &score.id,
            &score.user_id,
            &score.week_start,
            &total,
            &consistency,
            &volume,
            &intensity,
            &recovery,
            &score.baseline.mmr,
            &lp_before,
            &score.created_at
        ];

        let row = self.client.query_one(query.as_str(), values).await?;
        Self::weekly_score_from_row(&row)
    }

    async fn recent_weekly_scores(&self, user_id: Uuid, limit: i64) -> Result<Vec<WeeklyScore>, StoreError> {
        let query = format!(
            "SELECT {} FROM weekly_scores WHERE user_id = $1 ORDER BY week_start DESC LIMIT $2",
            WEEKLY_SCORE_COLUMNS
        );
        let rows = self.client.query(query.as_str(), &[&user_id, &limit]).await?;

        rows.iter().map(Self::weekly_score_from_row).collect()
    }

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        info!("Fetching user ids...");
        let rows = self
            .client
            .query(
                "SELECT user_id FROM ratings UNION SELECT user_id FROM workouts ORDER BY user_id",
                &[]
            )
            .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<_, Uuid>("user_id"))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Found {} users", ids.len());
        Ok(ids)
    }
}

#[async_trait]
impl ActivitySource for DbClient {
    async fn fetch_activity(&self, user_id: Uuid, window: &WeekWindow) -> Result<WeeklyActivity, ActivityError> {
        let start = window.start_utc();
        let end = window.end_utc();

        let workout_rows = self
            .client
            .query(
                "SELECT start_time, end_time, active_energy_kcal FROM workouts \
                WHERE user_id = $1 AND start_time >= $2 AND start_time < $3 ORDER BY start_time",
                &[&user_id, &start, &end]
            )
            .await?;

        let sleep_rows = self
            .client
            .query(
                "SELECT start_time, end_time, stage FROM sleep_samples \
                WHERE user_id = $1 AND start_time >= $2 AND start_time < $3 \
                AND stage IN ('asleep', 'core', 'deep', 'rem') ORDER BY start_time",
                &[&user_id, &start, &end]
            )
            .await?;

        let workouts = workout_rows
            .iter()
            .map(Self::workout_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let sleep = sleep_rows
            .iter()
            .map(Self::sleep_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Fetched {} workouts and {} sleep samples for user {} (week of {})",
            workouts.len(),
            sleep.len(),
            user_id,
            window.start()
        );

        Ok(WeeklyActivity { workouts, sleep })
    }
}
