use crate::model::structures::{rating::RatingBaseline, score_components::ScoreComponents};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One scored week for one user. `(user_id, week_start)` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyScore {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    pub components: ScoreComponents,
    /// Rating the week is applied to. Upserts replace it; once the rating
    /// reflects the week the stored value is passed back unchanged
    pub baseline: RatingBaseline,
    pub created_at: DateTime<Utc>
}

impl WeeklyScore {
    pub fn new(
        user_id: Uuid,
        week_start: NaiveDate,
        components: ScoreComponents,
        baseline: RatingBaseline,
        created_at: DateTime<Utc>
    ) -> WeeklyScore {
        WeeklyScore {
            id: Uuid::new_v4(),
            user_id,
            week_start,
            components,
            baseline,
            created_at: created_at.trunc_subsecs(6)
        }
    }

    pub fn score(&self) -> u32 {
        self.components.total()
    }
}
