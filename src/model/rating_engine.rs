use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{
    constants::{
        BASELINE_EXPECTED_SCORE, BASELINE_MMR, EXPECTED_SCORE_CEILING, EXPECTED_SCORE_FLOOR, MAX_SCORE,
        MMR_PER_EXPECTED_POINT, VOLATILITY_BANDS
    },
    structures::rating::{Rating, RatingBaseline}
};

/// Breakdown of one rating update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingChange {
    pub expected: f64,
    pub factor: f64,
    pub lp_delta: i32,
    pub mmr_delta: i32,
    pub rating: Rating
}

/// The score a player at `mmr` is expected to reach.
///
/// Linear around 50 at 1000 MMR, one point per 20 MMR, clamped to [20, 85]
/// so extreme ratings never demand or forgive an impossible week.
pub fn expected_score(mmr: i32) -> f64 {
    let expected = BASELINE_EXPECTED_SCORE + (mmr as f64 - BASELINE_MMR) / MMR_PER_EXPECTED_POINT;

    expected.clamp(EXPECTED_SCORE_FLOOR, EXPECTED_SCORE_CEILING)
}

/// LP multiplier for the current ladder position. Lower positions move faster.
pub fn volatility_factor(lp: u32) -> f64 {
    VOLATILITY_BANDS
        .iter()
        .find(|(floor, _)| lp >= *floor)
        .map(|(_, factor)| *factor)
        .unwrap_or(VOLATILITY_BANDS[VOLATILITY_BANDS.len() - 1].1)
}

/// Signed LP change for a week: `round((score - expected) * factor)`.
/// Ties round away from zero.
pub fn lp_delta(mmr: i32, lp: u32, score: u32) -> i32 {
    let score = score.min(MAX_SCORE) as f64;

    ((score - expected_score(mmr)) * volatility_factor(lp)).round() as i32
}

/// # Rating update
///
/// Applies one week's score to `baseline`:
///
/// 1. `delta = round((score - expected(mmr)) * factor(lp))`
/// 2. `lp' = max(0, lp + delta)`
/// 3. `mmr' = mmr + delta / 2`, truncated toward zero
/// 4. rank and division are resolved from `lp'`
///
/// Scores above 100 are treated as 100. Never fails.
pub fn evaluate(
    user_id: Uuid,
    baseline: RatingBaseline,
    score: u32,
    scored_week: Option<NaiveDate>,
    now: DateTime<Utc>
) -> RatingChange {
    let expected = expected_score(baseline.mmr);
    let factor = volatility_factor(baseline.lp);
    let lp_delta = lp_delta(baseline.mmr, baseline.lp, score);

    let new_lp = (baseline.lp as i64 + lp_delta as i64).clamp(0, u32::MAX as i64) as u32;
    let mmr_delta = lp_delta / 2;
    let new_mmr = baseline.mmr.saturating_add(mmr_delta);

    RatingChange {
        expected,
        factor,
        lp_delta,
        mmr_delta,
        rating: Rating::new(user_id, new_mmr, new_lp, scored_week, now)
    }
}

/// Applies `score` to the current rating and returns the new one.
pub fn rate(current: &Rating, score: u32, now: DateTime<Utc>) -> Rating {
    evaluate(
        current.user_id(),
        current.baseline(),
        score,
        current.scored_week(),
        now
    )
    .rating
}
