use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use itertools::Itertools;

use crate::model::{
    constants::{
        CONSISTENCY_DAY_CAP, CONSISTENCY_POINTS_PER_DAY, INTENSITY_KCAL_CAP, KCAL_PER_INTENSITY_POINT,
        MINUTES_PER_VOLUME_POINT, RECOVERY_NIGHT_CAP, RECOVERY_POINTS_PER_NIGHT, RESTFUL_NIGHT_MINUTES,
        VOLUME_MINUTES_CAP
    },
    structures::{
        activity::{SleepInterval, WeeklyActivity, Workout},
        score_components::ScoreComponents,
        week_window::WeekWindow
    }
};

/// # Weekly score
///
/// Turns one week of recorded activity into four capped components:
///
/// - consistency: distinct local days with a workout (max 5 days, 8 points each)
/// - volume: total workout minutes (capped at 250, 0.1 points per minute)
/// - intensity: total active kcal (capped at 1000, 0.025 points per kcal)
/// - recovery: local days with at least 6.5h of sleep (max 5 nights, 2 points each)
///
/// Records are assigned to the local day their start falls on and are never
/// split across midnight. Anything starting outside `window` is ignored, as
/// are sleep samples in a non-asleep stage. The result depends only on the
/// set of records, not on their order.
pub fn calculate(activity: &WeeklyActivity, window: &WeekWindow) -> ScoreComponents {
    let workouts = activity
        .workouts
        .iter()
        .filter(|w| window.contains(w.start_time))
        .collect_vec();

    let sleep = activity
        .sleep
        .iter()
        .filter(|s| s.stage.is_asleep() && window.contains(s.start_time))
        .collect_vec();

    ScoreComponents::new(
        consistency(&workouts, window),
        volume(&workouts),
        intensity(&workouts),
        recovery(&sleep, window)
    )
}

fn consistency(workouts: &[&Workout], window: &WeekWindow) -> u32 {
    let active_days = workouts
        .iter()
        .map(|w| window.local_day(w.start_time))
        .unique()
        .count() as u32;

    active_days.min(CONSISTENCY_DAY_CAP) * CONSISTENCY_POINTS_PER_DAY
}

fn volume(workouts: &[&Workout]) -> u32 {
    let seconds: i64 = workouts.iter().map(|w| w.duration().num_seconds()).sum();
    let minutes = (seconds as f64 / 60.0).min(VOLUME_MINUTES_CAP);

    (minutes / MINUTES_PER_VOLUME_POINT).floor() as u32
}

fn intensity(workouts: &[&Workout]) -> u32 {
    let kcal = workouts
        .iter()
        .map(|w| w.energy())
        .sum::<f64>()
        .min(INTENSITY_KCAL_CAP);

    (kcal / KCAL_PER_INTENSITY_POINT).floor() as u32
}

fn recovery(sleep: &[&SleepInterval], window: &WeekWindow) -> u32 {
    let mut nightly: BTreeMap<NaiveDate, Duration> = BTreeMap::new();
    for interval in sleep {
        *nightly
            .entry(window.local_day(interval.start_time))
            .or_insert_with(Duration::zero) += interval.duration();
    }

    let restful_nights = nightly
        .values()
        .filter(|slept| slept.num_minutes() >= RESTFUL_NIGHT_MINUTES)
        .count() as u32;

    restful_nights.min(RECOVERY_NIGHT_CAP) * RECOVERY_POINTS_PER_NIGHT
}
