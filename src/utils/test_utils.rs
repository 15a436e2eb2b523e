use crate::model::structures::{
    activity::{SleepInterval, SleepStage, WeeklyActivity, Workout},
    rating::Rating,
    week_window::WeekWindow
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

/// Week of Monday 2024-03-04, UTC
pub fn test_window() -> WeekWindow {
    WeekWindow::containing(
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        Weekday::Mon,
        FixedOffset::east_opt(0).unwrap()
    )
}

pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap()
}

pub fn generate_rating(user_id: Uuid, mmr: i32, lp: u32) -> Rating {
    Rating::new(user_id, mmr, lp, None, test_now())
}

/// A workout starting `hour` o'clock on the `day`-th local day of `window`.
pub fn generate_workout(window: &WeekWindow, day: i64, hour: i64, minutes: i64, kcal: f64) -> Workout {
    let start_time = window.start_utc() + Duration::days(day) + Duration::hours(hour);

    Workout {
        start_time,
        end_time: start_time + Duration::minutes(minutes),
        active_energy_kcal: kcal
    }
}

pub fn generate_sleep(window: &WeekWindow, day: i64, hour: i64, minutes: i64, stage: SleepStage) -> SleepInterval {
    let start_time = window.start_utc() + Duration::days(day) + Duration::hours(hour);

    SleepInterval {
        start_time,
        end_time: start_time + Duration::minutes(minutes),
        stage
    }
}

/// Builds an activity week scoring exactly `days` consistency days, 60 minutes
/// and 200 kcal per session and `nights` 8 hour nights.
pub fn generate_week(window: &WeekWindow, days: i64, nights: i64) -> WeeklyActivity {
    WeeklyActivity {
        workouts: (0..days).map(|d| generate_workout(window, d, 7, 60, 200.0)).collect(),
        sleep: (0..nights)
            .map(|d| generate_sleep(window, d, 0, 8 * 60, SleepStage::Asleep))
            .collect()
    }
}

/// Random but reproducible week of activity. Some records fall outside the
/// window or are malformed on purpose.
pub fn generate_activity(rng: &mut ChaCha8Rng, window: &WeekWindow) -> WeeklyActivity {
    let n_workouts = rng.random_range(0..=14);
    let n_sleep = rng.random_range(0..=14);

    let workouts = (0..n_workouts)
        .map(|_| {
            let day = rng.random_range(-1..=7);
            let hour = rng.random_range(0..24);
            let minutes = rng.random_range(-30..=240);
            let kcal = rng.random_range(-100.0..=900.0);

            generate_workout(window, day, hour, minutes, kcal)
        })
        .collect();

    let stages = [
        SleepStage::InBed,
        SleepStage::Awake,
        SleepStage::Asleep,
        SleepStage::Core,
        SleepStage::Deep,
        SleepStage::Rem
    ];
    let sleep = (0..n_sleep)
        .map(|_| {
            let day = rng.random_range(-1..=7);
            let hour = rng.random_range(0..24);
            let minutes = rng.random_range(0..=600);
            let stage = stages[rng.random_range(0..stages.len())];

            generate_sleep(window, day, hour, minutes, stage)
        })
        .collect();

    WeeklyActivity { workouts, sleep }
}
