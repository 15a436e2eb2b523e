use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use forge_processor::{
    database::{memory::MemoryStore, store::RatingStore},
    model::{
        rank_catalog,
        ranking_service::{RankingError, RankingService, RefreshStatus},
        rating_engine, score_calculator,
        structures::{
            activity::{SleepStage, WeeklyActivity, Workout},
            rank::Rank,
            rating::Rating,
            week_window::WeekWindow
        }
    },
    utils::test_utils::{generate_activity, generate_sleep, generate_week, generate_workout}
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::common::{init_test_env, week_of_march_4};

fn service() -> (Arc<MemoryStore>, RankingService<MemoryStore, MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Arc::clone(&store), RankingService::new(Arc::clone(&store), store))
}

#[tokio::test]
async fn test_season_of_full_weeks_climbs_the_ladder() {
    init_test_env();
    let (store, service) = service();
    let user_id = Uuid::new_v4();

    let mut windows = vec![week_of_march_4(0)];
    for _ in 1..20 {
        let next = windows[windows.len() - 1].previous();
        windows.push(next);
    }
    windows.reverse();

    let mut activity = WeeklyActivity::default();
    for window in &windows {
        let week = generate_week(window, 5, 5);
        activity.workouts.extend(week.workouts);
        activity.sleep.extend(week.sleep);
    }
    store.set_activity(user_id, activity);

    let mut previous_lp = 0;
    for window in &windows {
        let refresh = service.refresh_week(user_id, window).await.unwrap();

        assert_eq!(refresh.weekly_score.score(), 100);
        assert!(refresh.rating.lp() > previous_lp);
        previous_lp = refresh.rating.lp();
    }

    let rating = service.current_rating(user_id).await.unwrap().unwrap();
    assert!(rating.rank() > Rank::Untrained);
    assert_eq!(rating.rank(), rank_catalog::tier_for(rating.lp()).rank);
    assert_eq!(rating.scored_week(), Some(week_of_march_4(0).start()));
    assert_eq!(service.recent_scores(user_id, 100).await.unwrap().len(), 20);
    assert_eq!(store.rating_writes(), 20);
}

#[tokio::test]
async fn test_random_weeks_match_direct_evaluation() {
    init_test_env();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..25 {
        let (store, service) = service();
        let user_id = Uuid::new_v4();
        let window = week_of_march_4(0);
        let activity = generate_activity(&mut rng, &window);
        let start = Rating::new(user_id, 1100, 650, None, Utc::now() - Duration::days(1));
        store.insert_rating(start.clone());
        store.set_activity(user_id, activity.clone());

        let refresh = service.refresh_week(user_id, &window).await.unwrap();
        let expected = rating_engine::evaluate(
            user_id,
            start.baseline(),
            score_calculator::calculate(&activity, &window).total(),
            Some(window.start()),
            refresh.rating.updated_at()
        );

        assert_eq!(refresh.rating, expected.rating);

        // Resubmitting is a no-op
        let again = service.refresh_week(user_id, &window).await.unwrap();
        assert_eq!(again.status, RefreshStatus::Unchanged);
        assert_eq!(again.rating, refresh.rating);
    }
}

#[tokio::test]
async fn test_week_without_records_is_skipped() {
    init_test_env();
    let (store, service) = service();
    let user_id = Uuid::new_v4();
    let third = week_of_march_4(0);
    let second = third.previous();
    let first = second.previous();

    // Nothing synced for the middle week
    let mut activity = generate_week(&first, 4, 4);
    let last = generate_week(&third, 4, 4);
    activity.workouts.extend(last.workouts);
    activity.sleep.extend(last.sleep);
    store.set_activity(user_id, activity);

    let applied = service.refresh_week(user_id, &first).await.unwrap();
    let failure = service.refresh_week(user_id, &second).await.unwrap_err();

    assert!(matches!(failure.source, RankingError::NoActivity { week } if week == second.start()));
    assert_eq!(failure.last_known, Some(applied.rating.clone()));
    assert_eq!(service.current_rating(user_id).await.unwrap(), Some(applied.rating.clone()));

    let resumed = service.refresh_week(user_id, &third).await.unwrap();

    assert_eq!(resumed.weekly_score.baseline, applied.rating.baseline());
    assert_eq!(resumed.rating.scored_week(), Some(third.start()));
    assert_eq!(store.weekly_score_count(), 2);
    assert_eq!(store.rating_writes(), 2);
}

#[tokio::test]
async fn test_late_records_rescore_the_same_week() {
    init_test_env();
    let (store, service) = service();
    let user_id = Uuid::new_v4();
    let window = week_of_march_4(0);
    let mut activity = generate_week(&window, 2, 1);
    store.set_activity(user_id, activity.clone());

    let first = service.refresh_week(user_id, &window).await.unwrap();

    // A watch syncs two more sessions after the first refresh
    activity.workouts.push(generate_workout(&window, 4, 18, 45, 350.0));
    activity.workouts.push(generate_workout(&window, 5, 9, 90, 500.0));
    store.set_activity(user_id, activity.clone());

    let second = service.refresh_week(user_id, &window).await.unwrap();

    assert_eq!(second.status, RefreshStatus::Updated);
    assert!(second.weekly_score.score() > first.weekly_score.score());
    assert_eq!(second.weekly_score.baseline, first.weekly_score.baseline);
    assert_eq!(
        second.rating,
        rating_engine::evaluate(
            user_id,
            first.weekly_score.baseline,
            second.weekly_score.score(),
            Some(window.start()),
            second.rating.updated_at()
        )
        .rating
    );
    assert_eq!(store.weekly_score_count(), 1);
}

#[tokio::test]
async fn test_sunday_weeks_in_local_time() {
    init_test_env();
    let (store, service) = service();
    let user_id = Uuid::new_v4();
    let offset = FixedOffset::west_opt(5 * 3600).unwrap();
    // Wednesday 2024-03-06 in a Sunday-first locale starts on Sunday 2024-03-03
    let window = WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(), Weekday::Sun, offset);
    assert_eq!(window.start(), NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());

    // Saturday 23:30 local time is still inside the week, Sunday 00:30 is not
    let saturday_late = offset.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap().with_timezone(&Utc);
    let sunday_early = offset.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap().with_timezone(&Utc);
    let mut activity = WeeklyActivity::default();
    for start_time in [saturday_late, sunday_early] {
        activity.workouts.push(Workout {
            start_time,
            end_time: start_time + Duration::minutes(60),
            active_energy_kcal: 400.0
        });
    }
    activity.sleep.push(generate_sleep(&window, 1, 1, 7 * 60, SleepStage::Core));
    store.set_activity(user_id, activity);

    let refresh = service.refresh_week(user_id, &window).await.unwrap();
    let components = refresh.weekly_score.components;

    assert_eq!(components.consistency(), 8);
    assert_eq!(components.volume(), 6);
    assert_eq!(components.intensity(), 10);
    assert_eq!(components.recovery(), 2);
    assert_eq!(refresh.weekly_score.week_start, window.start());
}

#[tokio::test]
async fn test_batch_refresh_continues_past_failures() {
    init_test_env();
    let (store, service) = service();
    let window = week_of_march_4(0);
    let users = (0..10).map(|_| Uuid::new_v4()).collect::<Vec<_>>();

    for (i, user_id) in users.iter().enumerate() {
        if i % 4 == 0 {
            store.set_activity_unavailable(*user_id);
        } else {
            store.set_activity(*user_id, generate_week(&window, (i % 6) as i64, 3));
        }
    }

    let results = service.refresh_many(&users, &window, 3).await;
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();

    assert_eq!(results.len(), users.len());
    assert_eq!(failed, 3);
    assert_eq!(store.weekly_score_count(), 7);

    for (_, result) in results {
        if let Err(failure) = result {
            assert_eq!(failure.last_known.map(|r| r.lp()), Some(0));
        }
    }

    for user_id in &users {
        assert!(store.get_rating(*user_id).await.unwrap().is_some());
    }
}
