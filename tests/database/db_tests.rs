use chrono::{Duration, Utc};
use forge_processor::{
    database::{
        db::DbClient,
        store::{ActivitySource, RatingStore, StoreError}
    },
    model::{
        ranking_service::{RankingError, RankingService, RefreshStatus},
        structures::{
            rank::Rank,
            rating::{Rating, RatingBaseline},
            score_components::ScoreComponents,
            weekly_score::WeeklyScore
        }
    }
};
use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

use super::test_helpers::TestDatabase;
use crate::common::{init_test_env, week_of_march_4};

async fn setup() -> (TestDatabase, DbClient) {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    (test_db, db_client)
}

#[tokio::test]
#[serial]
#[ignore = "requires a docker daemon"]
async fn test_rating_round_trip() {
    let (_test_db, db_client) = setup().await;
    let user_id = Uuid::new_v4();

    assert_eq!(db_client.get_rating(user_id).await.unwrap(), None);

    let created = db_client
        .create_rating_if_absent(&Rating::initial(user_id, Utc::now()))
        .await
        .unwrap();
    assert_eq!(created.lp(), 0);
    assert_eq!(created.rank(), Rank::Untrained);

    // A second insert keeps the first row
    let again = db_client
        .create_rating_if_absent(&Rating::new(user_id, 1500, 900, None, Utc::now()))
        .await
        .unwrap();
    assert_eq!(again, created);

    let updated = Rating::new(
        user_id,
        1015,
        2600,
        Some(week_of_march_4(0).start()),
        created.updated_at() + Duration::seconds(1)
    );
    db_client.save_rating(&updated, created.updated_at()).await.unwrap();

    let stored = db_client.get_rating(user_id).await.unwrap().unwrap();
    assert_eq!(stored, updated);
    assert_eq!(stored.division(), None);
}

#[tokio::test]
#[serial]
#[ignore = "requires a docker daemon"]
async fn test_save_rating_detects_stale_writer() {
    let (_test_db, db_client) = setup().await;
    let user_id = Uuid::new_v4();
    let created = db_client
        .create_rating_if_absent(&Rating::initial(user_id, Utc::now()))
        .await
        .unwrap();

    let first = Rating::new(user_id, 1010, 20, None, created.updated_at() + Duration::seconds(1));
    let second = Rating::new(user_id, 990, 0, None, created.updated_at() + Duration::seconds(2));

    db_client.save_rating(&first, created.updated_at()).await.unwrap();
    let result = db_client.save_rating(&second, created.updated_at()).await;

    assert!(matches!(result, Err(StoreError::Conflict(id)) if id == user_id));
    assert_eq!(db_client.get_rating(user_id).await.unwrap(), Some(first));
}

#[tokio::test]
#[serial]
#[ignore = "requires a docker daemon"]
async fn test_invalid_rating_row_is_rejected() {
    let (test_db, db_client) = setup().await;
    let user_id = Uuid::new_v4();
    let client = test_db.get_client().await.unwrap();

    // Placement inconsistent with lp
    client
        .execute(
            "INSERT INTO ratings (user_id, mmr, lp, rank, division) VALUES ($1, 1000, 1200, 'untrained', 3)",
            &[&user_id]
        )
        .await
        .unwrap();

    assert!(matches!(
        db_client.get_rating(user_id).await,
        Err(StoreError::InvariantViolation(_))
    ));
}

#[tokio::test]
#[serial]
#[ignore = "requires a docker daemon"]
async fn test_weekly_score_upsert_keeps_identity() {
    let (test_db, db_client) = setup().await;
    let user_id = Uuid::new_v4();
    let week = week_of_march_4(0).start();

    let first = db_client
        .upsert_weekly_score(&WeeklyScore::new(
            user_id,
            week,
            ScoreComponents::new(16, 12, 10, 2),
            RatingBaseline { mmr: 1000, lp: 0 },
            Utc::now()
        ))
        .await
        .unwrap();
    let second = db_client
        .upsert_weekly_score(&WeeklyScore::new(
            user_id,
            week,
            ScoreComponents::new(40, 25, 25, 10),
            RatingBaseline { mmr: 1000, lp: 0 },
            Utc::now()
        ))
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.score(), 100);
    assert_eq!(test_db.row_count("weekly_scores").await.unwrap(), 1);
    assert_eq!(db_client.get_weekly_score(user_id, week).await.unwrap(), Some(second));
}

#[tokio::test]
#[serial]
#[ignore = "requires a docker daemon"]
async fn test_recent_weekly_scores_ordering() {
    let (_test_db, db_client) = setup().await;
    let user_id = Uuid::new_v4();
    let mut window = week_of_march_4(0);

    for _ in 0..5 {
        db_client
            .upsert_weekly_score(&WeeklyScore::new(
                user_id,
                window.start(),
                ScoreComponents::default(),
                RatingBaseline { mmr: 1000, lp: 0 },
                Utc::now()
            ))
            .await
            .unwrap();
        window = window.previous();
    }

    let recent = db_client.recent_weekly_scores(user_id, 3).await.unwrap();

    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].week_start, week_of_march_4(0).start());
    assert!(recent.windows(2).all(|w| w[0].week_start > w[1].week_start));
}

#[tokio::test]
#[serial]
#[ignore = "requires a docker daemon"]
async fn test_fetch_activity_filters_window_and_stage() {
    let (test_db, db_client) = setup().await;
    let user_id = Uuid::new_v4();
    let window = week_of_march_4(2);
    let start = window.start_utc();

    test_db
        .insert_workout(user_id, start, start + Duration::minutes(30), 150.0)
        .await
        .unwrap();
    // One second before the local week starts
    test_db
        .insert_workout(user_id, start - Duration::seconds(1), start + Duration::minutes(30), 150.0)
        .await
        .unwrap();
    test_db
        .insert_workout(user_id, window.end_utc(), window.end_utc() + Duration::minutes(30), 150.0)
        .await
        .unwrap();
    test_db
        .insert_sleep(user_id, start + Duration::hours(1), start + Duration::hours(8), "deep")
        .await
        .unwrap();
    test_db
        .insert_sleep(user_id, start + Duration::hours(1), start + Duration::hours(8), "inbed")
        .await
        .unwrap();

    let activity = db_client.fetch_activity(user_id, &window).await.unwrap();

    assert_eq!(activity.workouts.len(), 1);
    assert_eq!(activity.workouts[0].start_time, start);
    assert_eq!(activity.sleep.len(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a docker daemon"]
async fn test_weekly_refresh_against_postgres() {
    let (test_db, db_client) = setup().await;
    let user_id = Uuid::new_v4();
    let window = week_of_march_4(0);

    for day in 0..5 {
        let start = window.start_utc() + Duration::days(day) + Duration::hours(7);
        test_db
            .insert_workout(user_id, start, start + Duration::minutes(60), 200.0)
            .await
            .unwrap();
        let night = window.start_utc() + Duration::days(day);
        test_db
            .insert_sleep(user_id, night, night + Duration::hours(8), "asleep")
            .await
            .unwrap();
    }

    let db_client = Arc::new(db_client);
    let service = RankingService::new(Arc::clone(&db_client), Arc::clone(&db_client));

    assert_eq!(db_client.list_user_ids().await.unwrap(), vec![user_id]);

    let first = service.refresh_week(user_id, &window).await.unwrap();
    assert_eq!(first.status, RefreshStatus::Created);
    assert_eq!(first.weekly_score.score(), 100);
    assert_eq!(first.rating.lp(), 60);
    assert_eq!(first.rating.mmr(), 1030);

    let second = service.refresh_week(user_id, &window).await.unwrap();
    assert_eq!(second.status, RefreshStatus::Unchanged);
    assert_eq!(second.rating, first.rating);
    assert_eq!(test_db.row_count("weekly_scores").await.unwrap(), 1);

    let failure = service.refresh_week(user_id, &window.previous()).await.unwrap_err();
    assert!(matches!(failure.source, RankingError::StaleWeek { .. }));
    assert_eq!(failure.last_known, Some(first.rating));
}
