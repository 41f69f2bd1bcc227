//! Integration tests for the run lifecycle engine.
//!
//! These tests verify end-to-end functionality over a real database:
//! - State machine transition guards (double start, premature stop)
//! - Per-sample speed/distance derivation during ingestion
//! - Finalization aggregates and challenge unlocks on stop
//! - Collectible pickup idempotence
//! - Coach analytics winner selection
//!
//! To run these tests, you need:
//! 1. A PostgreSQL database with migrations applied
//! 2. DATABASE_URL environment variable set
//!
//! Note: These tests create and clean up their own data using unique IDs,
//! so they can safely run against a development database.

use runtrack::challenges_service;
use runtrack::database::Database;
use runtrack::errors::AppError;
use runtrack::models::{CollectibleItem, Role, Run, RunStatus, User};
use runtrack::proximity_service;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Get database pool, skipping tests if DATABASE_URL is not set.
async fn get_test_pool() -> Option<PgPool> {
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: DATABASE_URL not set");
            return None;
        }
    };

    match PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            eprintln!("Skipping test: Failed to connect to database: {e}");
            None
        }
    }
}

/// Helper to create a test user in the database.
async fn create_test_user(db: &Database, role: Role, test_id: &str) -> User {
    let user = User::new(
        format!("test-{test_id}-{}@example.com", Uuid::new_v4()),
        format!("Test User {test_id}"),
        role,
    );
    db.create_user_with_password(&user, "hash")
        .await
        .expect("Failed to create test user");
    user
}

/// Helper to create a run in `init` status for an athlete.
async fn create_test_run(db: &Database, athlete_id: Uuid) -> Run {
    let run = Run {
        id: Uuid::new_v4(),
        athlete_id,
        status: RunStatus::Init,
        comment: "test run".to_string(),
        distance_km: 0.0,
        run_time_seconds: 0,
        speed: 0.0,
        created_at: OffsetDateTime::now_utc(),
    };
    db.create_run(&run).await.expect("Failed to create run");
    run
}

/// Helper to insert an already-finished run with fixed aggregates.
async fn create_finished_run(db: &Database, athlete_id: Uuid, distance_km: f64, speed: f64) {
    let run = Run {
        id: Uuid::new_v4(),
        athlete_id,
        status: RunStatus::Finished,
        comment: String::new(),
        distance_km,
        run_time_seconds: 600,
        speed,
        created_at: OffsetDateTime::now_utc(),
    };
    db.create_run(&run).await.expect("Failed to create run");
}

/// Cleanup helper to remove test data for a user.
async fn cleanup_user(pool: &PgPool, user_id: Uuid) {
    // Positions, challenges, pickups, and subscriptions cascade from these.
    let _ = sqlx::query("DELETE FROM runs WHERE athlete_id = $1")
        .bind(user_id)
        .execute(pool)
        .await;
    let _ = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await;
}

async fn cleanup_collectible(pool: &PgPool, item_id: Uuid) {
    let _ = sqlx::query("DELETE FROM collectible_items WHERE id = $1")
        .bind(item_id)
        .execute(pool)
        .await;
}

async fn challenge_count(pool: &PgPool, athlete_id: Uuid, full_name: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM challenges WHERE athlete_id = $1 AND full_name = $2")
        .bind(athlete_id)
        .bind(full_name)
        .fetch_one(pool)
        .await
        .expect("Failed to count challenges")
}

#[tokio::test]
async fn full_lifecycle_derives_and_finalizes() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let athlete = create_test_user(&db, Role::Athlete, "lifecycle").await;
    let run = create_test_run(&db, athlete.id).await;

    let started = db.start_run(run.id).await.expect("start should succeed");
    assert_eq!(started.status, RunStatus::InProgress);

    // Starting twice is an invalid transition and leaves the run untouched.
    assert!(matches!(
        db.start_run(run.id).await,
        Err(AppError::InvalidTransition(_))
    ));
    let unchanged = db.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, RunStatus::InProgress);

    // Three samples at t = 0, 300, 600 s heading north: 0.01 degrees of
    // latitude is ~1112 m per segment.
    let t0 = OffsetDateTime::now_utc();
    let (p1, _) = db
        .insert_position(run.id, 55.75, 37.62, t0)
        .await
        .expect("first sample");
    assert_eq!(p1.speed, 0.0);
    assert_eq!(p1.distance_km, 0.0);

    let (p2, _) = db
        .insert_position(run.id, 55.76, 37.62, t0 + Duration::seconds(300))
        .await
        .expect("second sample");
    assert!((p2.speed - 3.71).abs() < 0.02, "speed {}", p2.speed);
    assert!((p2.distance_km - 1.11).abs() < 0.01, "km {}", p2.distance_km);

    let (p3, _) = db
        .insert_position(run.id, 55.77, 37.62, t0 + Duration::seconds(600))
        .await
        .expect("third sample");
    assert!((p3.distance_km - 2.22).abs() < 0.02, "km {}", p3.distance_km);

    let finished = db.stop_run(run.id).await.expect("stop should succeed");
    assert_eq!(finished.status, RunStatus::Finished);
    assert_eq!(finished.run_time_seconds, 600);
    assert_eq!(finished.distance_km, p3.distance_km);
    let expected_speed = ((p1.speed + p2.speed + p3.speed) / 3.0 * 100.0).round() / 100.0;
    assert!((finished.speed - expected_speed).abs() < 0.01);

    // 2.22 km in 600 s unlocks the sprint challenge.
    challenges_service::process_challenges(&db, &finished)
        .await
        .expect("challenge evaluation");
    assert_eq!(
        challenge_count(&pool, athlete.id, "Two Kilometers in Ten Minutes").await,
        1
    );

    // Stopping twice is an invalid transition.
    assert!(matches!(
        db.stop_run(run.id).await,
        Err(AppError::InvalidTransition(_))
    ));

    cleanup_user(&pool, athlete.id).await;
}

#[tokio::test]
async fn stop_from_init_is_rejected() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let athlete = create_test_user(&db, Role::Athlete, "premature-stop").await;
    let run = create_test_run(&db, athlete.id).await;

    assert!(matches!(
        db.stop_run(run.id).await,
        Err(AppError::InvalidTransition(_))
    ));

    let unchanged = db.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, RunStatus::Init);
    assert_eq!(unchanged.distance_km, 0.0);
    assert_eq!(unchanged.run_time_seconds, 0);

    cleanup_user(&pool, athlete.id).await;
}

#[tokio::test]
async fn ingestion_requires_in_progress_run() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let athlete = create_test_user(&db, Role::Athlete, "inactive-ingest").await;
    let run = create_test_run(&db, athlete.id).await;

    assert!(matches!(
        db.insert_position(run.id, 10.0, 10.0, OffsetDateTime::now_utc())
            .await,
        Err(AppError::RunNotActive)
    ));

    cleanup_user(&pool, athlete.id).await;
}

#[tokio::test]
async fn out_of_order_sample_is_rejected() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let athlete = create_test_user(&db, Role::Athlete, "out-of-order").await;
    let run = create_test_run(&db, athlete.id).await;
    db.start_run(run.id).await.unwrap();

    let t0 = OffsetDateTime::now_utc();
    db.insert_position(run.id, 10.0, 10.0, t0).await.unwrap();
    assert!(matches!(
        db.insert_position(run.id, 10.001, 10.0, t0 - Duration::seconds(5))
            .await,
        Err(AppError::Validation(_))
    ));

    cleanup_user(&pool, athlete.id).await;
}

#[tokio::test]
async fn empty_run_stops_with_default_aggregates() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let athlete = create_test_user(&db, Role::Athlete, "empty-run").await;
    let run = create_test_run(&db, athlete.id).await;
    db.start_run(run.id).await.unwrap();

    let finished = db.stop_run(run.id).await.expect("stop should succeed");
    assert_eq!(finished.status, RunStatus::Finished);
    assert_eq!(finished.distance_km, 0.0);
    assert_eq!(finished.run_time_seconds, 0);
    assert_eq!(finished.speed, 0.0);

    cleanup_user(&pool, athlete.id).await;
}

#[tokio::test]
async fn pickup_is_granted_once_across_repeated_samples() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let athlete = create_test_user(&db, Role::Athlete, "pickup").await;

    let item = CollectibleItem {
        id: Uuid::new_v4(),
        name: "Test Medal".to_string(),
        uid: format!("test-medal-{}", Uuid::new_v4()),
        latitude: 55.75,
        longitude: 37.62,
        picture: String::new(),
        value: 3,
    };
    db.create_collectible(&item).await.unwrap();

    // Two samples within 100 m of the item, one far away.
    for (lat, lon) in [(55.7501, 37.62), (55.7502, 37.62), (56.0, 37.62)] {
        proximity_service::process_pickups(&db, athlete.id, lat, lon)
            .await
            .expect("proximity scan");
    }

    let pickups: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM collectible_pickups WHERE item_id = $1 AND user_id = $2",
    )
    .bind(item.id)
    .bind(athlete.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pickups, 1);

    cleanup_collectible(&pool, item.id).await;
    cleanup_user(&pool, athlete.id).await;
}

#[tokio::test]
async fn bulk_import_commits_whole_batch_and_skips_known_uids() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());

    let known_uid = format!("test-import-{}", Uuid::new_v4());
    let existing = CollectibleItem {
        id: Uuid::new_v4(),
        name: "Already Here".to_string(),
        uid: known_uid.clone(),
        latitude: 10.0,
        longitude: 10.0,
        picture: String::new(),
        value: 1,
    };
    db.create_collectible(&existing).await.unwrap();

    let make_item = |name: &str, uid: String| CollectibleItem {
        id: Uuid::new_v4(),
        name: name.to_string(),
        uid,
        latitude: 20.0,
        longitude: 20.0,
        picture: String::new(),
        value: 2,
    };
    let batch = vec![
        make_item("Duplicate", known_uid.clone()),
        make_item("New One", format!("test-import-{}", Uuid::new_v4())),
        make_item("New Two", format!("test-import-{}", Uuid::new_v4())),
    ];

    let (imported, skipped) = db.import_collectibles(&batch).await.unwrap();
    assert_eq!(imported, 2);
    assert_eq!(skipped, 1);

    // Both new items landed; the known uid kept its original row.
    for item in &batch[1..] {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM collectible_items WHERE uid = $1")
                .bind(&item.uid)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
        cleanup_collectible(&pool, item.id).await;
    }
    cleanup_collectible(&pool, existing.id).await;
}

#[tokio::test]
async fn ten_runs_challenge_unlocks_exactly_once() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let athlete = create_test_user(&db, Role::Athlete, "ten-runs").await;

    for _ in 0..9 {
        create_finished_run(&db, athlete.id, 1.0, 2.0).await;
    }
    assert_eq!(challenge_count(&pool, athlete.id, "Ten Runs").await, 0);

    let run = create_test_run(&db, athlete.id).await;
    db.start_run(run.id).await.unwrap();
    let finished = db.stop_run(run.id).await.unwrap();

    challenges_service::process_challenges(&db, &finished)
        .await
        .unwrap();
    assert_eq!(challenge_count(&pool, athlete.id, "Ten Runs").await, 1);

    // Retrying the evaluation is a no-op thanks to get-or-create semantics.
    challenges_service::process_challenges(&db, &finished)
        .await
        .unwrap();
    assert_eq!(challenge_count(&pool, athlete.id, "Ten Runs").await, 1);

    cleanup_user(&pool, athlete.id).await;
}

#[tokio::test]
async fn coach_analytics_picks_distance_winner() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let coach = create_test_user(&db, Role::Coach, "analytics-coach").await;
    let athlete_a = create_test_user(&db, Role::Athlete, "analytics-a").await;
    let athlete_b = create_test_user(&db, Role::Athlete, "analytics-b").await;

    db.create_subscription(coach.id, athlete_a.id).await.unwrap();
    db.create_subscription(coach.id, athlete_b.id).await.unwrap();

    // Athlete A: 40 km total, one 25 km run. Athlete B: 60 km total in
    // shorter runs at lower speed.
    create_finished_run(&db, athlete_a.id, 25.0, 10.0).await;
    create_finished_run(&db, athlete_a.id, 15.0, 10.0).await;
    create_finished_run(&db, athlete_b.id, 20.0, 5.0).await;
    create_finished_run(&db, athlete_b.id, 20.0, 5.0).await;
    create_finished_run(&db, athlete_b.id, 20.0, 5.0).await;

    let analytics = db.coach_analytics(coach.id).await.unwrap();

    let longest = analytics.longest_run.expect("longest_run");
    assert_eq!(longest.user_id, athlete_a.id);
    assert_eq!(longest.value, 25.0);

    let total = analytics.total_distance.expect("total_distance");
    assert_eq!(total.user_id, athlete_b.id);
    assert_eq!(total.value, 60.0);

    let speed = analytics.average_speed.expect("average_speed");
    assert_eq!(speed.user_id, athlete_a.id);
    assert_eq!(speed.value, 10.0);

    cleanup_user(&pool, athlete_a.id).await;
    cleanup_user(&pool, athlete_b.id).await;
    cleanup_user(&pool, coach.id).await;
}

#[tokio::test]
async fn coach_with_no_finished_runs_gets_null_analytics() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let coach = create_test_user(&db, Role::Coach, "empty-analytics").await;

    let analytics = db.coach_analytics(coach.id).await.unwrap();
    assert!(analytics.longest_run.is_none());
    assert!(analytics.total_distance.is_none());
    assert!(analytics.average_speed.is_none());

    cleanup_user(&pool, coach.id).await;
}

#[tokio::test]
async fn rating_requires_subscription() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let coach = create_test_user(&db, Role::Coach, "rating-coach").await;
    let athlete = create_test_user(&db, Role::Athlete, "rating-athlete").await;

    assert!(!db
        .set_subscription_rating(coach.id, athlete.id, 4)
        .await
        .unwrap());

    db.create_subscription(coach.id, athlete.id).await.unwrap();
    assert!(db
        .set_subscription_rating(coach.id, athlete.id, 4)
        .await
        .unwrap());

    // Subscribing twice is reported as a duplicate.
    assert!(db
        .create_subscription(coach.id, athlete.id)
        .await
        .unwrap()
        .is_none());

    cleanup_user(&pool, athlete.id).await;
    cleanup_user(&pool, coach.id).await;
}
