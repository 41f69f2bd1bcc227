use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{
        AnalyticsEntry, AthleteInfo, Challenge, CoachAnalytics, CollectibleItem, Position, Role,
        Run, RunStatus, Stats, Subscription, User, UserSummary,
    },
    run_engine,
};

const RUN_COLUMNS: &str = "id, athlete_id, status, comment, distance_km, run_time_seconds, speed, created_at";
const POSITION_COLUMNS: &str = "id, run_id, latitude, longitude, recorded_at, speed, distance_km";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---- users ----

    pub async fn create_user_with_password(
        &self,
        user: &User,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as(
            "SELECT id, email, name, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as(
            "SELECT id, email, name, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AppError> {
        let row: Option<(Uuid, String, String, Role, OffsetDateTime, String)> = sqlx::query_as(
            "SELECT id, email, name, role, created_at, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, name, role, created_at, hash)| {
            (
                User {
                    id,
                    email,
                    name,
                    role,
                    created_at,
                },
                hash,
            )
        }))
    }

    pub async fn list_users(
        &self,
        role: Option<Role>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSummary>, AppError> {
        let users = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.created_at,
                   COUNT(r.id) FILTER (WHERE r.status = 'finished') AS runs_finished
            FROM users u
            LEFT JOIN runs r ON r.athlete_id = u.id
            WHERE ($1::user_role IS NULL OR u.role = $1)
              AND ($2::text IS NULL OR u.name ILIKE '%' || $2 || '%')
            GROUP BY u.id
            ORDER BY u.created_at, u.id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(role)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn count_users(
        &self,
        role: Option<Role>,
        search: Option<&str>,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(role)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn get_user_summary(&self, id: Uuid) -> Result<Option<UserSummary>, AppError> {
        let user = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.created_at,
                   COUNT(r.id) FILTER (WHERE r.status = 'finished') AS runs_finished
            FROM users u
            LEFT JOIN runs r ON r.athlete_id = u.id
            WHERE u.id = $1
            GROUP BY u.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // ---- athlete info ----

    pub async fn get_or_create_athlete_info(&self, user_id: Uuid) -> Result<AthleteInfo, AppError> {
        sqlx::query("INSERT INTO athlete_info (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let info = sqlx::query_as("SELECT user_id, weight, goals FROM athlete_info WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(info)
    }

    pub async fn upsert_athlete_info(
        &self,
        user_id: Uuid,
        weight: Option<i32>,
        goals: &str,
    ) -> Result<AthleteInfo, AppError> {
        let info = sqlx::query_as(
            r#"
            INSERT INTO athlete_info (user_id, weight, goals)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET weight = $2, goals = $3
            RETURNING user_id, weight, goals
            "#,
        )
        .bind(user_id)
        .bind(weight)
        .bind(goals)
        .fetch_one(&self.pool)
        .await?;

        Ok(info)
    }

    // ---- runs ----

    pub async fn create_run(&self, run: &Run) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO runs (id, athlete_id, status, comment, distance_km, run_time_seconds, speed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(run.id)
        .bind(run.athlete_id)
        .bind(run.status)
        .bind(&run.comment)
        .bind(run.distance_km)
        .bind(run.run_time_seconds)
        .bind(run.speed)
        .bind(run.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_run(&self, id: Uuid) -> Result<Option<Run>, AppError> {
        let run = sqlx::query_as(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(run)
    }

    pub async fn list_runs(
        &self,
        status: Option<RunStatus>,
        athlete_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, AppError> {
        let runs = sqlx::query_as(&format!(
            r#"
            SELECT {RUN_COLUMNS} FROM runs
            WHERE ($1::run_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR athlete_id = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(status)
        .bind(athlete_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(runs)
    }

    pub async fn count_runs(
        &self,
        status: Option<RunStatus>,
        athlete_id: Option<Uuid>,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM runs
            WHERE ($1::run_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR athlete_id = $2)
            "#,
        )
        .bind(status)
        .bind(athlete_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn delete_run(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM runs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition a run `init -> in_progress`. The run row is locked for the
    /// duration so concurrent start requests cannot double-transition.
    pub async fn start_run(&self, id: Uuid) -> Result<Run, AppError> {
        let mut tx = self.pool.begin().await?;

        let run: Run =
            sqlx::query_as(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound)?;

        let next = run_engine::start(run.status)?;

        let updated: Run = sqlx::query_as(&format!(
            "UPDATE runs SET status = $2 WHERE id = $1 RETURNING {RUN_COLUMNS}"
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Transition a run `in_progress -> finished` and run finalization over
    /// its samples inside the same per-run critical section.
    pub async fn stop_run(&self, id: Uuid) -> Result<Run, AppError> {
        let mut tx = self.pool.begin().await?;

        let run: Run =
            sqlx::query_as(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound)?;

        let next = run_engine::stop(run.status)?;

        let positions: Vec<Position> = sqlx::query_as(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions WHERE run_id = $1 ORDER BY recorded_at, id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        // A run with no samples keeps its default aggregates.
        let totals = run_engine::finalize(&positions).unwrap_or_default();

        let updated: Run = sqlx::query_as(&format!(
            r#"
            UPDATE runs
            SET status = $2, distance_km = $3, run_time_seconds = $4, speed = $5
            WHERE id = $1
            RETURNING {RUN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(next)
        .bind(totals.distance_km)
        .bind(totals.run_time_seconds)
        .bind(totals.speed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    // ---- positions ----

    /// Append a sample to an in-progress run, deriving speed and cumulative
    /// distance against the latest existing sample. The run row is locked so
    /// concurrent inserts on the same run serialize on "latest sample".
    /// Returns the stored position and the owning athlete's id.
    pub async fn insert_position(
        &self,
        run_id: Uuid,
        latitude: f64,
        longitude: f64,
        recorded_at: OffsetDateTime,
    ) -> Result<(Position, Uuid), AppError> {
        let mut tx = self.pool.begin().await?;

        let run: Run =
            sqlx::query_as(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1 FOR UPDATE"))
                .bind(run_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound)?;

        if run.status != RunStatus::InProgress {
            return Err(AppError::RunNotActive);
        }

        let prev: Option<Position> = sqlx::query_as(&format!(
            r#"
            SELECT {POSITION_COLUMNS} FROM positions
            WHERE run_id = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(run_id)
        .fetch_optional(&mut *tx)
        .await?;

        // Timestamps are the canonical ordering for all derived figures;
        // an out-of-order sample would corrupt the cumulative distance.
        if let Some(p) = &prev {
            if recorded_at < p.recorded_at {
                return Err(AppError::Validation(
                    "position timestamp is earlier than the run's latest sample".to_string(),
                ));
            }
        }

        let derived = run_engine::derive_sample(prev.as_ref(), latitude, longitude, recorded_at);

        let position: Position = sqlx::query_as(&format!(
            r#"
            INSERT INTO positions (id, run_id, latitude, longitude, recorded_at, speed, distance_km)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {POSITION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(run_id)
        .bind(latitude)
        .bind(longitude)
        .bind(recorded_at)
        .bind(derived.speed)
        .bind(derived.distance_km)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((position, run.athlete_id))
    }

    pub async fn positions_for_run(&self, run_id: Uuid) -> Result<Vec<Position>, AppError> {
        let positions = sqlx::query_as(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions WHERE run_id = $1 ORDER BY recorded_at, id"
        ))
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(positions)
    }

    // ---- athlete history (challenge rules) ----

    pub async fn count_finished_runs(&self, athlete_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM runs WHERE athlete_id = $1 AND status = 'finished'",
        )
        .bind(athlete_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn total_finished_distance(&self, athlete_id: Uuid) -> Result<f64, AppError> {
        let total = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(distance_km), 0)::float8
            FROM runs WHERE athlete_id = $1 AND status = 'finished'
            "#,
        )
        .bind(athlete_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    // ---- challenges ----

    /// Idempotent get-or-create on (full_name, athlete). Returns true when a
    /// new challenge row was created.
    pub async fn unlock_challenge(
        &self,
        full_name: &str,
        athlete_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO challenges (id, full_name, athlete_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (full_name, athlete_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(full_name)
        .bind(athlete_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_challenges(
        &self,
        athlete_id: Option<Uuid>,
    ) -> Result<Vec<Challenge>, AppError> {
        let challenges = sqlx::query_as(
            r#"
            SELECT id, full_name, athlete_id FROM challenges
            WHERE ($1::uuid IS NULL OR athlete_id = $1)
            ORDER BY full_name
            "#,
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(challenges)
    }

    // ---- collectibles ----

    pub async fn create_collectible(&self, item: &CollectibleItem) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO collectible_items (id, name, uid, latitude, longitude, picture, value)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.uid)
        .bind(item.latitude)
        .bind(item.longitude)
        .bind(&item.picture)
        .bind(item.value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a batch of collectibles in a single transaction, skipping
    /// items whose uid is already known. Returns (imported, skipped) counts.
    /// On error nothing from the batch is committed.
    pub async fn import_collectibles(
        &self,
        items: &[CollectibleItem],
    ) -> Result<(usize, usize), AppError> {
        let mut tx = self.pool.begin().await?;

        let mut imported = 0;
        for item in items {
            let result = sqlx::query(
                r#"
                INSERT INTO collectible_items (id, name, uid, latitude, longitude, picture, value)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (uid) DO NOTHING
                "#,
            )
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.uid)
            .bind(item.latitude)
            .bind(item.longitude)
            .bind(&item.picture)
            .bind(item.value)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                imported += 1;
            }
        }

        tx.commit().await?;

        Ok((imported, items.len() - imported))
    }

    pub async fn all_collectibles(&self) -> Result<Vec<CollectibleItem>, AppError> {
        let items = sqlx::query_as(
            "SELECT id, name, uid, latitude, longitude, picture, value FROM collectible_items ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Idempotent pickup grant. Returns true when the athlete was newly added
    /// to the item's pickup set.
    pub async fn grant_pickup(&self, item_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO collectible_pickups (item_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn items_for_user(&self, user_id: Uuid) -> Result<Vec<CollectibleItem>, AppError> {
        let items = sqlx::query_as(
            r#"
            SELECT i.id, i.name, i.uid, i.latitude, i.longitude, i.picture, i.value
            FROM collectible_items i
            JOIN collectible_pickups p ON p.item_id = i.id
            WHERE p.user_id = $1
            ORDER BY i.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    // ---- subscriptions ----

    /// Create a coach-athlete subscription. Returns `None` when the pair is
    /// already subscribed.
    pub async fn create_subscription(
        &self,
        coach_id: Uuid,
        athlete_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (id, coach_id, athlete_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (coach_id, athlete_id) DO NOTHING
            RETURNING id, coach_id, athlete_id, rating
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(coach_id)
        .bind(athlete_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Set the coach's rating for a subscribed athlete. Returns false when
    /// no subscription exists for the pair.
    pub async fn set_subscription_rating(
        &self,
        coach_id: Uuid,
        athlete_id: Uuid,
        rating: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET rating = $3 WHERE coach_id = $1 AND athlete_id = $2",
        )
        .bind(coach_id)
        .bind(athlete_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn coach_rating_avg(&self, coach_id: Uuid) -> Result<Option<f64>, AppError> {
        let avg = sqlx::query_scalar(
            "SELECT AVG(rating)::float8 FROM subscriptions WHERE coach_id = $1",
        )
        .bind(coach_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(avg)
    }

    // ---- coach analytics ----

    /// Per-coach superlatives over subscribed athletes' finished runs. Each
    /// entry is `None` when no subscribed athlete has a finished run. Ties
    /// resolve to whichever row the aggregation returns first.
    pub async fn coach_analytics(&self, coach_id: Uuid) -> Result<CoachAnalytics, AppError> {
        let longest_run = self
            .analytics_superlative(coach_id, "MAX(r.distance_km)")
            .await?;
        let total_distance = self
            .analytics_superlative(coach_id, "SUM(r.distance_km)")
            .await?;
        let average_speed = self.analytics_superlative(coach_id, "AVG(r.speed)").await?;

        Ok(CoachAnalytics {
            longest_run,
            total_distance,
            average_speed,
        })
    }

    async fn analytics_superlative(
        &self,
        coach_id: Uuid,
        aggregate: &str,
    ) -> Result<Option<AnalyticsEntry>, AppError> {
        let row: Option<(Uuid, f64)> = sqlx::query_as(&format!(
            r#"
            SELECT r.athlete_id, {aggregate}::float8 AS value
            FROM runs r
            JOIN subscriptions s ON s.athlete_id = r.athlete_id
            WHERE s.coach_id = $1 AND r.status = 'finished'
            GROUP BY r.athlete_id
            ORDER BY value DESC
            LIMIT 1
            "#
        ))
        .bind(coach_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, value)| AnalyticsEntry { user_id, value }))
    }

    // ---- stats ----

    pub async fn get_stats(&self) -> Result<Stats, AppError> {
        let stats = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM runs WHERE status = 'finished') AS runs_finished,
                (SELECT COUNT(*) FROM challenges) AS challenges_unlocked,
                (SELECT COUNT(*) FROM collectible_items) AS collectible_items
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
