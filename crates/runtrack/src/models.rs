use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// User role. Replaces the usual "staff flag" pattern with an explicit
/// two-variant type: coaches subscribe to athletes, athletes own runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coach,
    Athlete,
}

/// Run lifecycle state. Only `init -> in_progress -> finished` is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "run_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Init,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn new(email: String, name: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            role,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// One training session. The derived fields (`distance_km`,
/// `run_time_seconds`, `speed`) are meaningful only once the run is
/// finished; they are written exclusively by finalization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Run {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub status: RunStatus,
    pub comment: String,
    pub distance_km: f64,
    pub run_time_seconds: i64,
    pub speed: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One GPS sample belonging to a run. `speed` and `distance_km` are derived
/// at ingestion time against the previous sample.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Position {
    pub id: Uuid,
    pub run_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    pub speed: f64,
    pub distance_km: f64,
}

/// An unlocked achievement, unique per (full_name, athlete) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Challenge {
    pub id: Uuid,
    pub full_name: String,
    pub athlete_id: Uuid,
}

/// A geofenced virtual pickup object.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CollectibleItem {
    pub id: Uuid,
    pub name: String,
    pub uid: String,
    pub latitude: f64,
    pub longitude: f64,
    pub picture: String,
    pub value: i32,
}

/// A coach-athlete relationship with an optional 1-5 rating set by the coach.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub coach_id: Uuid,
    pub athlete_id: Uuid,
    pub rating: Option<i32>,
}

/// Supplementary per-athlete profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AthleteInfo {
    pub user_id: Uuid,
    pub weight: Option<i32>,
    pub goals: String,
}

/// User list entry with the finished-run count the listing endpoints expose.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub runs_finished: i64,
}

/// User detail with picked-up collectibles and, for coaches, their average
/// rating across subscriptions.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserSummary,
    pub items: Vec<CollectibleItem>,
    pub rating: Option<f64>,
}

/// One winner of a coach analytics superlative.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsEntry {
    pub user_id: Uuid,
    pub value: f64,
}

/// Per-coach superlatives over subscribed athletes' finished runs.
/// Entries are `null` when the coach has no subscribed athletes or the
/// athletes have no finished runs.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CoachAnalytics {
    pub longest_run: Option<AnalyticsEntry>,
    pub total_distance: Option<AnalyticsEntry>,
    pub average_speed: Option<AnalyticsEntry>,
}

/// Platform-wide statistics.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Stats {
    pub users: i64,
    pub runs_finished: i64,
    pub challenges_unlocked: i64,
    pub collectible_items: i64,
}
