//! Coach analytics handler.

use axum::{
    Extension,
    extract::Path,
    response::Json,
};
use uuid::Uuid;

use crate::{
    database::Database,
    errors::AppError,
    models::{CoachAnalytics, Role},
};

/// Per-coach superlatives over subscribed athletes' finished runs: the
/// athlete with the longest single run, the largest summed distance, and the
/// highest average speed. Entries are `null` when no subscribed athlete has
/// a finished run.
#[utoipa::path(
    get,
    path = "/coaches/{id}/analytics",
    tag = "analytics",
    params(("id" = Uuid, Path, description = "Coach ID")),
    responses(
        (status = 200, description = "Coach analytics", body = CoachAnalytics),
        (status = 400, description = "User is not a coach"),
        (status = 404, description = "Coach not found")
    )
)]
pub async fn get_coach_analytics(
    Extension(db): Extension<Database>,
    Path(coach_id): Path<Uuid>,
) -> Result<Json<CoachAnalytics>, AppError> {
    let coach = db.get_user(coach_id).await?.ok_or(AppError::NotFound)?;
    if coach.role != Role::Coach {
        return Err(AppError::Validation("user is not a coach".to_string()));
    }

    let analytics = db.coach_analytics(coach_id).await?;
    Ok(Json(analytics))
}
