//! Coaching relationship handlers: subscribe and rate.

use axum::{
    Extension,
    extract::Path,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    database::Database,
    errors::AppError,
    models::{Role, Subscription},
};

/// Rating request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RateAthleteRequest {
    pub rating: i32,
}

fn validate_rating(rating: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(
            "rating must be an integer between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Subscribe the authenticated athlete to a coach.
#[utoipa::path(
    post,
    path = "/coaches/{id}/subscribe",
    tag = "subscriptions",
    params(("id" = Uuid, Path, description = "Coach ID")),
    responses(
        (status = 200, description = "Subscription created", body = Subscription),
        (status = 400, description = "Target is not a coach or already subscribed"),
        (status = 403, description = "Only athletes subscribe"),
        (status = 404, description = "Coach not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn subscribe(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(coach_id): Path<Uuid>,
) -> Result<Json<Subscription>, AppError> {
    if claims.role != Role::Athlete {
        return Err(AppError::Forbidden);
    }

    let coach = db.get_user(coach_id).await?.ok_or(AppError::NotFound)?;
    if coach.role != Role::Coach {
        return Err(AppError::Validation("user is not a coach".to_string()));
    }

    let subscription = db
        .create_subscription(coach_id, claims.sub)
        .await?
        .ok_or_else(|| AppError::Validation("already subscribed to this coach".to_string()))?;

    Ok(Json(subscription))
}

/// Set the coach's 1-5 rating for a subscribed athlete.
#[utoipa::path(
    post,
    path = "/coaches/{coach_id}/athletes/{athlete_id}/rate",
    tag = "subscriptions",
    params(
        ("coach_id" = Uuid, Path, description = "Coach ID"),
        ("athlete_id" = Uuid, Path, description = "Athlete ID")
    ),
    request_body = RateAthleteRequest,
    responses(
        (status = 200, description = "Rating stored"),
        (status = 400, description = "Rating out of range or athlete not subscribed"),
        (status = 403, description = "Only the coach rates their athletes")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rate_athlete(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path((coach_id, athlete_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<RateAthleteRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if claims.sub != coach_id || claims.role != Role::Coach {
        return Err(AppError::Forbidden);
    }

    validate_rating(req.rating)?;

    if !db
        .set_subscription_rating(coach_id, athlete_id, req.rating)
        .await?
    {
        return Err(AppError::NotSubscribed);
    }

    Ok(Json(serde_json::json!({ "rating": req.rating })))
}
