//! Athlete profile (weight/goals) handlers.

use axum::{
    Extension,
    extract::Path,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{auth::AuthUser, database::Database, errors::AppError, models::AthleteInfo};

/// Athlete info update request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAthleteInfoRequest {
    pub weight: Option<i32>,
    #[serde(default)]
    pub goals: String,
}

/// Get an athlete's supplementary info, creating an empty record on first
/// read.
#[utoipa::path(
    get,
    path = "/athletes/{id}/info",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Athlete info", body = AthleteInfo),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_athlete_info(
    Extension(db): Extension<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<AthleteInfo>, AppError> {
    db.get_user(id).await?.ok_or(AppError::NotFound)?;
    let info = db.get_or_create_athlete_info(id).await?;
    Ok(Json(info))
}

/// Create or update an athlete's supplementary info. Weight, when present,
/// must be an integer strictly between 0 and 900.
#[utoipa::path(
    put,
    path = "/athletes/{id}/info",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateAthleteInfoRequest,
    responses(
        (status = 200, description = "Athlete info updated", body = AthleteInfo),
        (status = 400, description = "Weight out of range"),
        (status = 403, description = "Not the profile's owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn put_athlete_info(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAthleteInfoRequest>,
) -> Result<Json<AthleteInfo>, AppError> {
    if claims.sub != id {
        return Err(AppError::Forbidden);
    }
    db.get_user(id).await?.ok_or(AppError::NotFound)?;

    if let Some(weight) = req.weight {
        if !(1..900).contains(&weight) {
            return Err(AppError::Validation(
                "weight must be an integer greater than 0 and less than 900".to_string(),
            ));
        }
    }

    let info = db.upsert_athlete_info(id, req.weight, &req.goals).await?;
    Ok(Json(info))
}
