//! Unlocked-achievement listing handler.

use axum::{
    Extension,
    extract::Query,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{database::Database, errors::AppError, models::Challenge};

/// Challenge list query parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListChallengesQuery {
    pub athlete: Option<Uuid>,
}

/// List unlocked achievements, optionally for one athlete.
#[utoipa::path(
    get,
    path = "/challenges",
    tag = "challenges",
    params(
        ("athlete" = Option<Uuid>, Query, description = "Filter by athlete")
    ),
    responses(
        (status = 200, description = "Unlocked challenges", body = Vec<Challenge>)
    )
)]
pub async fn list_challenges(
    Extension(db): Extension<Database>,
    Query(query): Query<ListChallengesQuery>,
) -> Result<Json<Vec<Challenge>>, AppError> {
    let challenges = db.list_challenges(query.athlete).await?;
    Ok(Json(challenges))
}
