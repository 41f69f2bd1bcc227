//! Health check, company details, and platform statistics handlers.

use axum::{Extension, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::{database::Database, errors::AppError, models::Stats};

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "stats",
    responses(
        (status = 200, description = "Health check passed")
    )
)]
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Static company details.
#[utoipa::path(
    get,
    path = "/company",
    tag = "stats",
    responses(
        (status = 200, description = "Company details")
    )
)]
pub async fn company_details() -> Json<Value> {
    Json(json!({
        "company_name": "Runtrack",
        "slogan": "Every run counts",
        "contacts": "support@runtrack.example",
    }))
}

/// Get platform-wide statistics (users, finished runs, unlocked challenges,
/// collectible items).
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Platform statistics", body = Stats)
    )
)]
pub async fn get_stats(Extension(db): Extension<Database>) -> Result<Json<Stats>, AppError> {
    let stats = db.get_stats().await?;
    Ok(Json(stats))
}
