//! Position ingestion and listing handlers.

use axum::{
    Extension,
    extract::Path,
    response::Json,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::AppError,
    geodesic,
    models::Position,
    proximity_service,
};

/// Position ingestion request. `recorded_at` is RFC 3339.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// Ingest a GPS sample for an in-progress run.
///
/// Returns the stored sample with its derived instantaneous speed and
/// cumulative distance. The collectible proximity scan runs afterwards,
/// best-effort.
#[utoipa::path(
    post,
    path = "/runs/{id}/positions",
    tag = "positions",
    params(("id" = Uuid, Path, description = "Run ID")),
    request_body = CreatePositionRequest,
    responses(
        (status = 200, description = "Position accepted with derived fields", body = Position),
        (status = 400, description = "Out-of-range coordinates or run not in progress"),
        (status = 404, description = "Run not found")
    )
)]
pub async fn ingest_position(
    Extension(db): Extension<Database>,
    Path(run_id): Path<Uuid>,
    Json(req): Json<CreatePositionRequest>,
) -> Result<Json<Position>, AppError> {
    geodesic::validate_latitude(req.latitude)?;
    geodesic::validate_longitude(req.longitude)?;

    let latitude = geodesic::round_coordinate(req.latitude, 6);
    let longitude = geodesic::round_coordinate(req.longitude, 6);

    let (position, athlete_id) = db
        .insert_position(run_id, latitude, longitude, req.recorded_at)
        .await?;

    // Best-effort: a proximity failure degrades to a no-op, never a rejected
    // position write.
    if let Err(e) = proximity_service::process_pickups(&db, athlete_id, latitude, longitude).await
    {
        warn!("Collectible proximity scan failed for run {run_id}: {e}");
    }

    Ok(Json(position))
}

/// List a run's positions in timestamp order.
#[utoipa::path(
    get,
    path = "/runs/{id}/positions",
    tag = "positions",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Positions in timestamp order", body = Vec<Position>),
        (status = 404, description = "Run not found")
    )
)]
pub async fn list_positions(
    Extension(db): Extension<Database>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<Vec<Position>>, AppError> {
    db.get_run(run_id).await?.ok_or(AppError::NotFound)?;
    let positions = db.positions_for_run(run_id).await?;
    Ok(Json(positions))
}
