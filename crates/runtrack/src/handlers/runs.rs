//! Run lifecycle handlers: CRUD, start, and stop.

use axum::{
    Extension,
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    challenges_service,
    database::Database,
    errors::AppError,
    models::{Role, Run, RunStatus},
};

use super::pagination::{PaginatedResponse, default_limit, validate_page};

/// Run list query parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListRunsQuery {
    pub status: Option<RunStatus>,
    pub athlete: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Run creation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRunRequest {
    #[serde(default)]
    pub comment: String,
}

/// List runs with optional status and athlete filters.
#[utoipa::path(
    get,
    path = "/runs",
    tag = "runs",
    params(
        ("status" = Option<RunStatus>, Query, description = "Filter by lifecycle status"),
        ("athlete" = Option<Uuid>, Query, description = "Filter by owning athlete"),
        ("limit" = Option<i64>, Query, description = "Maximum number of results"),
        ("offset" = Option<i64>, Query, description = "Number of results to skip")
    ),
    responses(
        (status = 200, description = "Paginated runs", body = PaginatedResponse<Run>)
    )
)]
pub async fn list_runs(
    Extension(db): Extension<Database>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<PaginatedResponse<Run>>, AppError> {
    validate_page(query.limit, query.offset)?;
    let runs = db
        .list_runs(query.status, query.athlete, query.limit, query.offset)
        .await?;
    let total = db.count_runs(query.status, query.athlete).await?;
    Ok(Json(PaginatedResponse::new(
        runs,
        total,
        query.limit,
        query.offset,
    )))
}

/// Create a run for the authenticated athlete. Runs start in `init`.
#[utoipa::path(
    post,
    path = "/runs",
    tag = "runs",
    request_body = CreateRunRequest,
    responses(
        (status = 200, description = "Run created", body = Run),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only athletes own runs")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_run(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateRunRequest>,
) -> Result<Json<Run>, AppError> {
    if claims.role != Role::Athlete {
        return Err(AppError::Forbidden);
    }

    let run = Run {
        id: Uuid::new_v4(),
        athlete_id: claims.sub,
        status: RunStatus::Init,
        comment: req.comment,
        distance_km: 0.0,
        run_time_seconds: 0,
        speed: 0.0,
        created_at: OffsetDateTime::now_utc(),
    };
    db.create_run(&run).await?;

    Ok(Json(run))
}

/// Get a run by ID.
#[utoipa::path(
    get,
    path = "/runs/{id}",
    tag = "runs",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run details", body = Run),
        (status = 404, description = "Run not found")
    )
)]
pub async fn get_run(
    Extension(db): Extension<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, AppError> {
    let run = db.get_run(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(run))
}

/// Delete a run and its positions.
#[utoipa::path(
    delete,
    path = "/runs/{id}",
    tag = "runs",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 204, description = "Run deleted"),
        (status = 403, description = "Not the run's owner"),
        (status = 404, description = "Run not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_run(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let run = db.get_run(id).await?.ok_or(AppError::NotFound)?;
    if run.athlete_id != claims.sub {
        return Err(AppError::Forbidden);
    }

    if db.delete_run(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// Start a run (`init -> in_progress`).
#[utoipa::path(
    post,
    path = "/runs/{id}/start",
    tag = "runs",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run started", body = Run),
        (status = 400, description = "Run already started or finished"),
        (status = 404, description = "Run not found")
    )
)]
pub async fn start_run(
    Extension(db): Extension<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, AppError> {
    let run = db.start_run(id).await?;
    Ok(Json(run))
}

/// Stop a run (`in_progress -> finished`).
///
/// Finalization runs inside the transition's critical section; the challenge
/// rules are evaluated afterwards and their failures never fail the stop.
#[utoipa::path(
    post,
    path = "/runs/{id}/stop",
    tag = "runs",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run finished with final aggregates", body = Run),
        (status = 400, description = "Run not started or already finished"),
        (status = 404, description = "Run not found")
    )
)]
pub async fn stop_run(
    Extension(db): Extension<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, AppError> {
    let run = db.stop_run(id).await?;

    if let Err(e) = challenges_service::process_challenges(&db, &run).await {
        warn!("Failed to evaluate challenges for athlete {}: {e}", run.athlete_id);
    }

    Ok(Json(run))
}
