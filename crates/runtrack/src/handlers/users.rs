//! User listing and profile handlers.

use axum::{
    Extension,
    extract::{Path, Query},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::AppError,
    models::{Role, UserProfile, UserSummary},
};

use super::pagination::{PaginatedResponse, default_limit, validate_page};

/// User list query parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListUsersQuery {
    /// Filter by role: "coach" or "athlete".
    #[serde(rename = "type")]
    pub user_type: Option<Role>,
    /// Case-insensitive name search.
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// List users with role filter and name search.
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(
        ("type" = Option<Role>, Query, description = "Filter by role"),
        ("search" = Option<String>, Query, description = "Name search"),
        ("limit" = Option<i64>, Query, description = "Maximum number of results"),
        ("offset" = Option<i64>, Query, description = "Number of results to skip")
    ),
    responses(
        (status = 200, description = "Paginated users", body = PaginatedResponse<UserSummary>)
    )
)]
pub async fn list_users(
    Extension(db): Extension<Database>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserSummary>>, AppError> {
    validate_page(query.limit, query.offset)?;
    let search = query.search.as_deref().filter(|s| !s.is_empty());
    let users = db
        .list_users(query.user_type, search, query.limit, query.offset)
        .await?;
    let total = db.count_users(query.user_type, search).await?;
    Ok(Json(PaginatedResponse::new(
        users,
        total,
        query.limit,
        query.offset,
    )))
}

/// Get a user's profile: finished-run count, picked-up collectibles, and
/// for coaches the average rating across their subscriptions.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_profile(
    Extension(db): Extension<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    let user = db.get_user_summary(id).await?.ok_or(AppError::NotFound)?;
    let items = db.items_for_user(id).await?;
    let rating = match user.role {
        Role::Coach => db.coach_rating_avg(id).await?,
        Role::Athlete => None,
    };

    Ok(Json(UserProfile {
        user,
        items,
        rating,
    }))
}
