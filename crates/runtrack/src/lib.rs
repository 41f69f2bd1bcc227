pub mod auth;
pub mod challenges_service;
pub mod collectible_import;
pub mod database;
pub mod errors;
pub mod geodesic;
pub mod handlers;
pub mod models;
pub mod proximity_service;
pub mod run_engine;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::{
    auth::{login, me, register},
    database::Database,
    handlers::{
        company_details, create_collectible, create_run, delete_run, get_athlete_info,
        get_coach_analytics, get_run, get_stats, get_user_profile, health_check, ingest_position,
        list_challenges, list_collectibles, list_positions, list_runs, list_users,
        put_athlete_info, rate_athlete, start_run, stop_run, subscribe, upload_collectibles,
    },
};

pub fn create_router(pool: PgPool) -> Router {
    let db = Database::new(pool);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/company", get(company_details))
        .route("/stats", get(get_stats))
        // Auth routes
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        // User routes
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user_profile))
        .route(
            "/athletes/{id}/info",
            get(get_athlete_info).put(put_athlete_info),
        )
        // Run routes
        .route("/runs", get(list_runs).post(create_run))
        .route("/runs/{id}", get(get_run).delete(delete_run))
        .route("/runs/{id}/start", post(start_run))
        .route("/runs/{id}/stop", post(stop_run))
        .route(
            "/runs/{id}/positions",
            get(list_positions).post(ingest_position),
        )
        // Challenge routes
        .route("/challenges", get(list_challenges))
        // Collectible routes
        .route(
            "/collectibles",
            get(list_collectibles).post(create_collectible),
        )
        .route("/collectibles/upload", post(upload_collectibles))
        // Coaching routes
        .route("/coaches/{id}/subscribe", post(subscribe))
        .route(
            "/coaches/{coach_id}/athletes/{athlete_id}/rate",
            post(rate_athlete),
        )
        .route("/coaches/{id}/analytics", get(get_coach_analytics))
        .layer(Extension(db))
        .layer(cors)
        .layer(CompressionLayer::new())
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
}

pub async fn run_server(pool: PgPool, port: u16) -> anyhow::Result<()> {
    let app = create_router(pool);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    tracing::info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
