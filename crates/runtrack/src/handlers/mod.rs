//! HTTP request handlers for the runtrack API.
//!
//! This module re-exports handlers from focused submodules organized by domain.

// Utility submodules
pub mod pagination;

// Handler modules
pub mod analytics;
pub mod challenges;
pub mod collectibles;
pub mod info;
pub mod positions;
pub mod runs;
pub mod stats;
pub mod subscriptions;
pub mod users;

// Re-export handlers from submodules (including utoipa __path types for OpenAPI)
pub use analytics::{__path_get_coach_analytics, get_coach_analytics};
pub use challenges::{__path_list_challenges, ListChallengesQuery, list_challenges};
pub use collectibles::{
    __path_create_collectible, __path_list_collectibles, __path_upload_collectibles,
    CreateCollectibleRequest, ImportReport, create_collectible, list_collectibles,
    upload_collectibles,
};
pub use info::{
    __path_get_athlete_info, __path_put_athlete_info, UpdateAthleteInfoRequest, get_athlete_info,
    put_athlete_info,
};
pub use positions::{
    __path_ingest_position, __path_list_positions, CreatePositionRequest, ingest_position,
    list_positions,
};
pub use runs::{
    __path_create_run, __path_delete_run, __path_get_run, __path_list_runs, __path_start_run,
    __path_stop_run, CreateRunRequest, ListRunsQuery, create_run, delete_run, get_run, list_runs,
    start_run, stop_run,
};
pub use stats::{
    __path_company_details, __path_get_stats, __path_health_check, company_details, get_stats,
    health_check,
};
pub use subscriptions::{
    __path_rate_athlete, __path_subscribe, RateAthleteRequest, rate_athlete, subscribe,
};
pub use users::{
    __path_get_user_profile, __path_list_users, ListUsersQuery, get_user_profile, list_users,
};
