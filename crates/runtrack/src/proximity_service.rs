//! Collectible proximity detector.
//!
//! Runs after each accepted position: every known collectible item within
//! `PICKUP_RADIUS_METERS` of the sample is granted to the run's athlete.
//! Granting is idempotent and best-effort; a failure for one item degrades
//! to a no-op for that item and never rejects the position write.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{database::Database, errors::AppError, geodesic};

pub const PICKUP_RADIUS_METERS: f64 = 100.0;

/// The pickup radius is inclusive: a sample exactly 100 m away still grants.
fn within_pickup_radius(distance_meters: f64) -> bool {
    distance_meters <= PICKUP_RADIUS_METERS
}

pub async fn process_pickups(
    db: &Database,
    athlete_id: Uuid,
    latitude: f64,
    longitude: f64,
) -> Result<(), AppError> {
    let items = db.all_collectibles().await?;

    for item in items {
        let distance =
            geodesic::distance_meters((latitude, longitude), (item.latitude, item.longitude));
        if !within_pickup_radius(distance) {
            continue;
        }
        match db.grant_pickup(item.id, athlete_id).await {
            Ok(true) => {
                info!(
                    "Athlete {athlete_id} picked up \"{}\" at {distance:.1}m",
                    item.name
                );
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to grant pickup of item {} to {athlete_id}: {e}", item.id);
            }
        }
    }

    Ok(())
}
