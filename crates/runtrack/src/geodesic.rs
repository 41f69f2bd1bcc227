//! Great-circle distance over (latitude, longitude) degree pairs, plus the
//! coordinate range checks shared by position ingestion and collectible
//! creation.

use geo::{Distance as _, Haversine, geometry::Point};

use crate::errors::AppError;

/// Great-circle surface distance between two (lat, lon) points in meters.
pub fn distance_meters(a: (f64, f64), b: (f64, f64)) -> f64 {
    // geo points are (x, y) = (lon, lat)
    Haversine.distance(Point::new(a.1, a.0), Point::new(b.1, b.0))
}

/// Great-circle surface distance in kilometers.
pub fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    distance_meters(a, b) / 1000.0
}

pub fn validate_latitude(value: f64) -> Result<(), AppError> {
    if !value.is_finite() || !(-90.0..=90.0).contains(&value) {
        return Err(AppError::Validation(
            "latitude must be between -90.0 and +90.0 degrees".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_longitude(value: f64) -> Result<(), AppError> {
    if !value.is_finite() || !(-180.0..=180.0).contains(&value) {
        return Err(AppError::Validation(
            "longitude must be between -180.0 and +180.0 degrees".to_string(),
        ));
    }
    Ok(())
}

/// Round a coordinate to a fixed number of fractional digits (6 for
/// positions, 4 for collectibles).
pub fn round_coordinate(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
