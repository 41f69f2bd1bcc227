//! Run lifecycle state machine, per-sample ingestion math, and finalization
//! aggregation. Everything here is pure; the database layer drives it inside
//! a per-run transaction.

use time::OffsetDateTime;

use crate::{errors::AppError, geodesic, models::{Position, RunStatus}};

/// Round to two decimal places, the precision for all derived figures.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Guard the `init -> in_progress` transition.
pub fn start(status: RunStatus) -> Result<RunStatus, AppError> {
    match status {
        RunStatus::Init => Ok(RunStatus::InProgress),
        RunStatus::InProgress => Err(AppError::InvalidTransition(
            "run already started".to_string(),
        )),
        RunStatus::Finished => Err(AppError::InvalidTransition(
            "run already finished".to_string(),
        )),
    }
}

/// Guard the `in_progress -> finished` transition.
pub fn stop(status: RunStatus) -> Result<RunStatus, AppError> {
    match status {
        RunStatus::InProgress => Ok(RunStatus::Finished),
        RunStatus::Init | RunStatus::Finished => Err(AppError::InvalidTransition(
            "run not started or already finished".to_string(),
        )),
    }
}

/// Derived fields for a newly ingested sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleDerivation {
    /// Instantaneous speed in m/s against the previous sample.
    pub speed: f64,
    /// Cumulative distance in km at this sample.
    pub distance_km: f64,
}

/// Compute speed and cumulative distance for a new sample against the run's
/// latest existing sample. The first sample of a run has both at zero, and a
/// zero-duration gap yields speed zero while distance still accumulates.
pub fn derive_sample(
    prev: Option<&Position>,
    latitude: f64,
    longitude: f64,
    recorded_at: OffsetDateTime,
) -> SampleDerivation {
    let Some(prev) = prev else {
        return SampleDerivation {
            speed: 0.0,
            distance_km: 0.0,
        };
    };

    let segment_m =
        geodesic::distance_meters((prev.latitude, prev.longitude), (latitude, longitude));
    let elapsed_s = (recorded_at - prev.recorded_at).whole_seconds();

    let speed = if elapsed_s <= 0 {
        0.0
    } else {
        round2(segment_m / elapsed_s as f64)
    };

    SampleDerivation {
        speed,
        distance_km: round2(prev.distance_km + segment_m / 1000.0),
    }
}

/// Aggregate figures persisted onto a run when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunTotals {
    pub distance_km: f64,
    pub run_time_seconds: i64,
    pub speed: f64,
}

/// Final aggregation over a run's samples in timestamp order. Returns `None`
/// for a run with no samples, in which case the run keeps its defaults.
pub fn finalize(positions: &[Position]) -> Option<RunTotals> {
    let first = positions.first()?;
    let last = positions.last()?;

    let speed_sum: f64 = positions.iter().map(|p| p.speed).sum();

    Some(RunTotals {
        distance_km: last.distance_km,
        run_time_seconds: (last.recorded_at - first.recorded_at).whole_seconds(),
        speed: round2(speed_sum / positions.len() as f64),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;

    fn position(latitude: f64, longitude: f64, recorded_at: OffsetDateTime) -> Position {
        let mut p = Position {
            id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            latitude,
            longitude,
            recorded_at,
            speed: 0.0,
            distance_km: 0.0,
        };
        let d = derive_sample(None, latitude, longitude, recorded_at);
        p.speed = d.speed;
        p.distance_km = d.distance_km;
        p
    }

    fn next_position(prev: &Position, latitude: f64, longitude: f64, recorded_at: OffsetDateTime) -> Position {
        let d = derive_sample(Some(prev), latitude, longitude, recorded_at);
        Position {
            id: Uuid::new_v4(),
            run_id: prev.run_id,
            latitude,
            longitude,
            recorded_at,
            speed: d.speed,
            distance_km: d.distance_km,
        }
    }

    #[test]
    fn start_only_from_init() {
        assert_eq!(start(RunStatus::Init).unwrap(), RunStatus::InProgress);
        assert!(matches!(
            start(RunStatus::InProgress),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            start(RunStatus::Finished),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn stop_only_from_in_progress() {
        assert_eq!(stop(RunStatus::InProgress).unwrap(), RunStatus::Finished);
        assert!(matches!(
            stop(RunStatus::Init),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            stop(RunStatus::Finished),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn first_sample_has_zero_derivation() {
        let d = derive_sample(None, 55.75, 37.62, datetime!(2024-05-01 10:00:00 UTC));
        assert_eq!(d.speed, 0.0);
        assert_eq!(d.distance_km, 0.0);
    }

    #[test]
    fn straight_path_accumulates_segments() {
        // Three samples at t = 0, 10, 20 s heading north along a meridian.
        // 0.001 degrees of latitude is ~111.2 m.
        let t0 = datetime!(2024-05-01 10:00:00 UTC);
        let p1 = position(0.0, 0.0, t0);
        let p2 = next_position(&p1, 0.001, 0.0, t0 + time::Duration::seconds(10));
        let p3 = next_position(&p2, 0.002, 0.0, t0 + time::Duration::seconds(20));

        let segment_m = geodesic::distance_meters((0.0, 0.0), (0.001, 0.0));
        assert_eq!(p2.speed, round2(segment_m / 10.0));
        assert!((p2.speed - 11.12).abs() < 0.02, "got {}", p2.speed);

        // Cumulative distance of the third sample is segment 1 + segment 2
        // within rounding tolerance.
        let expected = round2(round2(segment_m / 1000.0) + segment_m / 1000.0);
        assert!((p3.distance_km - expected).abs() < 0.01, "got {}", p3.distance_km);
    }

    #[test]
    fn zero_duration_gap_yields_zero_speed() {
        let t0 = datetime!(2024-05-01 10:00:00 UTC);
        let p1 = position(0.0, 0.0, t0);
        let p2 = next_position(&p1, 0.001, 0.0, t0);
        assert_eq!(p2.speed, 0.0);
        // Distance still accumulates across the degenerate gap.
        assert!(p2.distance_km > 0.0);
    }

    #[test]
    fn finalize_empty_run_is_none() {
        assert_eq!(finalize(&[]), None);
    }

    #[test]
    fn finalize_aggregates_window_and_mean_speed() {
        let t0 = datetime!(2024-05-01 10:00:00 UTC);
        let p1 = position(0.0, 0.0, t0);
        let p2 = next_position(&p1, 0.005, 0.0, t0 + time::Duration::seconds(300));
        let p3 = next_position(&p2, 0.010, 0.0, t0 + time::Duration::seconds(600));

        let totals = finalize(&[p1.clone(), p2.clone(), p3.clone()]).unwrap();
        assert_eq!(totals.run_time_seconds, 600);
        assert_eq!(totals.distance_km, p3.distance_km);
        assert_eq!(totals.speed, round2((p1.speed + p2.speed + p3.speed) / 3.0));
    }

    #[test]
    fn finalize_single_sample_run() {
        let p = position(10.0, 20.0, datetime!(2024-05-01 10:00:00 UTC));
        let totals = finalize(std::slice::from_ref(&p)).unwrap();
        assert_eq!(totals.run_time_seconds, 0);
        assert_eq!(totals.distance_km, 0.0);
        assert_eq!(totals.speed, 0.0);
    }
}
