//! Challenge rule engine.
//!
//! After a run finishes, a fixed ordered set of rules is evaluated against
//! the athlete's history of finished runs. Each satisfied rule unlocks a
//! named achievement idempotently; re-satisfying an already-unlocked
//! achievement is a no-op. New rules are appended to `RULES` without
//! touching existing unlock state.

use tracing::{info, warn};

use crate::{database::Database, errors::AppError, models::Run, run_engine::RunTotals};

/// Snapshot of an athlete's finished-run history the rules evaluate against.
#[derive(Debug, Clone, Copy)]
pub struct AthleteHistory {
    /// Count of the athlete's finished runs, including the triggering run.
    pub finished_runs: i64,
    /// Sum of distance over the athlete's finished runs, in km.
    pub total_distance_km: f64,
    /// Aggregates of the run that just finished.
    pub last_run: RunTotals,
}

pub struct ChallengeRule {
    pub full_name: &'static str,
    pub unlocked: fn(&AthleteHistory) -> bool,
}

fn ten_runs(history: &AthleteHistory) -> bool {
    history.finished_runs >= 10
}

fn fifty_kilometers(history: &AthleteHistory) -> bool {
    history.total_distance_km >= 50.0
}

/// Evaluated only against the triggering run, not the historical aggregate.
fn two_km_in_ten_minutes(history: &AthleteHistory) -> bool {
    history.last_run.distance_km >= 2.0 && history.last_run.run_time_seconds <= 600
}

pub const RULES: &[ChallengeRule] = &[
    ChallengeRule {
        full_name: "Ten Runs",
        unlocked: ten_runs,
    },
    ChallengeRule {
        full_name: "Fifty Kilometers",
        unlocked: fifty_kilometers,
    },
    ChallengeRule {
        full_name: "Two Kilometers in Ten Minutes",
        unlocked: two_km_in_ten_minutes,
    },
];

/// Evaluate all rules for the athlete of a run that just finished.
///
/// This is the entry point called from the stop handler after finalization
/// commits. Per-rule unlock failures are logged and swallowed so one bad
/// rule never poisons the others.
pub async fn process_challenges(db: &Database, run: &Run) -> Result<(), AppError> {
    let history = AthleteHistory {
        finished_runs: db.count_finished_runs(run.athlete_id).await?,
        total_distance_km: db.total_finished_distance(run.athlete_id).await?,
        last_run: RunTotals {
            distance_km: run.distance_km,
            run_time_seconds: run.run_time_seconds,
            speed: run.speed,
        },
    };

    for rule in RULES {
        if !(rule.unlocked)(&history) {
            continue;
        }
        match db.unlock_challenge(rule.full_name, run.athlete_id).await {
            Ok(true) => {
                info!(
                    "Unlocked challenge \"{}\" for athlete {}",
                    rule.full_name, run.athlete_id
                );
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    "Failed to unlock challenge \"{}\" for athlete {}: {e}",
                    rule.full_name, run.athlete_id
                );
            }
        }
    }

    Ok(())
}
