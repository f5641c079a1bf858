//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
//! Sub-score formulas. Every formula has an explicit value for empty input
//! and is clamped to `0..=100`, so scoring never fails on a sparse mission.
use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::store::EventStore;
use crate::types::{Actor, RecoveryStatus, ResilienceComponents, Severity};

pub const MAX_SCORE: f64 = 100.0;

/// Window of failures counted against prevention.
pub fn prevention_window() -> Duration {
    Duration::hours(24)
}
pub const PENALTY_PER_RECENT_FAILURE: f64 = 10.0;
/// Charged on top of [`PENALTY_PER_RECENT_FAILURE`] for critical failures.
pub const PENALTY_PER_RECENT_CRITICAL: f64 = 20.0;

/// Mean recovery at or below this scores 100.
pub const RECOVERY_TARGET_MS: f64 = 30.0 * 60.0 * 1000.0;
/// Mean recovery at or above this scores 0.
pub const RECOVERY_CEILING_MS: f64 = 2.0 * 60.0 * 60.0 * 1000.0;

pub const PENALTY_PER_AFFECTED_SYSTEM: f64 = 5.0;

/// Crew readiness before any crew response exists.
pub const CREW_READINESS_PRIOR: f64 = 80.0;

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_SCORE)
}

fn success_ratio(successful: usize, total: usize, empty: f64) -> f64 {
    if total == 0 {
        return empty;
    }
    clamp_score(successful as f64 / total as f64 * MAX_SCORE)
}

/// Compute all five sub-scores from the store as seen at `now`.
pub fn score_components(store: &EventStore, now: DateTime<Utc>) -> ResilienceComponents {
    ResilienceComponents {
        failure_prevention: failure_prevention(store, now),
        response_effectiveness: response_effectiveness(store),
        recovery_speed: recovery_speed(store),
        system_redundancy: system_redundancy(store),
        crew_readiness: crew_readiness(store),
    }
}

pub fn failure_prevention(store: &EventStore, now: DateTime<Utc>) -> f64 {
    let cutoff = now - prevention_window();
    let (recent, critical) = store
        .failures()
        .filter(|failure| failure.timestamp >= cutoff)
        .fold((0usize, 0usize), |(recent, critical), failure| {
            let is_critical = usize::from(failure.severity == Severity::Critical);
            (recent + 1, critical + is_critical)
        });
    clamp_score(
        MAX_SCORE
            - recent as f64 * PENALTY_PER_RECENT_FAILURE
            - critical as f64 * PENALTY_PER_RECENT_CRITICAL,
    )
}

pub fn response_effectiveness(store: &EventStore) -> f64 {
    let (successful, total) = store
        .all_responses()
        .fold((0, 0), |(ok, total), response| {
            (ok + usize::from(response.success), total + 1)
        });
    success_ratio(successful, total, MAX_SCORE)
}

/// Mean duration of completed recoveries, if any carry a duration.
pub fn mean_completed_recovery_ms(store: &EventStore) -> Option<f64> {
    let durations: Vec<u64> = store
        .recoveries()
        .filter(|recovery| recovery.status == RecoveryStatus::Recovered)
        .filter_map(|recovery| recovery.recovery_duration_ms)
        .collect();
    if durations.is_empty() {
        return None;
    }
    Some(durations.iter().map(|ms| *ms as f64).sum::<f64>() / durations.len() as f64)
}

pub fn recovery_speed(store: &EventStore) -> f64 {
    let Some(mean_ms) = mean_completed_recovery_ms(store) else {
        return MAX_SCORE;
    };
    let span = RECOVERY_CEILING_MS - RECOVERY_TARGET_MS;
    clamp_score(MAX_SCORE - (mean_ms - RECOVERY_TARGET_MS) / span * MAX_SCORE)
}

pub fn system_redundancy(store: &EventStore) -> f64 {
    let affected: HashSet<&str> = store
        .failures()
        .flat_map(|failure| failure.affected_systems.iter().map(String::as_str))
        .collect();
    clamp_score(MAX_SCORE - PENALTY_PER_AFFECTED_SYSTEM * affected.len() as f64)
}

pub fn crew_readiness(store: &EventStore) -> f64 {
    let (successful, total) = store
        .all_responses()
        .filter(|response| response.initiated_by == Actor::Crew)
        .fold((0, 0), |(ok, total), response| {
            (ok + usize::from(response.success), total + 1)
        });
    success_ratio(successful, total, CREW_READINESS_PRIOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureEvent, RecoveryMetrics, ResponseAction};

    fn failure(id: &str, severity: Severity, at: DateTime<Utc>) -> FailureEvent {
        FailureEvent::new(id, "m-1", severity, "navigation", "test", Actor::System).at(at)
    }

    fn recovered_after(store: &mut EventStore, id: &str, minutes: i64) {
        let start = Utc::now() - Duration::hours(3);
        store.record_recovery(RecoveryMetrics::new(
            id,
            RecoveryStatus::Recovered,
            start,
            Some(start + Duration::minutes(minutes)),
        ));
    }

    #[test]
    fn empty_store_uses_documented_defaults() {
        let components = score_components(&EventStore::new(), Utc::now());
        assert_eq!(components.failure_prevention, 100.0);
        assert_eq!(components.response_effectiveness, 100.0);
        assert_eq!(components.recovery_speed, 100.0);
        assert_eq!(components.system_redundancy, 100.0);
        assert_eq!(components.crew_readiness, 80.0);
    }

    #[test]
    fn prevention_counts_only_last_day() {
        let now = Utc::now();
        let mut store = EventStore::new();
        store.record_failure(failure("f-1", Severity::Critical, now - Duration::hours(1)));
        store.record_failure(failure("f-2", Severity::Critical, now - Duration::hours(30)));
        store.record_failure(failure("f-3", Severity::Low, now - Duration::hours(23)));
        assert_eq!(failure_prevention(&store, now), 100.0 - 10.0 - 20.0 - 10.0);
    }

    #[test]
    fn prevention_floors_at_zero() {
        let now = Utc::now();
        let mut store = EventStore::new();
        for i in 0..5 {
            store.record_failure(failure(&format!("f-{i}"), Severity::Critical, now));
        }
        assert_eq!(failure_prevention(&store, now), 0.0);
    }

    #[test]
    fn forty_five_minute_recovery_scores_five_sixths() {
        let mut store = EventStore::new();
        recovered_after(&mut store, "f-1", 45);
        let score = recovery_speed(&store);
        assert!((score - 83.333_333).abs() < 1e-3, "score was {score}");
    }

    #[test]
    fn recovery_speed_clamps_both_ends() {
        let mut fast = EventStore::new();
        recovered_after(&mut fast, "f-1", 5);
        assert_eq!(recovery_speed(&fast), 100.0);

        let mut slow = EventStore::new();
        recovered_after(&mut slow, "f-1", 600);
        assert_eq!(recovery_speed(&slow), 0.0);
    }

    #[test]
    fn unfinished_recoveries_do_not_affect_speed() {
        let mut store = EventStore::new();
        let start = Utc::now();
        store.record_recovery(RecoveryMetrics::new(
            "f-1",
            RecoveryStatus::Degraded,
            start,
            Some(start + Duration::hours(5)),
        ));
        assert_eq!(recovery_speed(&store), 100.0);
        assert_eq!(mean_completed_recovery_ms(&store), None);
    }

    #[test]
    fn redundancy_counts_distinct_systems() {
        let now = Utc::now();
        let mut store = EventStore::new();
        store.record_failure(
            failure("f-1", Severity::Low, now).with_affected_systems(["radar", "gps"]),
        );
        store.record_failure(
            failure("f-2", Severity::Low, now).with_affected_systems(["gps", "ais"]),
        );
        assert_eq!(system_redundancy(&store), 85.0);
    }

    #[test]
    fn crew_readiness_ignores_other_initiators() {
        let mut store = EventStore::new();
        store.record_response(ResponseAction::new("r-1", "f-1", Actor::Crew, "reset", true, 1));
        store.record_response(ResponseAction::new("r-2", "f-1", Actor::Crew, "reset", false, 1));
        store.record_response(ResponseAction::new("r-3", "f-1", Actor::Ai, "reroute", false, 1));
        assert_eq!(crew_readiness(&store), 50.0);
        let effectiveness = response_effectiveness(&store);
        assert!((effectiveness - 100.0 / 3.0).abs() < 1e-9);
    }
}
