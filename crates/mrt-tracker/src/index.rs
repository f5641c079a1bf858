//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use mrt_common::config::HistoryLimits;
use tracing::debug;

use crate::scoring::{self, mean_completed_recovery_ms};
use crate::store::EventStore;
use crate::types::{
    MissionResilienceIndex, RecoveryStatus, ResilienceComponents, ResilienceTrendPoint, Severity,
    Trend,
};

/// Component weights; they sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexWeights {
    pub failure_prevention: f64,
    pub response_effectiveness: f64,
    pub recovery_speed: f64,
    pub system_redundancy: f64,
    pub crew_readiness: f64,
}

pub const WEIGHTS: IndexWeights = IndexWeights {
    failure_prevention: 0.25,
    response_effectiveness: 0.25,
    recovery_speed: 0.25,
    system_redundancy: 0.15,
    crew_readiness: 0.10,
};

/// Score change (either direction) that leaves the trend `stable`.
pub const TREND_DEADBAND: f64 = 5.0;

/// Lower bound of the previous score when computing the trend percentage.
pub const TREND_EPSILON: f64 = 1e-6;

impl IndexWeights {
    /// Weighted sum of the components.
    pub fn apply(&self, components: &ResilienceComponents) -> f64 {
        self.failure_prevention * components.failure_prevention
            + self.response_effectiveness * components.response_effectiveness
            + self.recovery_speed * components.recovery_speed
            + self.system_redundancy * components.system_redundancy
            + self.crew_readiness * components.crew_readiness
    }
}

pub fn classify_trend(previous: f64, current: f64) -> Trend {
    let delta = current - previous;
    if delta > TREND_DEADBAND {
        Trend::Improving
    } else if delta < -TREND_DEADBAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

pub fn trend_percentage(previous: f64, current: f64) -> f64 {
    (current - previous) / previous.max(TREND_EPSILON) * 100.0
}

/// Holds the current snapshot and the capped trend history of one mission.
#[derive(Debug)]
pub struct IndexCalculator {
    mission_id: String,
    limits: HistoryLimits,
    current: Option<MissionResilienceIndex>,
    history: VecDeque<ResilienceTrendPoint>,
}

impl IndexCalculator {
    pub fn new(mission_id: impl Into<String>, limits: HistoryLimits) -> Self {
        Self {
            mission_id: mission_id.into(),
            limits,
            current: None,
            history: VecDeque::new(),
        }
    }

    /// Score the store at `now`, replace the current snapshot and append a trend point.
    pub fn calculate(&mut self, store: &EventStore, now: DateTime<Utc>) -> MissionResilienceIndex {
        let components = scoring::score_components(store, now);
        let overall_score = WEIGHTS.apply(&components);
        let previous = self
            .current
            .as_ref()
            .map(|index| index.overall_score)
            .unwrap_or(overall_score);

        let total_failures = store.failure_count();
        let critical_failures = store
            .failures()
            .filter(|failure| failure.severity == Severity::Critical)
            .count();
        let successful_recoveries = store
            .recoveries()
            .filter(|recovery| recovery.status == RecoveryStatus::Recovered)
            .count();
        let failed_recoveries = store
            .recoveries()
            .filter(|recovery| recovery.status == RecoveryStatus::Failed)
            .count();

        let index = MissionResilienceIndex {
            mission_id: self.mission_id.clone(),
            timestamp: now,
            overall_score,
            components,
            trend: classify_trend(previous, overall_score),
            trend_percentage: trend_percentage(previous, overall_score),
            total_failures,
            critical_failures,
            average_recovery_time_ms: mean_completed_recovery_ms(store).unwrap_or(0.0),
            successful_recoveries,
            failed_recoveries,
        };

        let recovery_rate = if total_failures == 0 {
            0.0
        } else {
            successful_recoveries as f64 / total_failures as f64
        };
        self.push_history(ResilienceTrendPoint {
            timestamp: now,
            score: overall_score,
            event_count: total_failures,
            recovery_rate,
        });
        self.current = Some(index.clone());
        index
    }

    fn push_history(&mut self, point: ResilienceTrendPoint) {
        self.history.push_back(point);
        if self.history.len() > self.limits.ceiling {
            let excess = self.history.len() - self.limits.retain;
            self.history.drain(..excess);
            debug!(
                target: "mrt::index",
                mission = %self.mission_id,
                pruned = excess,
                retained = self.history.len(),
                "trend history pruned",
            );
        }
    }

    pub fn current(&self) -> Option<&MissionResilienceIndex> {
        self.current.as_ref()
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &ResilienceTrendPoint> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Actor, FailureEvent};

    fn calculator() -> IndexCalculator {
        IndexCalculator::new("m-1", HistoryLimits::default())
    }

    #[test]
    fn empty_mission_scores_ninety_eight() {
        let index = calculator().calculate(&EventStore::new(), Utc::now());
        assert!((index.overall_score - 98.0).abs() < 1e-9);
        assert_eq!(index.trend, Trend::Stable);
        assert_eq!(index.trend_percentage, 0.0);
    }

    #[test]
    fn overall_is_weighted_sum_of_same_snapshot() {
        let mut store = EventStore::new();
        store.record_failure(
            FailureEvent::new("f-1", "m-1", Severity::Critical, "power", "x", Actor::Crew)
                .with_affected_systems(["generator"]),
        );
        let index = calculator().calculate(&store, Utc::now());
        assert_eq!(index.overall_score, WEIGHTS.apply(&index.components));
        assert_eq!(index.components.failure_prevention, 70.0);
        assert_eq!(index.total_failures, 1);
        assert_eq!(index.critical_failures, 1);
    }

    #[test]
    fn trend_boundaries_are_stable() {
        assert_eq!(classify_trend(50.0, 55.0), Trend::Stable);
        assert_eq!(classify_trend(50.0, 45.0), Trend::Stable);
        assert_eq!(classify_trend(50.0, 55.5), Trend::Improving);
        assert_eq!(classify_trend(50.0, 44.5), Trend::Declining);
    }

    #[test]
    fn trend_percentage_survives_zero_previous() {
        let pct = trend_percentage(0.0, 10.0);
        assert!(pct.is_finite());
        assert!(pct > 0.0);
        assert_eq!(trend_percentage(80.0, 60.0), -25.0);
    }

    #[test]
    fn repeated_calculation_is_stable() {
        let mut calc = calculator();
        let store = EventStore::new();
        let now = Utc::now();
        let first = calc.calculate(&store, now);
        let second = calc.calculate(&store, now);
        let third = calc.calculate(&store, now);
        assert_eq!(first.overall_score, second.overall_score);
        assert_eq!(second.trend, Trend::Stable);
        assert_eq!(third.trend, Trend::Stable);
        assert_eq!(calc.history_len(), 3);
    }

    #[test]
    fn history_prunes_to_retained_window() {
        let mut calc = IndexCalculator::new(
            "m-1",
            HistoryLimits {
                ceiling: 10,
                retain: 4,
            },
        );
        let store = EventStore::new();
        for _ in 0..10 {
            calc.calculate(&store, Utc::now());
        }
        assert_eq!(calc.history_len(), 10);
        calc.calculate(&store, Utc::now());
        assert_eq!(calc.history_len(), 4);
    }
}
