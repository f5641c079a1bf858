//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use mrt_common::config::AlertThresholds;
use mrt_msg::OutboundKind;
use serde_json::json;

use crate::types::{MissionResilienceIndex, RecoveryMetrics};

/// Alert conditions raised by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum ResilienceAlert {
    /// The index moved by more than the configured percentage since the previous snapshot.
    CriticalDrop {
        trend_percentage: f64,
        overall_score: f64,
        threshold: f64,
    },
    /// The index is below the minimum acceptable score.
    LowScore { overall_score: f64, threshold: f64 },
    /// A recovery took longer than allowed.
    RecoveryThresholdExceeded {
        failure_event_id: String,
        duration_ms: u64,
        threshold_ms: u64,
    },
}

impl ResilienceAlert {
    pub fn label(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Bus announcement kind for this alert.
    pub fn kind(&self) -> OutboundKind {
        match self {
            ResilienceAlert::CriticalDrop { .. } => OutboundKind::CriticalDropAlert,
            ResilienceAlert::LowScore { .. } => OutboundKind::LowScoreAlert,
            ResilienceAlert::RecoveryThresholdExceeded { .. } => {
                OutboundKind::RecoveryThresholdExceeded
            }
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            ResilienceAlert::CriticalDrop {
                trend_percentage,
                overall_score,
                threshold,
            } => json!({
                "trend_percentage": trend_percentage,
                "overall_score": overall_score,
                "threshold": threshold,
            }),
            ResilienceAlert::LowScore {
                overall_score,
                threshold,
            } => json!({
                "overall_score": overall_score,
                "threshold": threshold,
            }),
            ResilienceAlert::RecoveryThresholdExceeded {
                failure_event_id,
                duration_ms,
                threshold_ms,
            } => json!({
                "failure_event_id": failure_event_id,
                "duration_ms": duration_ms,
                "threshold_ms": threshold_ms,
            }),
        }
    }
}

/// Compares fresh snapshots against the configured thresholds. Stateless:
/// a condition that stays true fires on every evaluation.
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Index alerts in a fixed order: critical drop first, then low score.
    pub fn evaluate(&self, index: &MissionResilienceIndex) -> Vec<ResilienceAlert> {
        let mut alerts = Vec::new();
        if index.trend_percentage.abs() > self.thresholds.critical_score_drop {
            alerts.push(ResilienceAlert::CriticalDrop {
                trend_percentage: index.trend_percentage,
                overall_score: index.overall_score,
                threshold: self.thresholds.critical_score_drop,
            });
        }
        if index.overall_score < self.thresholds.min_acceptable_score {
            alerts.push(ResilienceAlert::LowScore {
                overall_score: index.overall_score,
                threshold: self.thresholds.min_acceptable_score,
            });
        }
        alerts
    }

    pub fn check_recovery(&self, metrics: &RecoveryMetrics) -> Option<ResilienceAlert> {
        let duration_ms = metrics.recovery_duration_ms?;
        let threshold_ms = self.thresholds.max_recovery_time.as_millis() as u64;
        (duration_ms > threshold_ms).then(|| ResilienceAlert::RecoveryThresholdExceeded {
            failure_event_id: metrics.failure_event_id.clone(),
            duration_ms,
            threshold_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecoveryStatus, ResilienceComponents, Trend};
    use chrono::{Duration, Utc};

    fn index(score: f64, trend_percentage: f64) -> MissionResilienceIndex {
        MissionResilienceIndex {
            mission_id: "m-1".into(),
            timestamp: Utc::now(),
            overall_score: score,
            components: ResilienceComponents {
                failure_prevention: score,
                response_effectiveness: score,
                recovery_speed: score,
                system_redundancy: score,
                crew_readiness: score,
            },
            trend: Trend::Stable,
            trend_percentage,
            total_failures: 0,
            critical_failures: 0,
            average_recovery_time_ms: 0.0,
            successful_recoveries: 0,
            failed_recoveries: 0,
        }
    }

    #[test]
    fn healthy_index_raises_nothing() {
        let evaluator = AlertEvaluator::new(AlertThresholds::default());
        assert!(evaluator.evaluate(&index(90.0, -3.0)).is_empty());
    }

    #[test]
    fn both_conditions_fire_independently() {
        let evaluator = AlertEvaluator::new(AlertThresholds::default());
        let alerts = evaluator.evaluate(&index(40.0, -30.0));
        let kinds: Vec<_> = alerts.iter().map(ResilienceAlert::kind).collect();
        assert_eq!(
            kinds,
            vec![OutboundKind::CriticalDropAlert, OutboundKind::LowScoreAlert]
        );
    }

    #[test]
    fn critical_drop_uses_absolute_percentage() {
        let evaluator = AlertEvaluator::new(AlertThresholds::default());
        let alerts = evaluator.evaluate(&index(95.0, 20.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].label(), "critical-drop-alert");
    }

    #[test]
    fn recovery_threshold_is_strictly_greater() {
        let evaluator = AlertEvaluator::new(AlertThresholds {
            max_recovery_time: std::time::Duration::from_secs(600),
            ..AlertThresholds::default()
        });
        let start = Utc::now();
        let at_limit = RecoveryMetrics::new(
            "f-1",
            RecoveryStatus::Recovered,
            start,
            Some(start + Duration::minutes(10)),
        );
        assert!(evaluator.check_recovery(&at_limit).is_none());

        let over = RecoveryMetrics::new(
            "f-1",
            RecoveryStatus::Recovered,
            start,
            Some(start + Duration::minutes(11)),
        );
        let alert = evaluator.check_recovery(&over).unwrap();
        assert_eq!(alert.details()["threshold_ms"], 600_000);
    }
}
