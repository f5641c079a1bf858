//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use mrt_metrics::SharedRegistry;
use prometheus::{GaugeVec, IntCounterVec, Opts};

use crate::error::Result;
use crate::types::MissionResilienceIndex;

/// Metrics published by the tracker subsystem.
#[derive(Clone)]
pub struct TrackerMetrics {
    registry: SharedRegistry,
    resilience_index: GaugeVec,
    component_score: GaugeVec,
    events_recorded_total: IntCounterVec,
    alerts_total: IntCounterVec,
    reports_generated_total: IntCounterVec,
}

impl TrackerMetrics {
    /// Register the tracker metric family against the provided registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let resilience_index = GaugeVec::new(
            Opts::new(
                "mrt_resilience_index",
                "Most recent overall resilience index (0-100) per mission",
            ),
            &["mission"],
        )?;
        registry.register(Box::new(resilience_index.clone()))?;

        let component_score = GaugeVec::new(
            Opts::new(
                "mrt_resilience_component",
                "Most recent resilience sub-score (0-100) per mission and component",
            ),
            &["mission", "component"],
        )?;
        registry.register(Box::new(component_score.clone()))?;

        let events_recorded_total = IntCounterVec::new(
            Opts::new(
                "mrt_events_recorded_total",
                "Failures, responses, and recoveries recorded by the tracker",
            ),
            &["mission", "kind"],
        )?;
        registry.register(Box::new(events_recorded_total.clone()))?;

        let alerts_total = IntCounterVec::new(
            Opts::new("mrt_alerts_total", "Alert conditions raised by the tracker"),
            &["mission", "alert"],
        )?;
        registry.register(Box::new(alerts_total.clone()))?;

        let reports_generated_total = IntCounterVec::new(
            Opts::new(
                "mrt_reports_generated_total",
                "Event reports produced per mission",
            ),
            &["mission"],
        )?;
        registry.register(Box::new(reports_generated_total.clone()))?;

        Ok(Self {
            registry,
            resilience_index,
            component_score,
            events_recorded_total,
            alerts_total,
            reports_generated_total,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn observe_index(&self, index: &MissionResilienceIndex) {
        let mission = index.mission_id.as_str();
        self.resilience_index
            .with_label_values(&[mission])
            .set(index.overall_score);
        for (component, value) in index.components.labelled() {
            self.component_score
                .with_label_values(&[mission, component])
                .set(value);
        }
    }

    pub fn inc_recorded(&self, mission: &str, kind: &str) {
        self.events_recorded_total
            .with_label_values(&[mission, kind])
            .inc();
    }

    pub fn inc_alert(&self, mission: &str, alert: &str) {
        self.alerts_total.with_label_values(&[mission, alert]).inc();
    }

    pub fn inc_report(&self, mission: &str) {
        self.reports_generated_total
            .with_label_values(&[mission])
            .inc();
    }

    /// Drop the gauges of a mission that was cleaned up. Counters are kept.
    pub fn forget_mission(&self, mission: &str, components: &[&str]) {
        let _ = self.resilience_index.remove_label_values(&[mission]);
        for component in components {
            let _ = self
                .component_score
                .remove_label_values(&[mission, component]);
        }
    }
}

impl std::fmt::Debug for TrackerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerMetrics").finish_non_exhaustive()
    }
}
