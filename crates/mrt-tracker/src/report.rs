//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::store::EventStore;
use crate::types::{FailureEvent, RecoveryMetrics, RecoveryStatus, ResponseAction, Severity};

/// Default report window ending now.
pub fn default_window() -> Duration {
    Duration::hours(24)
}

/// Responses slower than this count as slow.
pub const SLOW_RESPONSE_MS: u64 = 5 * 60 * 1000;
/// Share of events with a slow response above which a recommendation is made.
pub const SLOW_RESPONSE_SHARE: f64 = 0.3;
/// Events of one category at or above this count are flagged.
pub const FREQUENT_CATEGORY_COUNT: usize = 3;

pub const RESPONSE_IMPACT_BONUS: i32 = 5;
pub const RECOVERY_IMPACT_BONUS: i32 = 10;

pub const WITHIN_PARAMETERS: &str = "System resilience is within acceptable parameters.";

pub fn severity_penalty(severity: Severity) -> i32 {
    match severity {
        Severity::Critical => -30,
        Severity::High => -20,
        Severity::Medium => -10,
        Severity::Low => -5,
    }
}

/// Inclusive time window of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportPeriod {
    /// Resolve optional bounds: `end` defaults to `now`, `start` to 24 hours before `end`.
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let end = end.unwrap_or(now);
        let start = start.unwrap_or(end - default_window());
        Self { start, end }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// One failure in a report with everything recorded against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedEvent {
    pub failure: FailureEvent,
    pub responses: Vec<ResponseAction>,
    pub recovery: Option<RecoveryMetrics>,
    pub resilience_impact: i32,
}

impl ReportedEvent {
    fn new(failure: &FailureEvent, store: &EventStore) -> Self {
        let responses = store.responses_for(&failure.id).to_vec();
        let recovery = store.recovery_for(&failure.id).cloned();
        let resilience_impact = resilience_impact(failure.severity, &responses, recovery.as_ref());
        Self {
            failure: failure.clone(),
            responses,
            recovery,
            resilience_impact,
        }
    }

    fn has_slow_response(&self) -> bool {
        self.responses
            .iter()
            .any(|response| response.duration_ms > SLOW_RESPONSE_MS)
    }
}

/// Signed contribution of a single failure to resilience.
pub fn resilience_impact(
    severity: Severity,
    responses: &[ResponseAction],
    recovery: Option<&RecoveryMetrics>,
) -> i32 {
    let successful = responses.iter().filter(|response| response.success).count() as i32;
    let recovered = recovery.is_some_and(|r| r.status == RecoveryStatus::Recovered);
    severity_penalty(severity)
        + RESPONSE_IMPACT_BONUS * successful
        + if recovered { RECOVERY_IMPACT_BONUS } else { 0 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_events: usize,
    pub events_by_category: BTreeMap<String, usize>,
    /// Always holds all four severities.
    pub events_by_severity: BTreeMap<Severity, usize>,
    pub average_response_time_ms: f64,
    pub average_recovery_time_ms: f64,
}

/// Immutable snapshot of the failures in a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    pub id: Uuid,
    pub mission_id: String,
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub events: Vec<ReportedEvent>,
    pub summary: ReportSummary,
    pub recommendations: Vec<String>,
}

fn mean(values: impl Iterator<Item = u64>) -> f64 {
    let (sum, count) = values.fold((0u128, 0u64), |(sum, count), value| {
        (sum + u128::from(value), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Build the report of `store` for `period`. Events are ordered by timestamp.
pub fn generate_report(
    store: &EventStore,
    mission_id: &str,
    period: ReportPeriod,
    generated_at: DateTime<Utc>,
) -> EventReport {
    let mut events: Vec<ReportedEvent> = store
        .failures()
        .filter(|failure| period.contains(failure.timestamp))
        .map(|failure| ReportedEvent::new(failure, store))
        .collect();
    events.sort_by_key(|event| event.failure.timestamp);

    let summary = summarize(&events);
    let recommendations = recommend(&events, &summary);
    debug!(
        target: "mrt::report",
        mission = %mission_id,
        events = events.len(),
        recommendations = recommendations.len(),
        "report generated",
    );

    EventReport {
        id: Uuid::new_v4(),
        mission_id: mission_id.to_owned(),
        generated_at,
        period,
        events,
        summary,
        recommendations,
    }
}

fn summarize(events: &[ReportedEvent]) -> ReportSummary {
    let mut events_by_category = BTreeMap::new();
    let mut events_by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|severity| (*severity, 0)).collect();
    for event in events {
        *events_by_category
            .entry(event.failure.category.clone())
            .or_insert(0) += 1;
        *events_by_severity.entry(event.failure.severity).or_insert(0) += 1;
    }

    ReportSummary {
        total_events: events.len(),
        events_by_category,
        events_by_severity,
        average_response_time_ms: mean(
            events
                .iter()
                .flat_map(|event| event.responses.iter().map(|response| response.duration_ms)),
        ),
        average_recovery_time_ms: mean(
            events
                .iter()
                .filter_map(|event| event.recovery.as_ref()?.recovery_duration_ms),
        ),
    }
}

fn recommend(events: &[ReportedEvent], summary: &ReportSummary) -> Vec<String> {
    let mut recommendations = Vec::new();

    for (category, count) in &summary.events_by_category {
        if *count >= FREQUENT_CATEGORY_COUNT {
            recommendations.push(format!(
                "High frequency of {category} failures ({count} events). Consider preventive maintenance of {category} systems."
            ));
        }
    }

    if !events.is_empty() {
        let slow = events.iter().filter(|event| event.has_slow_response()).count();
        let share = slow as f64 / events.len() as f64;
        if share > SLOW_RESPONSE_SHARE {
            recommendations.push(format!(
                "Response times are slow: {:.0}% of events had a response lasting over 5 minutes. Review response procedures and crew training.",
                share * 100.0
            ));
        }
    }

    let failed_recoveries = events
        .iter()
        .filter(|event| {
            event
                .recovery
                .as_ref()
                .is_some_and(|recovery| recovery.status == RecoveryStatus::Failed)
        })
        .count();
    if failed_recoveries > 0 {
        recommendations.push(format!(
            "{failed_recoveries} recovery attempt(s) failed. Review recovery procedures and system redundancy."
        ));
    }

    let critical = summary
        .events_by_severity
        .get(&Severity::Critical)
        .copied()
        .unwrap_or(0);
    if critical > 0 {
        recommendations.push(format!(
            "{critical} critical failure(s) occurred in this period. Immediate review required."
        ));
    }

    if recommendations.is_empty() {
        recommendations.push(WITHIN_PARAMETERS.to_owned());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Actor;

    fn failure(id: &str, severity: Severity, category: &str, at: DateTime<Utc>) -> FailureEvent {
        FailureEvent::new(id, "m-1", severity, category, "desc", Actor::Crew).at(at)
    }

    fn period(now: DateTime<Utc>) -> ReportPeriod {
        ReportPeriod::resolve(None, None, now)
    }

    #[test]
    fn window_defaults_to_last_day_and_is_inclusive() {
        let now = Utc::now();
        let window = period(now);
        assert_eq!(window.end, now);
        assert_eq!(window.start, now - Duration::hours(24));
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
    }

    #[test]
    fn empty_window_reports_zero_filled_severities() {
        let now = Utc::now();
        let report = generate_report(&EventStore::new(), "m-1", period(now), now);
        assert_eq!(report.summary.total_events, 0);
        assert_eq!(report.summary.events_by_severity.len(), 4);
        assert!(report.summary.events_by_severity.values().all(|c| *c == 0));
        assert_eq!(report.recommendations, vec![WITHIN_PARAMETERS.to_owned()]);
    }

    #[test]
    fn impact_combines_penalty_and_bonuses() {
        let start = Utc::now();
        let responses = vec![
            ResponseAction::new("r-1", "f-1", Actor::Crew, "reset", true, 1),
            ResponseAction::new("r-2", "f-1", Actor::Crew, "reset", true, 1),
            ResponseAction::new("r-3", "f-1", Actor::Crew, "reset", false, 1),
        ];
        let recovered = RecoveryMetrics::new("f-1", RecoveryStatus::Recovered, start, Some(start));
        assert_eq!(
            resilience_impact(Severity::High, &responses, Some(&recovered)),
            -20 + 10 + 10
        );
        assert_eq!(resilience_impact(Severity::Low, &[], None), -5);
    }

    #[test]
    fn filters_to_window_and_orders_by_time() {
        let now = Utc::now();
        let mut store = EventStore::new();
        store.record_failure(failure("late", Severity::Low, "power", now - Duration::hours(1)));
        store.record_failure(failure("old", Severity::Low, "power", now - Duration::hours(48)));
        store.record_failure(failure("early", Severity::Low, "power", now - Duration::hours(5)));

        let report = generate_report(&store, "m-1", period(now), now);
        let ids: Vec<_> = report.events.iter().map(|e| e.failure.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn recommendations_follow_fixed_order() {
        let now = Utc::now();
        let mut store = EventStore::new();
        for i in 0..3 {
            store.record_failure(failure(
                &format!("nav-{i}"),
                Severity::Critical,
                "navigation",
                now - Duration::minutes(10 + i),
            ));
            store.record_response(ResponseAction::new(
                format!("r-{i}"),
                format!("nav-{i}"),
                Actor::Crew,
                "manual-steer",
                true,
                SLOW_RESPONSE_MS + 1,
            ));
        }
        store.record_recovery(RecoveryMetrics::new(
            "nav-0",
            RecoveryStatus::Failed,
            now - Duration::minutes(5),
            Some(now),
        ));

        let report = generate_report(&store, "m-1", period(now), now);
        assert_eq!(report.recommendations.len(), 4);
        assert!(report.recommendations[0].starts_with("High frequency of navigation failures"));
        assert!(report.recommendations[1].starts_with("Response times are slow"));
        assert!(report.recommendations[2].starts_with("1 recovery attempt(s) failed"));
        assert!(report.recommendations[3].starts_with("3 critical failure(s)"));
        assert_eq!(report.summary.average_response_time_ms, (SLOW_RESPONSE_MS + 1) as f64);
        assert_eq!(report.summary.average_recovery_time_ms, 300_000.0);
    }

    #[test]
    fn slow_share_must_exceed_thirty_percent() {
        let now = Utc::now();
        let mut store = EventStore::new();
        for i in 0..10 {
            store.record_failure(failure(
                &format!("f-{i}"),
                Severity::Low,
                &format!("cat-{i}"),
                now - Duration::minutes(i + 1),
            ));
        }
        for i in 0..3 {
            store.record_response(ResponseAction::new(
                format!("r-{i}"),
                format!("f-{i}"),
                Actor::System,
                "restart",
                true,
                SLOW_RESPONSE_MS + 1,
            ));
        }
        let report = generate_report(&store, "m-1", period(now), now);
        assert_eq!(report.recommendations, vec![WITHIN_PARAMETERS.to_owned()]);
    }
}
