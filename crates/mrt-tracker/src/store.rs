//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{FailureEvent, RecoveryMetrics, ResponseAction};

/// A single record in the form it is mirrored and replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", content = "data", rename_all = "snake_case")]
pub enum StoredRecord {
    Failure(FailureEvent),
    Response(ResponseAction),
    Recovery(RecoveryMetrics),
}

/// Raw events of one mission. Append/replace only; nothing is evicted.
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    failures: IndexMap<String, FailureEvent>,
    responses: HashMap<String, Vec<ResponseAction>>,
    recoveries: HashMap<String, RecoveryMetrics>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a failure. Responses that arrived before it are kept.
    pub fn record_failure(&mut self, event: FailureEvent) {
        self.responses.entry(event.id.clone()).or_default();
        self.failures.insert(event.id.clone(), event);
    }

    /// Append a response to its failure's list, creating the list when absent.
    pub fn record_response(&mut self, response: ResponseAction) {
        self.responses
            .entry(response.failure_event_id.clone())
            .or_default()
            .push(response);
    }

    /// Upsert the recovery record of a failure; last write wins. A missing
    /// duration is derived from the end timestamp.
    pub fn record_recovery(&mut self, metrics: RecoveryMetrics) {
        let metrics = metrics.with_derived_duration();
        self.recoveries
            .insert(metrics.failure_event_id.clone(), metrics);
    }

    pub fn apply(&mut self, record: StoredRecord) {
        match record {
            StoredRecord::Failure(event) => self.record_failure(event),
            StoredRecord::Response(response) => self.record_response(response),
            StoredRecord::Recovery(metrics) => self.record_recovery(metrics),
        }
    }

    pub fn contains_failure(&self, failure_id: &str) -> bool {
        self.failures.contains_key(failure_id)
    }

    pub fn failure(&self, failure_id: &str) -> Option<&FailureEvent> {
        self.failures.get(failure_id)
    }

    /// Failures in recording order.
    pub fn failures(&self) -> impl Iterator<Item = &FailureEvent> {
        self.failures.values()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn responses_for(&self, failure_id: &str) -> &[ResponseAction] {
        self.responses
            .get(failure_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every response ever recorded, including those whose failure is unknown.
    pub fn all_responses(&self) -> impl Iterator<Item = &ResponseAction> {
        self.responses.values().flatten()
    }

    pub fn recovery_for(&self, failure_id: &str) -> Option<&RecoveryMetrics> {
        self.recoveries.get(failure_id)
    }

    pub fn recoveries(&self) -> impl Iterator<Item = &RecoveryMetrics> {
        self.recoveries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.responses.is_empty() && self.recoveries.is_empty()
    }

    pub fn clear(&mut self) {
        self.failures.clear();
        self.responses.clear();
        self.recoveries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Actor, RecoveryStatus, Severity};
    use chrono::Utc;

    fn failure(id: &str) -> FailureEvent {
        FailureEvent::new(id, "m-1", Severity::High, "navigation", "gps loss", Actor::Crew)
    }

    #[test]
    fn early_response_survives_late_failure() {
        let mut store = EventStore::new();
        store.record_response(ResponseAction::new("r-1", "f-1", Actor::Crew, "reset", true, 10));
        store.record_failure(failure("f-1"));
        assert_eq!(store.responses_for("f-1").len(), 1);
        assert_eq!(store.failure_count(), 1);
    }

    #[test]
    fn duplicate_failure_overwrites_in_place() {
        let mut store = EventStore::new();
        store.record_failure(failure("f-1"));
        store.record_failure(failure("f-2"));
        let mut replacement = failure("f-1");
        replacement.category = "propulsion".into();
        store.record_failure(replacement);

        let ids: Vec<_> = store.failures().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f-1", "f-2"]);
        assert_eq!(store.failure("f-1").unwrap().category, "propulsion");
    }

    #[test]
    fn recovery_upsert_keeps_last_write() {
        let mut store = EventStore::new();
        let now = Utc::now();
        store.record_recovery(RecoveryMetrics::new("f-1", RecoveryStatus::Recovering, now, None));
        store.record_recovery(RecoveryMetrics::new(
            "f-1",
            RecoveryStatus::Recovered,
            now,
            Some(now + chrono::Duration::minutes(5)),
        ));
        let recovery = store.recovery_for("f-1").unwrap();
        assert_eq!(recovery.status, RecoveryStatus::Recovered);
        assert_eq!(recovery.recovery_duration_ms, Some(300_000));
        assert_eq!(store.recoveries().count(), 1);
    }

    #[test]
    fn clear_discards_everything() {
        let mut store = EventStore::new();
        store.apply(StoredRecord::Failure(failure("f-1")));
        store.clear();
        assert!(store.is_empty());
        assert!(store.responses_for("f-1").is_empty());
    }

    #[test]
    fn recovery_without_duration_gets_one_from_its_end() {
        let mut store = EventStore::new();
        let start = Utc::now();
        let mut recovery = RecoveryMetrics::new(
            "f-1",
            RecoveryStatus::Recovered,
            start,
            Some(start + chrono::Duration::minutes(90)),
        );
        recovery.recovery_duration_ms = None;
        store.apply(StoredRecord::Recovery(recovery));
        assert_eq!(
            store.recovery_for("f-1").unwrap().recovery_duration_ms,
            Some(5_400_000)
        );

        let mut explicit = RecoveryMetrics::new("f-2", RecoveryStatus::Recovered, start, Some(start));
        explicit.recovery_duration_ms = Some(42);
        store.record_recovery(explicit);
        assert_eq!(store.recovery_for("f-2").unwrap().recovery_duration_ms, Some(42));

        let open = RecoveryMetrics::new("f-3", RecoveryStatus::Recovering, start, None);
        store.record_recovery(open);
        assert_eq!(store.recovery_for("f-3").unwrap().recovery_duration_ms, None);
    }
}
