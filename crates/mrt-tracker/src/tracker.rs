//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
//! Per-mission facade. Every mutation takes the state lock, applies the
//! record, rescores and releases the lock before anything is announced.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use mrt_common::TrackerConfig;
use mrt_msg::{
    ActiveAlert, ExecutionStatus, InboundEvent, MessageBus, OutboundEvent, OutboundKind,
    SituationalAwarenessState, TacticalExecution,
};
use mrt_persistence::replay_event_log;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alerts::{AlertEvaluator, ResilienceAlert};
use crate::error::{Result, TrackerError};
use crate::export::{self, ExportFormat};
use crate::index::IndexCalculator;
use crate::metrics::TrackerMetrics;
use crate::mirror::EventMirror;
use crate::registry::TrackerMap;
use crate::report::{self, EventReport, ReportPeriod};
use crate::store::{EventStore, StoredRecord};
use crate::types::{
    Actor, FailureEvent, MissionResilienceIndex, RecoveryMetrics, ResilienceTrendPoint,
    ResponseAction, Severity,
};

const COMPONENT_LABELS: [&str; 5] = [
    "failure_prevention",
    "response_effectiveness",
    "recovery_speed",
    "system_redundancy",
    "crew_readiness",
];

const UNKNOWN_CATEGORY: &str = "unknown";
const DEFAULT_TACTICAL_ACTION: &str = "tactical-response";

struct TrackerState {
    store: EventStore,
    calculator: IndexCalculator,
}

struct TrackerCore {
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    evaluator: AlertEvaluator,
    bus: Option<MessageBus>,
    metrics: Option<TrackerMetrics>,
    mirror: Option<Arc<dyn EventMirror>>,
}

#[derive(Default)]
struct Lifecycle {
    shutdown: Option<broadcast::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Resilience tracker of one mission.
pub struct MissionTracker {
    core: Arc<TrackerCore>,
    lifecycle: Mutex<Lifecycle>,
    registry: Option<Weak<TrackerMap>>,
}

impl std::fmt::Debug for MissionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionTracker")
            .field("mission_id", &self.core.config.mission_id)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl MissionTracker {
    /// Build a tracker. Fails fast on an invalid configuration; collaborators are optional.
    pub fn new(
        config: TrackerConfig,
        bus: Option<MessageBus>,
        metrics: Option<TrackerMetrics>,
        mirror: Option<Arc<dyn EventMirror>>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|err| TrackerError::InvalidConfig(err.to_string()))?;
        let state = TrackerState {
            store: EventStore::new(),
            calculator: IndexCalculator::new(config.mission_id.clone(), config.history),
        };
        let evaluator = AlertEvaluator::new(config.alert_thresholds.clone());
        Ok(Self {
            core: Arc::new(TrackerCore {
                config,
                state: Mutex::new(state),
                evaluator,
                bus,
                metrics,
                mirror,
            }),
            lifecycle: Mutex::new(Lifecycle::default()),
            registry: None,
        })
    }

    pub(crate) fn registered_in(mut self, registry: Weak<TrackerMap>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Drop this instance's registry entry; a newer tracker under the same id is left alone.
    fn deregister(&self) {
        let Some(trackers) = self.registry.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let mut trackers = trackers.lock();
        let is_self = trackers
            .get(self.mission_id())
            .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(entry), self));
        if is_self {
            trackers.remove(self.mission_id());
        }
    }

    /// Tracker without bus, metrics or mirror.
    pub fn standalone(config: TrackerConfig) -> Result<Self> {
        Self::new(config, None, None, None)
    }

    pub fn mission_id(&self) -> &str {
        &self.core.config.mission_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.core.config
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle.lock().shutdown.is_some()
    }

    /// Subscribe to the enabled integrations, score once, start the drift
    /// timer and announce `initialized`. A second call is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.shutdown.is_some() {
            debug!(target: "mrt::tracker", mission = %self.mission_id(), "tracker already initialized");
            return Ok(());
        }
        let (shutdown_tx, _) = broadcast::channel(1);
        let config = &self.core.config;

        if let Some(bus) = self.core.bus.as_ref().filter(|_| config.integrations.any()) {
            // Subscribe before returning so nothing published afterwards is missed.
            let receiver = bus.subscribe_inbound();
            let task = spawn_subscription(self.core.clone(), receiver, shutdown_tx.subscribe());
            lifecycle.tasks.push(task);
        }

        self.core.refresh(Utc::now());

        if config.enable_real_time_tracking {
            let task = spawn_drift_timer(self.core.clone(), shutdown_tx.subscribe());
            lifecycle.tasks.push(task);
        }
        lifecycle.shutdown = Some(shutdown_tx);
        drop(lifecycle);

        info!(
            target: "mrt::tracker",
            mission = %config.mission_id,
            real_time = config.enable_real_time_tracking,
            interval_ms = config.report_generation_interval.as_millis() as u64,
            "mission tracker initialized"
        );
        self.core.announce(
            OutboundKind::Initialized,
            json!({
                "real_time_tracking": config.enable_real_time_tracking,
                "report_generation_interval_ms": config.report_generation_interval.as_millis() as u64,
                "situational_awareness": config.integrations.situational_awareness,
                "tactical_response": config.integrations.tactical_response,
            }),
        );
        Ok(())
    }

    /// Leave the owning registry, stop both background tasks (awaited),
    /// discard all state and announce `cleanup`.
    pub async fn cleanup(&self) {
        self.deregister();
        let (shutdown, tasks) = {
            let mut lifecycle = self.lifecycle.lock();
            (
                lifecycle.shutdown.take(),
                std::mem::take(&mut lifecycle.tasks),
            )
        };
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }
        for task in tasks {
            if let Err(err) = task.await {
                warn!(target: "mrt::tracker", mission = %self.mission_id(), error = %err, "tracker task ended abnormally");
            }
        }

        {
            let mut state = self.core.state.lock();
            state.store.clear();
            state.calculator.reset();
        }
        if let Some(metrics) = &self.core.metrics {
            metrics.forget_mission(self.mission_id(), &COMPONENT_LABELS);
        }
        info!(target: "mrt::tracker", mission = %self.mission_id(), "mission tracker cleaned up");
        self.core.announce(OutboundKind::Cleanup, json!({}));
    }

    /// Store a failure (a duplicate id overwrites) and rescore.
    pub fn record_failure(&self, mut event: FailureEvent) -> Result<MissionResilienceIndex> {
        if event.id.trim().is_empty() {
            return Err(TrackerError::MissingIdentifier("failure event id"));
        }
        if event.mission_id.is_empty() {
            event.mission_id = self.mission_id().to_string();
        }
        Ok(self.core.commit(StoredRecord::Failure(event)))
    }

    /// Append a response to its failure and rescore. The failure need not exist yet.
    pub fn record_response(&self, response: ResponseAction) -> Result<MissionResilienceIndex> {
        if response.failure_event_id.trim().is_empty() {
            return Err(TrackerError::MissingIdentifier("failure_event_id"));
        }
        Ok(self.core.commit(StoredRecord::Response(response)))
    }

    /// Upsert the recovery of a failure and rescore.
    pub fn record_recovery(&self, metrics: RecoveryMetrics) -> Result<MissionResilienceIndex> {
        if metrics.failure_event_id.trim().is_empty() {
            return Err(TrackerError::MissingIdentifier("failure_event_id"));
        }
        Ok(self
            .core
            .commit(StoredRecord::Recovery(metrics.with_derived_duration())))
    }

    /// Rescore now, append a trend point and evaluate alerts.
    pub fn calculate_resilience_index(&self) -> MissionResilienceIndex {
        self.core.refresh(Utc::now())
    }

    pub fn current_index(&self) -> Option<MissionResilienceIndex> {
        self.core.state.lock().calculator.current().cloned()
    }

    pub fn history(&self) -> Vec<ResilienceTrendPoint> {
        self.core.state.lock().calculator.history().cloned().collect()
    }

    pub fn failure_count(&self) -> usize {
        self.core.state.lock().store.failure_count()
    }

    pub fn responses_for(&self, failure_event_id: &str) -> Vec<ResponseAction> {
        self.core
            .state
            .lock()
            .store
            .responses_for(failure_event_id)
            .to_vec()
    }

    pub fn recovery_for(&self, failure_event_id: &str) -> Option<RecoveryMetrics> {
        self.core
            .state
            .lock()
            .store
            .recovery_for(failure_event_id)
            .cloned()
    }

    /// Report over `[start, end]`; defaults to the last 24 hours.
    pub fn generate_report(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> EventReport {
        let now = Utc::now();
        let period = ReportPeriod::resolve(start, end, now);
        let report = {
            let state = self.core.state.lock();
            report::generate_report(&state.store, self.mission_id(), period, now)
        };
        info!(
            target: "mrt::report",
            mission = %self.mission_id(),
            report_id = %report.id,
            events = report.summary.total_events,
            "event report generated"
        );
        if let Some(metrics) = &self.core.metrics {
            metrics.inc_report(self.mission_id());
        }
        self.core.announce(
            OutboundKind::ReportGenerated,
            json!({
                "report_id": report.id,
                "total_events": report.summary.total_events,
                "period_start": report.period.start,
                "period_end": report.period.end,
            }),
        );
        report
    }

    /// Encode a report; `format` is one of `json`, `csv`, `pdf`.
    pub fn export_report(&self, report: &EventReport, format: &str) -> Result<String> {
        let format = ExportFormat::from_str(format)?;
        export::export_report(report, format)
    }

    /// Apply one inbound notification. Returns how many records were stored.
    pub fn handle_inbound(&self, event: &InboundEvent) -> usize {
        self.core.handle_inbound(event)
    }

    /// Rebuild the store from an event log, skipping entries of other missions.
    /// Replayed records are neither mirrored again nor announced.
    pub fn replay_from_log(&self, path: &Path) -> Result<MissionResilienceIndex> {
        let mission_id = self.mission_id().to_string();
        let mut applied = 0usize;
        let mut skipped = 0usize;
        {
            let mut state = self.core.state.lock();
            replay_event_log(path, |entry| {
                if entry.mission_id != mission_id {
                    skipped += 1;
                    return Ok(());
                }
                let record: StoredRecord = serde_json::from_value(entry.payload)?;
                state.store.apply(record);
                applied += 1;
                Ok(())
            })?;
        }
        info!(
            target: "mrt::tracker",
            mission = %mission_id,
            path = %path.display(),
            applied,
            skipped,
            "event log replayed"
        );
        Ok(self.core.refresh(Utc::now()))
    }
}

impl TrackerCore {
    fn mission_id(&self) -> &str {
        &self.config.mission_id
    }

    fn announce(&self, kind: OutboundKind, details: Value) {
        if let Some(bus) = &self.bus {
            bus.announce(OutboundEvent::new(self.mission_id(), kind, details));
        }
    }

    fn commit(&self, record: StoredRecord) -> MissionResilienceIndex {
        {
            let mut state = self.state.lock();
            state.store.apply(record.clone());
        }

        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.mirror(self.mission_id(), &record) {
                warn!(target: "mrt::tracker", mission = %self.mission_id(), error = %err, "failed to mirror record");
            }
        }

        let (kind, label, details) = match &record {
            StoredRecord::Failure(event) => (
                OutboundKind::FailureRecorded,
                "failure",
                json!({
                    "failure_event_id": event.id,
                    "severity": event.severity,
                    "category": event.category,
                }),
            ),
            StoredRecord::Response(response) => (
                OutboundKind::ResponseRecorded,
                "response",
                json!({
                    "response_id": response.id,
                    "failure_event_id": response.failure_event_id,
                    "success": response.success,
                }),
            ),
            StoredRecord::Recovery(metrics) => (
                OutboundKind::RecoveryRecorded,
                "recovery",
                json!({
                    "failure_event_id": metrics.failure_event_id,
                    "status": metrics.status,
                    "recovery_duration_ms": metrics.recovery_duration_ms,
                }),
            ),
        };
        debug!(target: "mrt::tracker", mission = %self.mission_id(), kind = label, "record stored");
        if let Some(metrics) = &self.metrics {
            metrics.inc_recorded(self.mission_id(), label);
        }
        self.announce(kind, details);

        if let StoredRecord::Recovery(metrics) = &record {
            if let Some(alert) = self.evaluator.check_recovery(metrics) {
                self.raise(alert);
            }
        }

        self.refresh(Utc::now())
    }

    fn refresh(&self, now: DateTime<Utc>) -> MissionResilienceIndex {
        let index = {
            let mut state = self.state.lock();
            let TrackerState { store, calculator } = &mut *state;
            calculator.calculate(store, now)
        };
        if let Some(metrics) = &self.metrics {
            metrics.observe_index(&index);
        }
        debug!(
            target: "mrt::tracker",
            mission = %self.mission_id(),
            score = index.overall_score,
            trend = %index.trend,
            "resilience index updated"
        );
        self.announce(
            OutboundKind::IndexUpdated,
            json!({
                "overall_score": index.overall_score,
                "trend": index.trend,
                "trend_percentage": index.trend_percentage,
                "components": index.components,
            }),
        );
        for alert in self.evaluator.evaluate(&index) {
            self.raise(alert);
        }
        index
    }

    fn raise(&self, alert: ResilienceAlert) {
        warn!(
            target: "mrt::alerts",
            mission = %self.mission_id(),
            alert = alert.label(),
            details = %alert.details(),
            "resilience alert"
        );
        if let Some(metrics) = &self.metrics {
            metrics.inc_alert(self.mission_id(), alert.label());
        }
        self.announce(alert.kind(), alert.details());
    }

    fn handle_inbound(&self, event: &InboundEvent) -> usize {
        if let Some(target) = event.mission_id() {
            if target != self.mission_id() {
                return 0;
            }
        }
        let integrations = &self.config.integrations;
        match event {
            InboundEvent::SituationalAwarenessComplete(state) => {
                if !integrations.situational_awareness {
                    return 0;
                }
                self.ingest_awareness(state)
            }
            InboundEvent::TacticalResponseComplete(execution) => {
                if !integrations.tactical_response {
                    return 0;
                }
                usize::from(self.ingest_execution(execution))
            }
        }
    }

    fn ingest_awareness(&self, state: &SituationalAwarenessState) -> usize {
        let now = Utc::now();
        let failures: Vec<FailureEvent> = state
            .active_alerts
            .iter()
            .filter_map(|alert| failure_from_alert(self.mission_id(), alert, now))
            .collect();
        let count = failures.len();
        for failure in failures {
            self.commit(StoredRecord::Failure(failure));
        }
        count
    }

    fn ingest_execution(&self, execution: &TacticalExecution) -> bool {
        let Some(response) = response_from_execution(execution, Utc::now()) else {
            return false;
        };
        if !self.state.lock().store.contains_failure(&response.failure_event_id) {
            debug!(
                target: "mrt::tracker",
                mission = %self.mission_id(),
                failure_event_id = %response.failure_event_id,
                "dropping tactical response for unknown failure"
            );
            return false;
        }
        self.commit(StoredRecord::Response(response));
        true
    }
}

/// Critical and high alerts become failures keyed by the alert id.
fn failure_from_alert(
    mission_id: &str,
    alert: &ActiveAlert,
    now: DateTime<Utc>,
) -> Option<FailureEvent> {
    if alert.id.trim().is_empty() {
        return None;
    }
    let severity = Severity::from_str(&alert.severity).ok()?;
    if !matches!(severity, Severity::Critical | Severity::High) {
        return None;
    }
    let category = alert
        .affected_systems
        .first()
        .cloned()
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
    let mut context = Map::new();
    context.insert("source".into(), json!("situational-awareness"));
    context.insert("alert_id".into(), json!(alert.id));
    let mut failure = FailureEvent::new(
        alert.id.clone(),
        mission_id,
        severity,
        category,
        alert.description.clone(),
        Actor::Ai,
    )
    .at(alert.timestamp.unwrap_or(now))
    .with_affected_systems(alert.affected_systems.iter().cloned());
    failure.context = context;
    Some(failure)
}

/// Finished executions become responses; pending or unknown ones are ignored.
fn response_from_execution(
    execution: &TacticalExecution,
    now: DateTime<Utc>,
) -> Option<ResponseAction> {
    let success = match execution.status {
        ExecutionStatus::Success => true,
        ExecutionStatus::Failed => false,
        ExecutionStatus::Pending | ExecutionStatus::Unknown => return None,
    };
    if execution.failure_event_id.trim().is_empty() {
        return None;
    }
    let id = execution
        .execution_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let action_type = if execution.action_type.is_empty() {
        DEFAULT_TACTICAL_ACTION
    } else {
        execution.action_type.as_str()
    };
    let mut response = ResponseAction::new(
        id,
        execution.failure_event_id.clone(),
        Actor::Ai,
        action_type,
        success,
        execution.duration_ms,
    );
    response.timestamp = now;
    response.description = execution.description.clone();
    response.notes = execution.notes.clone();
    Some(response)
}

fn spawn_subscription(
    core: Arc<TrackerCore>,
    mut receiver: broadcast::Receiver<mrt_msg::Message>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(target: "mrt::tracker", mission = %core.mission_id(), "subscription shutdown");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(message) => {
                        if let Some(event) = message.as_inbound() {
                            let stored = core.handle_inbound(event);
                            debug!(
                                target: "mrt::tracker",
                                mission = %core.mission_id(),
                                event = event.label(),
                                stored,
                                "inbound event handled"
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(target: "mrt::tracker", mission = %core.mission_id(), skipped, "subscription lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    })
}

fn spawn_drift_timer(
    core: Arc<TrackerCore>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let period = core.config.report_generation_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(target: "mrt::tracker", mission = %core.mission_id(), "drift timer shutdown");
                    break;
                }
                _ = ticker.tick() => {
                    core.refresh(Utc::now());
                }
            }
        }
    })
}
