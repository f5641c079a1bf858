//! ---
//! mrt_section: "02-messaging-ipc-data-model"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Notification bus message shapes and in-process transport."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::Result;

/// Schema version broadcast alongside every message payload.
pub const SCHEMA_VERSION: u16 = 1;

/// Direction-tagged payload carried on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MessagePayload {
    /// Upstream notification consumed by trackers.
    Inbound(InboundEvent),
    /// Announcement emitted by a tracker.
    Outbound(OutboundEvent),
}

/// Unified message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for deduplication and tracing.
    pub id: Uuid,
    /// Version of the schema used by the payload.
    pub schema_version: u16,
    /// Timestamp when the message was created.
    pub timestamp: DateTime<Utc>,
    /// Actual payload carried by the message.
    pub payload: MessagePayload,
}

impl Message {
    /// Wrap `payload` in a fresh envelope.
    pub fn new(payload: MessagePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema_version: SCHEMA_VERSION,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Payload direction as a static label.
    pub fn kind(&self) -> &'static str {
        match &self.payload {
            MessagePayload::Inbound(_) => "inbound",
            MessagePayload::Outbound(_) => "outbound",
        }
    }

    /// Borrow the inbound event, if this message carries one.
    pub fn as_inbound(&self) -> Option<&InboundEvent> {
        match &self.payload {
            MessagePayload::Inbound(event) => Some(event),
            MessagePayload::Outbound(_) => None,
        }
    }

    /// Borrow the outbound event, if this message carries one.
    pub fn as_outbound(&self) -> Option<&OutboundEvent> {
        match &self.payload {
            MessagePayload::Outbound(event) => Some(event),
            MessagePayload::Inbound(_) => None,
        }
    }
}

/// Upstream notifications the tracker knows how to consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InboundEvent {
    /// The situational-awareness analysis finished and published its state.
    #[serde(rename = "situational-awareness-analysis-complete")]
    SituationalAwarenessComplete(SituationalAwarenessState),
    /// A tactical response finished executing.
    #[serde(rename = "tactical-response-execution-complete")]
    TacticalResponseComplete(TacticalExecution),
}

impl InboundEvent {
    /// Wire label of the event kind.
    pub fn label(&self) -> &'static str {
        match self {
            InboundEvent::SituationalAwarenessComplete(_) => {
                "situational-awareness-analysis-complete"
            }
            InboundEvent::TacticalResponseComplete(_) => "tactical-response-execution-complete",
        }
    }

    /// Mission the event is scoped to; `None` means broadcast to all missions.
    pub fn mission_id(&self) -> Option<&str> {
        match self {
            InboundEvent::SituationalAwarenessComplete(state) => state.mission_id.as_deref(),
            InboundEvent::TacticalResponseComplete(execution) => execution.mission_id.as_deref(),
        }
    }

    /// Parse one JSON line of an inbound feed.
    pub fn from_json_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

/// State published by the situational-awareness analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SituationalAwarenessState {
    /// Mission the analysis ran for.
    #[serde(default)]
    pub mission_id: Option<String>,
    /// Alerts currently raised by the analysis.
    #[serde(default)]
    pub active_alerts: Vec<ActiveAlert>,
}

/// One alert raised by the situational-awareness analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAlert {
    /// Alert identifier, reused as the failure identifier once converted.
    pub id: String,
    /// Upstream severity label (`critical`, `high`, `medium`, `low`, ...).
    pub severity: String,
    /// Human readable summary.
    #[serde(default)]
    pub description: String,
    /// Systems the alert concerns.
    #[serde(default)]
    pub affected_systems: Vec<String>,
    /// When the alert was raised; defaults to reception time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Completion status of a tactical response execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Execution finished and achieved its goal.
    Success,
    /// Execution finished without achieving its goal.
    Failed,
    /// Execution is still running.
    Pending,
    /// Any status this schema version does not know about.
    #[serde(other)]
    Unknown,
}

/// Result of a tactical response execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalExecution {
    /// Mission the execution belongs to.
    #[serde(default)]
    pub mission_id: Option<String>,
    /// Failure the response was executed for.
    pub failure_event_id: String,
    /// Execution identifier, reused as the response identifier.
    #[serde(default)]
    pub execution_id: Option<String>,
    /// Completion status.
    pub status: ExecutionStatus,
    /// Action tag, e.g. `reroute` or `isolate`.
    #[serde(default)]
    pub action_type: String,
    /// Human readable summary.
    #[serde(default)]
    pub description: String,
    /// Wall-clock execution time in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
    /// Free-form operator notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Announcements a tracker emits after it changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutboundKind {
    /// Tracker finished initialisation.
    Initialized,
    /// A failure was stored.
    FailureRecorded,
    /// A response was stored.
    ResponseRecorded,
    /// A recovery record was stored.
    RecoveryRecorded,
    /// A recovery took longer than the configured maximum.
    RecoveryThresholdExceeded,
    /// The resilience index was recomputed.
    IndexUpdated,
    /// The index moved by more than the critical-drop threshold.
    CriticalDropAlert,
    /// The index fell below the minimum acceptable score.
    LowScoreAlert,
    /// An event report was produced.
    ReportGenerated,
    /// The tracker discarded its state.
    Cleanup,
}

impl OutboundKind {
    /// Wire label of the announcement.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundKind::Initialized => "initialized",
            OutboundKind::FailureRecorded => "failure-recorded",
            OutboundKind::ResponseRecorded => "response-recorded",
            OutboundKind::RecoveryRecorded => "recovery-recorded",
            OutboundKind::RecoveryThresholdExceeded => "recovery-threshold-exceeded",
            OutboundKind::IndexUpdated => "index-updated",
            OutboundKind::CriticalDropAlert => "critical-drop-alert",
            OutboundKind::LowScoreAlert => "low-score-alert",
            OutboundKind::ReportGenerated => "report-generated",
            OutboundKind::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for OutboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Announcement emitted by a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Mission the announcement concerns.
    pub mission_id: String,
    /// When the announced change happened.
    pub timestamp: DateTime<Utc>,
    /// Announcement kind.
    pub kind: OutboundKind,
    /// Kind specific details.
    #[serde(default)]
    pub details: JsonValue,
}

impl OutboundEvent {
    /// Construct an announcement stamped with the current time.
    pub fn new(mission_id: impl Into<String>, kind: OutboundKind, details: JsonValue) -> Self {
        Self {
            mission_id: mission_id.into(),
            timestamp: Utc::now(),
            kind,
            details,
        }
    }
}
