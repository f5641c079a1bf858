//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
//! Records ingested by the tracker and the snapshots it derives from them.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a detected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Every severity, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Who detected a failure or initiated a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Crew,
    System,
    Ai,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Crew => "crew",
            Actor::System => "system",
            Actor::Ai => "ai",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator rating of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effectiveness {
    Excellent,
    Good,
    Adequate,
    Poor,
    Failed,
}

/// Where a recovery stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    Recovered,
    Recovering,
    Degraded,
    Failed,
}

impl RecoveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStatus::Recovered => "recovered",
            RecoveryStatus::Recovering => "recovering",
            RecoveryStatus::Degraded => "degraded",
            RecoveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected fault. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    pub id: String,
    pub mission_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub affected_systems: Vec<String>,
    pub detected_by: Actor,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl FailureEvent {
    /// Failure stamped now with no affected systems and an empty context.
    pub fn new(
        id: impl Into<String>,
        mission_id: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
        description: impl Into<String>,
        detected_by: Actor,
    ) -> Self {
        Self {
            id: id.into(),
            mission_id: mission_id.into(),
            timestamp: Utc::now(),
            severity,
            category: category.into(),
            description: description.into(),
            affected_systems: Vec::new(),
            detected_by,
            context: Map::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_affected_systems<I, S>(mut self, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_systems = systems.into_iter().map(Into::into).collect();
        self
    }
}

/// One action taken in reply to a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAction {
    pub id: String,
    pub failure_event_id: String,
    pub timestamp: DateTime<Utc>,
    pub initiated_by: Actor,
    pub action_type: String,
    pub description: String,
    pub success: bool,
    pub duration_ms: u64,
    pub effectiveness: Effectiveness,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ResponseAction {
    /// Response stamped now; effectiveness follows the success flag.
    pub fn new(
        id: impl Into<String>,
        failure_event_id: impl Into<String>,
        initiated_by: Actor,
        action_type: impl Into<String>,
        success: bool,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            failure_event_id: failure_event_id.into(),
            timestamp: Utc::now(),
            initiated_by,
            action_type: action_type.into(),
            description: String::new(),
            success,
            duration_ms,
            effectiveness: if success {
                Effectiveness::Good
            } else {
                Effectiveness::Poor
            },
            notes: None,
        }
    }
}

/// Named sub-step of a recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStep {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
}

/// Condition of the affected systems once the recovery settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalState {
    /// 0..=1
    pub system_health: f64,
    /// 0..=1
    pub operational_capacity: f64,
    #[serde(default)]
    pub notes: String,
}

impl Default for FinalState {
    fn default() -> Self {
        Self {
            system_health: 1.0,
            operational_capacity: 1.0,
            notes: String::new(),
        }
    }
}

/// How and whether a failure's effects were reversed. At most one per failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    pub failure_event_id: String,
    pub recovery_start: DateTime<Utc>,
    #[serde(default)]
    pub recovery_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recovery_duration_ms: Option<u64>,
    pub status: RecoveryStatus,
    #[serde(default)]
    pub steps: Vec<RecoveryStep>,
    #[serde(default)]
    pub final_state: FinalState,
}

impl RecoveryMetrics {
    /// Recovery started at `start`; when `end` is given the duration is derived from it.
    pub fn new(
        failure_event_id: impl Into<String>,
        status: RecoveryStatus,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            failure_event_id: failure_event_id.into(),
            recovery_start: start,
            recovery_end: end,
            recovery_duration_ms: None,
            status,
            steps: Vec::new(),
            final_state: FinalState::default(),
        }
        .with_derived_duration()
    }

    /// Fill a missing duration from `recovery_end - recovery_start`, clamped at zero.
    /// An explicit duration is kept as given.
    pub fn with_derived_duration(mut self) -> Self {
        if self.recovery_duration_ms.is_none() {
            self.recovery_duration_ms = self
                .recovery_end
                .map(|end| (end - self.recovery_start).num_milliseconds().max(0) as u64);
        }
        self
    }
}

/// Five 0-100 sub-scores of the resilience index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResilienceComponents {
    pub failure_prevention: f64,
    pub response_effectiveness: f64,
    pub recovery_speed: f64,
    pub system_redundancy: f64,
    pub crew_readiness: f64,
}

impl ResilienceComponents {
    /// `(label, value)` pairs in a fixed order, for metrics and display.
    pub fn labelled(&self) -> [(&'static str, f64); 5] {
        [
            ("failure_prevention", self.failure_prevention),
            ("response_effectiveness", self.response_effectiveness),
            ("recovery_speed", self.recovery_speed),
            ("system_redundancy", self.system_redundancy),
            ("crew_readiness", self.crew_readiness),
        ]
    }
}

/// Direction of the index relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time resilience snapshot of a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionResilienceIndex {
    pub mission_id: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
    pub components: ResilienceComponents,
    pub trend: Trend,
    pub trend_percentage: f64,
    pub total_failures: usize,
    pub critical_failures: usize,
    pub average_recovery_time_ms: f64,
    pub successful_recoveries: usize,
    pub failed_recoveries: usize,
}

/// Lightweight history sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResilienceTrendPoint {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub event_count: usize,
    /// Recovered failures divided by recorded failures.
    pub recovery_rate: f64,
}
