//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
//! Event-sourced resilience tracking for running missions: failures,
//! responses and recoveries go in; a weighted resilience index, threshold
//! alerts and audit reports come out.

pub mod alerts;
pub mod error;
pub mod export;
pub mod index;
pub mod metrics;
pub mod mirror;
pub mod registry;
pub mod report;
pub mod scoring;
pub mod store;
pub mod tracker;
pub mod types;

pub use alerts::{AlertEvaluator, ResilienceAlert};
pub use error::{Result, TrackerError};
pub use export::{export_report, ExportFormat, CSV_HEADER, PDF_PLACEHOLDER};
pub use index::{IndexCalculator, IndexWeights, WEIGHTS};
pub use metrics::TrackerMetrics;
pub use mirror::{EventLogMirror, EventMirror};
pub use registry::{MirrorFactory, TrackerRegistry};
pub use report::{EventReport, ReportPeriod, ReportSummary, ReportedEvent};
pub use store::{EventStore, StoredRecord};
pub use tracker::MissionTracker;
pub use types::{
    Actor, Effectiveness, FailureEvent, FinalState, MissionResilienceIndex, RecoveryMetrics,
    RecoveryStatus, RecoveryStep, ResilienceComponents, ResilienceTrendPoint, ResponseAction,
    Severity, Trend,
};

/// Crate prelude collecting the types needed to drive a tracker.
pub mod prelude {
    pub use super::export::ExportFormat;
    pub use super::registry::TrackerRegistry;
    pub use super::tracker::MissionTracker;
    pub use super::types::{
        Actor, FailureEvent, MissionResilienceIndex, RecoveryMetrics, RecoveryStatus,
        ResponseAction, Severity,
    };
}
