//! ---
//! mrt_section: "01-core-functionality"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Shared primitives for the mission resilience runtime."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
//! Shared primitives for the mission resilience workspace.
//! This crate exposes configuration loading and logging setup consumed by
//! the tracker library and the `mrtd` daemon.

pub mod config;
pub mod logging;

pub use config::{
    AlertThresholds, AppConfig, HistoryLimits, IntegrationToggles, LoadedAppConfig, LoggingConfig,
    MetricsConfig, PersistenceConfig, TrackerConfig,
};
pub use logging::{init_tracing, LogFormat};
