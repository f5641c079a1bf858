//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors surfaced by tracker operations. Sparse or empty data never
/// produces one of these; only structurally invalid calls do.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid tracker configuration: {0}")]
    InvalidConfig(String),
    #[error("missing required identifier: {0}")]
    MissingIdentifier(&'static str),
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("export produced invalid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("event log error: {0}")]
    Persistence(#[from] mrt_persistence::PersistenceError),
}
