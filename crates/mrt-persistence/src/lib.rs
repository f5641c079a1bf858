//! ---
//! mrt_section: "03-persistence-logging"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Persistence abstractions and storage bindings."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Line-delimited JSON event log. The tracker mirrors every recorded event
//! into it as a write-behind side effect and can rebuild its store from it.

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing log files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// The header line is missing or was written by an unsupported version.
    #[error("invalid event log header: {0}")]
    InvalidHeader(String),
}

pub mod event_log;

pub use event_log::replay as replay_event_log;
pub use event_log::{EventLogEntry, EventLogReader, EventLogWriter, EVENT_LOG_VERSION};
