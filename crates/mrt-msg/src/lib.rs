//! ---
//! mrt_section: "02-messaging-ipc-data-model"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Notification bus message shapes and in-process transport."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Message shapes exchanged between the resilience tracker and the rest of
//! the fleet platform, plus the in-process broadcast bus carrying them.

pub mod bus;
pub mod types;

/// Shared result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Errors raised by the messaging layer.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// Wrapper for JSON serialization or deserialization problems.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub use bus::{BusMetrics, MessageBus};
pub use types::{
    ActiveAlert, ExecutionStatus, InboundEvent, Message, MessagePayload, OutboundEvent,
    OutboundKind, SituationalAwarenessState, TacticalExecution, SCHEMA_VERSION,
};
