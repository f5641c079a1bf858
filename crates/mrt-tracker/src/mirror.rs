//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use mrt_persistence::{EventLogEntry, EventLogWriter};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::store::StoredRecord;

/// Write-behind sink for every record a tracker stores.
pub trait EventMirror: Send + Sync {
    fn mirror(&self, mission_id: &str, record: &StoredRecord) -> Result<()>;
}

/// Mirrors records into an append-only JSONL event log.
#[derive(Debug)]
pub struct EventLogMirror {
    path: PathBuf,
    writer: Mutex<EventLogWriter>,
}

impl EventLogMirror {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = EventLogWriter::open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventMirror for EventLogMirror {
    fn mirror(&self, mission_id: &str, record: &StoredRecord) -> Result<()> {
        let payload = serde_json::to_value(record)?;
        let (sequence, bytes) = self
            .writer
            .lock()
            .append(EventLogEntry::new(mission_id, payload))?;
        debug!(
            target: "mrt::mirror",
            mission = mission_id,
            sequence,
            bytes,
            "record mirrored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Actor, FailureEvent, Severity};
    use mrt_persistence::replay_event_log;
    use tempfile::tempdir;

    #[test]
    fn mirrored_records_replay_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alpha.events.jsonl");
        let mirror = EventLogMirror::open(&path).unwrap();

        for id in ["f-1", "f-2"] {
            let event = FailureEvent::new(id, "alpha", Severity::Low, "power", "", Actor::System);
            mirror
                .mirror("alpha", &StoredRecord::Failure(event))
                .unwrap();
        }

        let mut seen = Vec::new();
        let count = replay_event_log(&path, |entry| {
            let record: StoredRecord = serde_json::from_value(entry.payload).unwrap();
            if let StoredRecord::Failure(event) = record {
                seen.push(event.id);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen, vec!["f-1".to_string(), "f-2".to_string()]);
    }
}
