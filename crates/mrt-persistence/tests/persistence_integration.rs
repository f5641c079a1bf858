//! ---
//! mrt_section: "03-persistence-logging"
//! mrt_subsection: "tests"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Persistence abstractions and storage bindings."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use mrt_persistence::{replay_event_log, EventLogEntry, EventLogWriter};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn replay_yields_entries_in_append_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut writer = EventLogWriter::open(&path).unwrap();
    for (mission, value) in [("m-a", 1), ("m-b", 2), ("m-a", 3)] {
        writer
            .append(EventLogEntry::new(mission, json!({ "value": value })))
            .unwrap();
    }

    let mut seen = Vec::new();
    let count = replay_event_log(&path, |entry| {
        seen.push((entry.mission_id, entry.payload["value"].as_i64().unwrap()));
        Ok(())
    })
    .unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        seen,
        vec![("m-a".to_owned(), 1), ("m-b".to_owned(), 2), ("m-a".to_owned(), 3)]
    );
}
