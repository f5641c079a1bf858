//! ---
//! mrt_section: "03-persistence-logging"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Persistence abstractions and storage bindings."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{PersistenceError, Result};

/// Format version written into the header line.
pub const EVENT_LOG_VERSION: u16 = 1;

/// First line of every log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventLogHeader {
    version: u16,
    created_at: DateTime<Utc>,
    hash: String,
}

impl EventLogHeader {
    fn new() -> Self {
        let created_at = Utc::now();
        let hash = format!("{:x}", Sha256::digest(created_at.to_rfc3339().as_bytes()));
        Self {
            version: EVENT_LOG_VERSION,
            created_at,
            hash,
        }
    }

    fn check(line: &str) -> Result<()> {
        let header: EventLogHeader = serde_json::from_str(line)
            .map_err(|err| PersistenceError::InvalidHeader(err.to_string()))?;
        if header.version != EVENT_LOG_VERSION {
            return Err(PersistenceError::InvalidHeader(format!(
                "unsupported version {}",
                header.version
            )));
        }
        Ok(())
    }
}

/// One mirrored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Sequential identifier assigned when appending (starts at 1).
    pub sequence: u64,
    /// Timestamp when the record was appended.
    pub timestamp: DateTime<Utc>,
    /// Mission the record belongs to.
    pub mission_id: String,
    /// Serialized record.
    pub payload: serde_json::Value,
}

impl EventLogEntry {
    /// Construct an entry; the sequence is assigned on append.
    pub fn new(mission_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            sequence: 0,
            timestamp: Utc::now(),
            mission_id: mission_id.into(),
            payload,
        }
    }
}

/// Append-only writer.
#[derive(Debug)]
pub struct EventLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    next_sequence: u64,
}

impl EventLogWriter {
    /// Open `path` for appending, writing a header when the file is new or empty.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let fresh = !path.exists() || fs::metadata(path)?.len() == 0;
        let last_sequence = if fresh { 0 } else { last_sequence(path)? };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        if fresh {
            serde_json::to_writer(&mut writer, &EventLogHeader::new())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            info!(target: "mrt::persistence", path = %path.display(), "event log created");
        } else {
            debug!(
                target: "mrt::persistence",
                path = %path.display(),
                next_sequence = last_sequence + 1,
                "event log reopened"
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            next_sequence: last_sequence + 1,
        })
    }

    /// Append an entry, returning its sequence number and the bytes written.
    pub fn append(&mut self, mut entry: EventLogEntry) -> Result<(u64, usize)> {
        entry.sequence = self.next_sequence;
        let line = serde_json::to_string(&entry)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.next_sequence += 1;
        Ok((entry.sequence, line.len() + 1))
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn last_sequence(path: &Path) -> Result<u64> {
    let mut last = 0;
    for entry in EventLogReader::open(path)? {
        last = entry?.sequence;
    }
    Ok(last)
}

/// Replay the log in order, invoking `handler` per entry. Returns the entry count.
pub fn replay<F>(path: &Path, mut handler: F) -> Result<usize>
where
    F: FnMut(EventLogEntry) -> Result<()>,
{
    let mut count = 0usize;
    for entry in EventLogReader::open(path)? {
        handler(entry?)?;
        count += 1;
    }
    debug!(target: "mrt::persistence", path = %path.display(), entries = count, "event log replayed");
    Ok(count)
}

/// Streaming iterator over the entries of a log.
pub struct EventLogReader {
    lines: Lines<BufReader<File>>,
}

impl EventLogReader {
    /// Open the log and validate its header.
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            return Err(PersistenceError::InvalidHeader("empty file".into()));
        }
        EventLogHeader::check(header.trim_end())?;
        Ok(Self {
            lines: reader.lines(),
        })
    }
}

impl Iterator for EventLogReader {
    type Item = Result<EventLogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Some(serde_json::from_str(&line).map_err(Into::into)),
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}
