//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use csv::{QuoteStyle, WriterBuilder};
use tracing::warn;

use crate::error::{Result, TrackerError};
use crate::report::EventReport;

/// Returned for PDF exports, which have no document layout yet.
pub const PDF_PLACEHOLDER: &str = "PDF export not implemented";

pub const CSV_HEADER: [&str; 8] = [
    "Timestamp",
    "Category",
    "Severity",
    "Description",
    "Response Count",
    "Recovery Status",
    "Recovery Duration (ms)",
    "Resilience Impact",
];

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(TrackerError::UnsupportedFormat(s.to_owned())),
        }
    }
}

/// Encode `report` in `format`.
pub fn export_report(report: &EventReport, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ExportFormat::Csv => export_csv(report),
        ExportFormat::Pdf => {
            warn!(target: "mrt::export", report = %report.id, "pdf export requested; returning placeholder");
            Ok(PDF_PLACEHOLDER.to_owned())
        }
    }
}

/// Header plus one row per reported event. Text fields are always quoted.
fn export_csv(report: &EventReport) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for event in &report.events {
        let failure = &event.failure;
        let (status, duration) = match &event.recovery {
            Some(recovery) => (
                recovery.status.to_string(),
                recovery
                    .recovery_duration_ms
                    .map(|ms| ms.to_string())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
            ),
            None => (NOT_AVAILABLE.to_owned(), NOT_AVAILABLE.to_owned()),
        };
        writer.write_record([
            failure.timestamp.to_rfc3339(),
            failure.category.clone(),
            failure.severity.to_string(),
            failure.description.clone(),
            event.responses.len().to_string(),
            status,
            duration,
            event.resilience_impact.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| TrackerError::Io(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{generate_report, ReportPeriod};
    use crate::store::EventStore;
    use crate::types::{
        Actor, FailureEvent, RecoveryMetrics, RecoveryStatus, ResponseAction, Severity,
    };
    use chrono::{Duration, Utc};

    fn sample_report() -> EventReport {
        let now = Utc::now();
        let mut store = EventStore::new();
        store.record_failure(
            FailureEvent::new(
                "f-1",
                "m-1",
                Severity::High,
                "engine",
                "Oil pressure low, \"port\" side",
                Actor::System,
            )
            .at(now - Duration::hours(2)),
        );
        store.record_failure(
            FailureEvent::new("f-2", "m-1", Severity::Low, "comms", "VHF static", Actor::Crew)
                .at(now - Duration::hours(1)),
        );
        store.record_response(ResponseAction::new("r-1", "f-1", Actor::Crew, "throttle", true, 1));
        store.record_recovery(RecoveryMetrics::new(
            "f-1",
            RecoveryStatus::Recovered,
            now - Duration::minutes(90),
            Some(now - Duration::minutes(60)),
        ));
        generate_report(&store, "m-1", ReportPeriod::resolve(None, None, now), now)
    }

    #[test]
    fn parses_known_formats_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(TrackerError::UnsupportedFormat(format)) if format == "xml"
        ));
    }

    #[test]
    fn csv_has_header_and_one_row_per_event() {
        let report = sample_report();
        let csv = export_report(&report, ExportFormat::Csv).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(header, CSV_HEADER.to_vec());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        assert_eq!(&rows[0][1], "engine");
        assert_eq!(&rows[0][3], "Oil pressure low, \"port\" side");
        assert_eq!(&rows[0][4], "1");
        assert_eq!(&rows[0][5], "recovered");
        assert_eq!(&rows[0][6], "1800000");
        assert_eq!(&rows[0][7], "-5");
        assert_eq!(&rows[1][5], "N/A");
        assert_eq!(&rows[1][6], "N/A");
        assert!(csv.contains("\"VHF static\""));
    }

    #[test]
    fn json_export_is_full_structure() {
        let report = sample_report();
        let json = export_report(&report, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["events"].as_array().unwrap().len(), 2);
        assert_eq!(value["summary"]["events_by_severity"]["high"], 1);
        assert_eq!(value["summary"]["events_by_severity"]["critical"], 0);
        assert_eq!(value["mission_id"], "m-1");
    }

    #[test]
    fn pdf_keeps_placeholder_contract() {
        let report = sample_report();
        assert_eq!(
            export_report(&report, ExportFormat::Pdf).unwrap(),
            PDF_PLACEHOLDER
        );
    }
}
