//! Yearly transfer and request logs.
//!
//! Each log is a quoted CSV file that only ever grows: one summary row per
//! transfer (or request), with a header row written when the file is new.

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Column headers of the transfer log
pub const TRANSFER_LOG_HEADERS: [&str; 12] = [
    "Timestamp",
    "Transfer Date",
    "Username",
    "Computer Name",
    "Media Type",
    "Media ID",
    "Transfer Type",
    "Source",
    "Destination",
    "File Count",
    "Total Size",
    "File Log",
];

/// Column headers of the request log
pub const REQUEST_LOG_HEADERS: [&str; 8] = [
    "Timestamp",
    "Request Date",
    "Requestor",
    "Computer Name",
    "Purpose",
    "File Count",
    "Total Size",
    "File Log",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%m/%d/%Y";

/// A row that can be appended to a yearly log
pub trait LogRecord {
    /// Header row written when the log is created
    fn headers() -> &'static [&'static str];

    /// Field values in header order
    fn fields(&self) -> Vec<String>;
}

/// One transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub timestamp: NaiveDateTime,
    pub transfer_date: NaiveDate,
    pub username: String,
    pub computer_name: String,
    pub media_type: String,
    pub media_id: String,
    pub transfer_type: String,
    pub source: String,
    pub destination: String,
    pub file_count: usize,
    pub total_size: u64,
    pub file_log: PathBuf,
}

impl LogRecord for TransferRecord {
    fn headers() -> &'static [&'static str] {
        &TRANSFER_LOG_HEADERS
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.transfer_date.format(DATE_FORMAT).to_string(),
            self.username.clone(),
            self.computer_name.clone(),
            self.media_type.clone(),
            self.media_id.clone(),
            self.transfer_type.clone(),
            self.source.clone(),
            self.destination.clone(),
            self.file_count.to_string(),
            self.total_size.to_string(),
            self.file_log.display().to_string(),
        ]
    }
}

/// One file transfer request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub timestamp: NaiveDateTime,
    pub request_date: NaiveDate,
    pub requestor: String,
    pub computer_name: String,
    pub purpose: String,
    pub file_count: usize,
    pub total_size: u64,
    pub file_log: PathBuf,
}

impl LogRecord for RequestRecord {
    fn headers() -> &'static [&'static str] {
        &REQUEST_LOG_HEADERS
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.request_date.format(DATE_FORMAT).to_string(),
            self.requestor.clone(),
            self.computer_name.clone(),
            self.purpose.clone(),
            self.file_count.to_string(),
            self.total_size.to_string(),
            self.file_log.display().to_string(),
        ]
    }
}

/// Append `record` to the log at `path`, creating the file (with a header
/// row) and its parent directory if needed.
pub fn append_record<R: LogRecord>(path: &Path, record: &R) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(file);
    if is_new {
        writer.write_record(R::headers())?;
    }
    writer.write_record(record.fields())?;
    writer.flush()?;

    tracing::debug!("Appended record to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> TransferRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        TransferRecord {
            timestamp: date.and_hms_opt(14, 3, 9).unwrap(),
            transfer_date: date,
            username: "jdoe".into(),
            computer_name: "WS-01".into(),
            media_type: "DVD".into(),
            media_id: "CN-7".into(),
            transfer_type: "L2H".into(),
            source: "Intranet".into(),
            destination: "IS001".into(),
            file_count: 2,
            total_size: 2048,
            file_log: PathBuf::from("logs/2025/list.csv"),
        }
    }

    #[test]
    fn test_header_written_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sub").join("TransferLog_2025.log");

        append_record(&path, &record()).unwrap();
        append_record(&path, &record()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(r#""Timestamp","Transfer Date","Username""#));
        assert!(lines[1].starts_with(r#""2025-01-31 14:03:09","01/31/2025","jdoe","WS-01","DVD""#));
        assert!(lines[1].ends_with(r#""2","2048","logs/2025/list.csv""#));
        assert_eq!(lines[1], lines[2]);
    }

    #[test]
    fn test_request_record_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let request = RequestRecord {
            timestamp: date.and_hms_opt(8, 0, 0).unwrap(),
            request_date: date,
            requestor: "asmith".into(),
            computer_name: "WS-02".into(),
            purpose: "Quarterly, audit".into(),
            file_count: 1,
            total_size: 10,
            file_log: PathBuf::from("requests/r.csv"),
        };

        let fields = request.fields();
        assert_eq!(fields.len(), REQUEST_LOG_HEADERS.len());
        assert_eq!(fields[1], "12/01/2024");
        assert_eq!(fields[4], "Quarterly, audit");
    }

    #[test]
    fn test_field_count_matches_headers() {
        assert_eq!(record().fields().len(), TransferRecord::headers().len());
    }
}
