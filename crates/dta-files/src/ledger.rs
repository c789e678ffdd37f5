//! Ledger rows and row sinks.
//!
//! A file list is a flat sequence of [`LedgerRow`]s in traversal order. The
//! walker never buffers or reorders rows; it hands each one to a [`RowSink`]
//! as soon as it is produced.

use crate::FILE_LIST_HEADERS;
use crate::error::{Result, WalkError};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Literal written in the size column when the size could not be read.
pub const SIZE_ERROR: &str = "ERROR";

/// Uncompressed size of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySize {
    /// Size in bytes
    Bytes(u64),
    /// Size could not be determined
    Error,
}

impl EntrySize {
    /// Size in bytes, if known
    #[must_use]
    pub fn bytes(self) -> Option<u64> {
        match self {
            Self::Bytes(n) => Some(n),
            Self::Error => None,
        }
    }
}

impl fmt::Display for EntrySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(n) => write!(f, "{n}"),
            Self::Error => f.write_str(SIZE_ERROR),
        }
    }
}

impl FromStr for EntrySize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s == SIZE_ERROR {
            return Ok(Self::Error);
        }
        s.parse()
            .map(Self::Bytes)
            .map_err(|_| format!("invalid size: {s:?}"))
    }
}

/// One record of a file list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// Nesting depth, 0 for a selected file
    pub level: u32,
    /// Basename of the immediate containing archive, empty at level 0
    pub container: String,
    /// Normalized filesystem path at level 0, in-archive path below that
    pub full_name: String,
    /// Uncompressed size
    pub size: EntrySize,
    /// Hex digest, error note, or empty
    pub hash: String,
}

impl LedgerRow {
    /// Row for a top-level file
    #[must_use]
    pub fn top_level(full_name: String, size: EntrySize, hash: String) -> Self {
        Self {
            level: 0,
            container: String::new(),
            full_name,
            size,
            hash,
        }
    }

    /// Row for an entry found inside `container`
    #[must_use]
    pub fn entry(level: u32, container: &str, full_name: String, size: u64, hash: String) -> Self {
        Self {
            level,
            container: container.to_string(),
            full_name,
            size: EntrySize::Bytes(size),
            hash,
        }
    }

    /// The five string fields in column order
    #[must_use]
    pub fn fields(&self) -> [String; 5] {
        [
            self.level.to_string(),
            self.container.clone(),
            self.full_name.clone(),
            self.size.to_string(),
            self.hash.clone(),
        ]
    }

    fn from_record(record: &csv::StringRecord) -> Result<Self> {
        if record.len() < 4 {
            return Err(WalkError::InvalidLedger(format!(
                "expected at least 4 fields, found {}",
                record.len()
            )));
        }

        let level = record[0]
            .trim()
            .parse()
            .map_err(|_| WalkError::InvalidLedger(format!("invalid level: {:?}", &record[0])))?;
        let size = record[3].parse().map_err(WalkError::InvalidLedger)?;

        Ok(Self {
            level,
            container: record[1].to_string(),
            full_name: record[2].to_string(),
            size,
            hash: record.get(4).unwrap_or_default().to_string(),
        })
    }
}

/// Destination for ledger rows.
///
/// Implementations receive rows strictly in traversal order and are never
/// called concurrently.
pub trait RowSink {
    /// Append one row
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be stored; the walk aborts.
    fn write_row(&mut self, row: &LedgerRow) -> Result<()>;
}

impl RowSink for Vec<LedgerRow> {
    fn write_row(&mut self, row: &LedgerRow) -> Result<()> {
        self.push(row.clone());
        Ok(())
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn write_row(&mut self, row: &LedgerRow) -> Result<()> {
        (**self).write_row(row)
    }
}

/// Quoted-CSV row sink
pub struct CsvLedgerWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl<W: Write> CsvLedgerWriter<W> {
    /// Create a writer and emit the `Level,Container,FullName,Size,FileHash`
    /// header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn with_header(inner: W) -> Result<Self> {
        let mut ledger = Self::headerless(inner);
        ledger.writer.write_record(FILE_LIST_HEADERS)?;
        Ok(ledger)
    }

    /// Create a writer without a header row
    pub fn headerless(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(inner);
        Self { writer, rows: 0 }
    }

    /// Number of data rows written so far
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Flush buffered rows to the underlying writer
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| WalkError::Io(e.into_error()))
    }
}

impl<W: Write> RowSink for CsvLedgerWriter<W> {
    fn write_row(&mut self, row: &LedgerRow) -> Result<()> {
        self.writer.write_record(row.fields())?;
        self.rows += 1;
        Ok(())
    }
}

/// Parse a file list back into rows.
///
/// Accepts both the headed five-column layout and the older header-less
/// four-column layout (no hash column).
///
/// # Errors
///
/// Returns an error if the CSV is malformed or a row cannot be parsed.
pub fn read_ledger<R: Read>(reader: R) -> Result<Vec<LedgerRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        if index == 0 && is_header(&record) {
            continue;
        }
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(LedgerRow::from_record(&record)?);
    }

    Ok(rows)
}

fn is_header(record: &csv::StringRecord) -> bool {
    record
        .get(0)
        .is_some_and(|first| first.trim().eq_ignore_ascii_case(FILE_LIST_HEADERS[0]))
}
