//! File-list driver.
//!
//! Walks every top-level file in order, reports progress after each one and
//! writes the resulting rows as a quoted CSV ledger. A canceled or failed run
//! never leaves a partial file list behind.

use crate::error::{Result, WalkError};
use crate::percent;
use crate::ledger::{CsvLedgerWriter, LedgerRow, RowSink};
use crate::walker::{WalkInput, WalkWarning, Walker};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Totals for a completed walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Top-level files walked
    pub files_processed: usize,
    /// Top-level paths skipped because they were not regular files
    pub files_skipped: usize,
    /// Combined on-disk size of the walked top-level files
    pub total_size: u64,
    /// Rows written, including archive entries
    pub rows: u64,
    /// Non-fatal problems, in the order they were found
    pub warnings: Vec<WalkWarning>,
}

/// Result of [`walk_files`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every file was walked
    Completed(WalkSummary),
    /// Cancellation fired before the walk finished
    Canceled,
}

/// Result of [`write_file_list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileListOutcome {
    /// The file list was written and flushed
    Written {
        /// Location of the file list
        path: PathBuf,
        /// Walk totals
        summary: WalkSummary,
    },
    /// The run was canceled and the partial file list removed
    Canceled,
}

/// Counts rows on their way to the inner sink.
struct CountingSink<'s, S: ?Sized> {
    inner: &'s mut S,
    rows: u64,
}

impl<S: RowSink + ?Sized> RowSink for CountingSink<'_, S> {
    fn write_row(&mut self, row: &LedgerRow) -> Result<()> {
        self.inner.write_row(row)?;
        self.rows += 1;
        Ok(())
    }
}

/// Walk `files` in order, writing rows to `sink`.
///
/// Cancellation is polled through the walker before each file and between
/// archive entries. `progress` receives `round(completed / total * 100)`
/// after every top-level path, skipped ones included.
///
/// # Errors
///
/// Returns an error if the sink fails. Cancellation is reported as
/// [`WalkOutcome::Canceled`], not as an error.
pub fn walk_files<S, P>(
    walker: &mut Walker<'_>,
    sink: &mut S,
    files: &[PathBuf],
    mut progress: P,
) -> Result<WalkOutcome>
where
    S: RowSink + ?Sized,
    P: FnMut(u8),
{
    let total = files.len();
    let mut summary = WalkSummary::default();
    let mut counting = CountingSink { inner: sink, rows: 0 };

    for (index, file) in files.iter().enumerate() {
        if walker.is_canceled() {
            tracing::info!("File list canceled after {} of {} files", index, total);
            return Ok(WalkOutcome::Canceled);
        }

        match fs::metadata(file) {
            Ok(metadata) if metadata.is_file() => {
                match walker.process(&mut counting, WalkInput::Path(file), 0, "") {
                    Ok(()) => {}
                    Err(WalkError::Canceled) => {
                        tracing::info!("File list canceled while walking {}", file.display());
                        return Ok(WalkOutcome::Canceled);
                    }
                    Err(e) => return Err(e),
                }
                summary.files_processed += 1;
                summary.total_size += metadata.len();
                summary.warnings.extend(walker.take_warnings());
            }
            _ => {
                tracing::warn!("Skipping {}: not a regular file", file.display());
                summary.files_skipped += 1;
                summary.warnings.push(WalkWarning {
                    level: 0,
                    location: file.display().to_string(),
                    message: "not a regular file, skipped".to_string(),
                });
            }
        }

        progress(percent(index + 1, total));
    }

    summary.rows = counting.rows;
    tracing::debug!(
        "Walked {} files ({} skipped), {} rows",
        summary.files_processed,
        summary.files_skipped,
        summary.rows
    );

    Ok(WalkOutcome::Completed(summary))
}

/// Write a file list for `files` to `path`.
///
/// The CSV starts with the `Level,Container,FullName,Size,FileHash` header
/// and every field is quoted. If the run is canceled or fails after the file
/// was created, the file is deleted before returning.
///
/// # Errors
///
/// Returns an error if the output cannot be created or written.
pub fn write_file_list<P>(
    path: &Path,
    walker: &mut Walker<'_>,
    files: &[PathBuf],
    progress: P,
) -> Result<FileListOutcome>
where
    P: FnMut(u8),
{
    let file = File::create(path)?;
    tracing::info!("Writing file list {}", path.display());

    match write_ledger(file, walker, files, progress) {
        Ok(WalkOutcome::Completed(summary)) => Ok(FileListOutcome::Written {
            path: path.to_path_buf(),
            summary,
        }),
        Ok(WalkOutcome::Canceled) => {
            remove_partial(path);
            Ok(FileListOutcome::Canceled)
        }
        Err(e) => {
            remove_partial(path);
            Err(e)
        }
    }
}

fn write_ledger<P>(
    file: File,
    walker: &mut Walker<'_>,
    files: &[PathBuf],
    progress: P,
) -> Result<WalkOutcome>
where
    P: FnMut(u8),
{
    let mut ledger = CsvLedgerWriter::with_header(BufWriter::new(file))?;
    let outcome = walk_files(walker, &mut ledger, files, progress)?;
    if let WalkOutcome::Completed(_) = outcome {
        ledger
            .into_inner()?
            .into_inner()
            .map_err(|e| WalkError::Io(e.into_error()))?;
    }
    Ok(outcome)
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed partial file list {}", path.display()),
        Err(e) => tracing::warn!("Failed to remove partial file list {}: {}", path.display(), e),
    }
}
