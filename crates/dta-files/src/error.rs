//! Error types for file inventory.
//!
//! Only failures that make the whole output unusable surface as a
//! [`WalkError`]: the row sink cannot be written, the output file cannot be
//! created, or the run was canceled. Problems with a single file or archive
//! entry are reported as [`crate::walker::WalkWarning`]s instead.

use thiserror::Error;

/// File inventory errors
#[derive(Debug, Error)]
pub enum WalkError {
    /// I/O error on the output side
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Row sink rejected a row
    #[error("Row sink error: {0}")]
    Sink(String),

    /// A file list could not be parsed back into ledger rows
    #[error("Invalid ledger: {0}")]
    InvalidLedger(String),

    /// Cancellation was requested while walking
    #[error("Operation canceled")]
    Canceled,
}

/// Result type for file inventory operations
pub type Result<T> = std::result::Result<T, WalkError>;
