//! # DTA Files
//!
//! File inventory engine for DTA transfer logs.
//!
//! This crate provides:
//! - Streaming content hashing (SHA-256 or BLAKE3)
//! - Archive kind detection by file suffix
//! - A recursive archive walker that inventories ZIP, TAR and GZIP containers,
//!   including archives nested inside archives, without touching disk
//! - Ledger rows and CSV row sinks for the resulting file list
//! - A file-list driver with progress reporting and cancellation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod error;
pub mod file_list;
pub mod hasher;
pub mod ledger;
pub mod walker;

pub use archive::{ArchiveKind, TarCompression};
pub use error::{Result, WalkError};
pub use file_list::{FileListOutcome, WalkOutcome, WalkSummary, walk_files, write_file_list};
pub use hasher::{ContentHasher, FileHashMap, HashAlgorithm, HashSource, Hasher, hash_files};
pub use ledger::{CsvLedgerWriter, EntrySize, LedgerRow, RowSink, read_ledger};
pub use walker::{WalkInput, WalkWarning, Walker};

/// Default read buffer for hashing (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Header row of a file list ledger.
pub const FILE_LIST_HEADERS: [&str; 5] = ["Level", "Container", "FullName", "Size", "FileHash"];

/// Normalize path separators to forward slashes.
#[must_use]
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Final component of a `/` or `\` separated name.
#[must_use]
pub fn display_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
}

/// Progress as `round(done / total * 100)`; an empty run is complete.
pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators(r"C:\data\report.txt"), "C:/data/report.txt");
        assert_eq!(normalize_separators("/already/fine"), "/already/fine");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("dir/sub/nested.tar"), "nested.tar");
        assert_eq!(display_name(r"C:\media\bundle.zip"), "bundle.zip");
        assert_eq!(display_name("plain.gz"), "plain.gz");
        assert_eq!(display_name("dir/"), "dir");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
    }
}
