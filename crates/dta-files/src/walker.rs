//! Recursive archive inventory.
//!
//! [`Walker::process`] emits one [`LedgerRow`] for a selected file and, when
//! the file is a recognized archive, one row for every file entry inside it.
//! Entries whose names are themselves archives are read fully into memory and
//! walked in turn, so a ZIP inside a TAR inside a ZIP is inventoried without
//! ever extracting anything to disk.
//!
//! # Invariants
//! - Rows reach the sink in pre-order: a container's row always precedes the
//!   rows of its entries.
//! - Entries keep the archive's native order.
//! - Directories are never emitted.
//! - An archive that cannot be opened still has its own row; only the descent
//!   is skipped, and a [`WalkWarning`] records why.
//!
//! # Design Notes
//! - Depth is the call stack. Nested buffers are owned by the frame that read
//!   them and dropped when that frame returns.
//! - Nesting depth is unbounded unless [`Walker::with_max_depth`] is set.

use crate::archive::{self, ArchiveKind};
use crate::error::{Result, WalkError};
use crate::hasher::{ContentHasher, FileHashMap, error_note};
use crate::ledger::{EntrySize, LedgerRow, RowSink};
use crate::{display_name, normalize_separators};
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Upper bound on the capacity reserved up front for an entry read, so a
/// lying size header cannot force a huge allocation before any data arrives.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Input to one [`Walker::process`] step
#[derive(Debug, Clone, Copy)]
pub enum WalkInput<'a> {
    /// A file selected on disk
    Path(&'a Path),
    /// A nested archive already read into memory
    Buffer {
        /// Entry name of the archive inside its parent
        name: &'a str,
        /// Complete archive bytes
        bytes: &'a [u8],
    },
}

/// Non-fatal problem encountered while walking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkWarning {
    /// Level of the file or archive the warning concerns
    pub level: u32,
    /// Path or container name
    pub location: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for WalkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Where an archive's bytes come from
#[derive(Clone, Copy)]
enum ArchiveSource<'b> {
    File(&'b Path),
    Buffer(&'b [u8]),
}

/// Buffered reader over either source; ZIP needs `Seek`, TAR sniffing needs
/// `BufRead`.
enum SourceReader<'b> {
    File(BufReader<File>),
    Buffer(Cursor<&'b [u8]>),
}

impl<'b> SourceReader<'b> {
    fn open(source: ArchiveSource<'b>) -> io::Result<Self> {
        match source {
            ArchiveSource::File(path) => Ok(Self::File(BufReader::new(File::open(path)?))),
            ArchiveSource::Buffer(bytes) => Ok(Self::Buffer(Cursor::new(bytes))),
        }
    }
}

impl Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(r) => r.read(buf),
            Self::Buffer(r) => r.read(buf),
        }
    }
}

impl BufRead for SourceReader<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Self::File(r) => r.fill_buf(),
            Self::Buffer(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Self::File(r) => r.consume(amt),
            Self::Buffer(r) => r.consume(amt),
        }
    }
}

impl Seek for SourceReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::File(r) => r.seek(pos),
            Self::Buffer(r) => r.seek(pos),
        }
    }
}

/// Contents of one archive entry, either still streaming or already decoded.
enum EntryContents<'r> {
    Stream(&'r mut dyn Read),
    Loaded(&'r [u8]),
}

impl<'r> EntryContents<'r> {
    fn load(self, size_hint: u64) -> io::Result<Cow<'r, [u8]>> {
        match self {
            Self::Loaded(bytes) => Ok(Cow::Borrowed(bytes)),
            Self::Stream(reader) => {
                let mut bytes = Vec::with_capacity(size_hint.min(MAX_PREALLOC) as usize);
                reader.read_to_end(&mut bytes)?;
                Ok(Cow::Owned(bytes))
            }
        }
    }
}

fn never_canceled() -> bool {
    false
}

/// Recursive archive walker.
///
/// A walker carries the per-run settings (pre-computed hashes, optional entry
/// hasher, cancellation predicate) and collects warnings. It holds no state
/// between top-level files other than those warnings.
pub struct Walker<'a> {
    hashes: Option<&'a FileHashMap>,
    entry_hasher: Option<&'a dyn ContentHasher>,
    is_canceled: &'a dyn Fn() -> bool,
    max_depth: Option<u32>,
    descend: bool,
    warnings: Vec<WalkWarning>,
}

impl Default for Walker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Walker<'a> {
    /// Create a walker with no hashes, no entry hashing and no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hashes: None,
            entry_hasher: None,
            is_canceled: &never_canceled,
            max_depth: None,
            descend: true,
            warnings: Vec::new(),
        }
    }

    /// Use pre-computed digests for level-0 rows
    #[must_use]
    pub fn with_hashes(mut self, hashes: &'a FileHashMap) -> Self {
        self.hashes = Some(hashes);
        self
    }

    /// Hash the contents of archive entries with `hasher`
    #[must_use]
    pub fn with_entry_hasher(mut self, hasher: &'a dyn ContentHasher) -> Self {
        self.entry_hasher = Some(hasher);
        self
    }

    /// Poll `is_canceled` between files and between archive entries
    #[must_use]
    pub fn with_cancel(mut self, is_canceled: &'a dyn Fn() -> bool) -> Self {
        self.is_canceled = is_canceled;
        self
    }

    /// Stop descending once rows would exceed `max_depth` levels
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable descending into archives at all
    #[must_use]
    pub fn descend_archives(mut self, descend: bool) -> Self {
        self.descend = descend;
        self
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        (self.is_canceled)()
    }

    /// Warnings collected so far
    #[must_use]
    pub fn warnings(&self) -> &[WalkWarning] {
        &self.warnings
    }

    /// Drain collected warnings
    pub fn take_warnings(&mut self) -> Vec<WalkWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Walk one input, writing rows to `sink`.
    ///
    /// For [`WalkInput::Path`] a row for the file itself is written at
    /// `level` with `container_name` as its container. For
    /// [`WalkInput::Buffer`] the parent already wrote that row, so only the
    /// buffer's entries are written, at `level + 1`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the sink fails or cancellation fires.
    /// Unreadable files and corrupt archives become warnings.
    pub fn process<S>(
        &mut self,
        sink: &mut S,
        input: WalkInput<'_>,
        level: u32,
        container_name: &str,
    ) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        match input {
            WalkInput::Path(path) => self.process_path(sink, path, level, container_name),
            WalkInput::Buffer { name, bytes } => {
                self.descend_into(sink, name, ArchiveSource::Buffer(bytes), level)
            }
        }
    }

    fn process_path<S>(
        &mut self,
        sink: &mut S,
        path: &Path,
        level: u32,
        container_name: &str,
    ) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        let full_name = normalize_separators(&path.to_string_lossy());

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.warn(level, &full_name, format!("cannot read file size: {e}"));
                return sink.write_row(&LedgerRow {
                    level,
                    container: container_name.to_string(),
                    full_name,
                    size: EntrySize::Error,
                    hash: error_note(&e),
                });
            }
        };

        if metadata.is_dir() {
            self.warn(level, &full_name, "is a directory, skipped".to_string());
            return Ok(());
        }

        let hash = self
            .hashes
            .and_then(|hashes| hashes.get(path))
            .cloned()
            .unwrap_or_default();

        sink.write_row(&LedgerRow {
            level,
            container: container_name.to_string(),
            full_name: full_name.clone(),
            size: EntrySize::Bytes(metadata.len()),
            hash,
        })?;

        let name = path
            .file_name()
            .map_or_else(|| full_name.clone(), |n| n.to_string_lossy().into_owned());
        self.descend_into(sink, &name, ArchiveSource::File(path), level)
    }

    /// Walk the entries of the archive called `name`, whose own row sits at
    /// `level`. Does nothing for names that are not archives.
    fn descend_into<S>(
        &mut self,
        sink: &mut S,
        name: &str,
        source: ArchiveSource<'_>,
        level: u32,
    ) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        if !self.descend {
            return Ok(());
        }
        let Some(kind) = ArchiveKind::from_name(name) else {
            return Ok(());
        };
        let container = display_name(name).to_string();

        if self.max_depth.is_some_and(|max| level >= max) {
            self.warn(
                level,
                &container,
                format!("nesting limit of {} levels reached, contents not listed", level),
            );
            return Ok(());
        }

        tracing::debug!("Walking {} archive {} at level {}", kind.label(), container, level);

        let reader = match SourceReader::open(source) {
            Ok(reader) => reader,
            Err(e) => {
                self.warn(level, &container, format!("cannot open {} file: {e}", kind.label()));
                return Ok(());
            }
        };

        match kind {
            ArchiveKind::Zip => self.walk_zip(sink, reader, &container, level + 1),
            ArchiveKind::Tar => self.walk_tar(sink, reader, &container, level + 1),
            ArchiveKind::Gzip => self.walk_gzip(sink, reader, &container, level + 1),
        }
    }

    fn walk_zip<S>(
        &mut self,
        sink: &mut S,
        reader: SourceReader<'_>,
        container: &str,
        level: u32,
    ) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        let mut archive = match zip::ZipArchive::new(reader) {
            Ok(archive) => archive,
            Err(e) => {
                self.warn(level - 1, container, format!("Error processing ZIP file: {e}"));
                return Ok(());
            }
        };

        for index in 0..archive.len() {
            self.check_canceled()?;

            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    self.warn(level, container, format!("skipping unreadable entry #{index}: {e}"));
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            let size = entry.size();
            self.emit_entry(sink, container, level, name, size, EntryContents::Stream(&mut entry))?;
        }

        Ok(())
    }

    fn walk_tar<S>(
        &mut self,
        sink: &mut S,
        reader: SourceReader<'_>,
        container: &str,
        level: u32,
    ) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        let mut archive = match archive::open_tar(reader) {
            Ok(archive) => archive,
            Err(e) => {
                self.warn(level - 1, container, format!("Error processing TAR file: {e}"));
                return Ok(());
            }
        };
        let entries = match archive.entries() {
            Ok(entries) => entries,
            Err(e) => {
                self.warn(level - 1, container, format!("Error processing TAR file: {e}"));
                return Ok(());
            }
        };

        for entry in entries {
            self.check_canceled()?;

            // A broken TAR stream cannot be resynchronized
            let mut entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.warn(level - 1, container, format!("Error processing TAR file: {e}"));
                    break;
                }
            };
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let size = entry.size();
            self.emit_entry(sink, container, level, name, size, EntryContents::Stream(&mut entry))?;
        }

        Ok(())
    }

    fn walk_gzip<S>(
        &mut self,
        sink: &mut S,
        reader: SourceReader<'_>,
        container: &str,
        level: u32,
    ) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        let payload = match archive::gunzip(reader) {
            Ok(payload) => payload,
            Err(e) => {
                self.warn(level - 1, container, format!("Error processing GZ file: {e}"));
                return Ok(());
            }
        };

        let name = archive::gzip_payload_name(container).to_string();
        let size = payload.len() as u64;
        self.emit_entry(sink, container, level, name, size, EntryContents::Loaded(&payload))
    }

    /// Write the row for one entry, then descend if it is an archive.
    fn emit_entry<S>(
        &mut self,
        sink: &mut S,
        container: &str,
        level: u32,
        name: String,
        size: u64,
        contents: EntryContents<'_>,
    ) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        let nested = self.descend && ArchiveKind::from_name(&name).is_some();
        let loaded = if nested || self.entry_hasher.is_some() {
            Some(contents.load(size))
        } else {
            None
        };

        let hash = match (self.entry_hasher, &loaded) {
            (Some(hasher), Some(Ok(bytes))) => hasher.hash_content(bytes),
            (Some(_), Some(Err(e))) => error_note(e),
            _ => String::new(),
        };

        sink.write_row(&LedgerRow::entry(level, container, name.clone(), size, hash))?;

        match loaded {
            Some(Ok(bytes)) if nested => {
                self.descend_into(sink, &name, ArchiveSource::Buffer(&bytes), level)
            }
            Some(Err(e)) => {
                self.warn(level, container, format!("cannot read entry {name}: {e}"));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            return Err(WalkError::Canceled);
        }
        Ok(())
    }

    fn warn(&mut self, level: u32, location: &str, message: String) {
        tracing::warn!("{}: {}", location, message);
        self.warnings.push(WalkWarning {
            level,
            location: location.to_string(),
            message,
        });
    }
}
