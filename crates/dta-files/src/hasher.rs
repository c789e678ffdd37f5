//! Streaming content hashing.
//!
//! Digests are computed over fixed-size reads so memory use stays bounded for
//! arbitrarily large files. The algorithm is an explicit parameter of
//! [`Hasher`]; nothing in this crate relies on a global default.

use crate::{DEFAULT_BUFFER_SIZE, percent};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Pre-computed digests for top-level files, keyed by the path the caller
/// selected.
pub type FileHashMap = HashMap<PathBuf, String>;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// SHA-256 (default, matches existing transfer logs)
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl HashAlgorithm {
    /// Lowercase configuration name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!("Unsupported hash algorithm: {other}")),
        }
    }
}

/// Input accepted by [`Hasher::hash`]
#[derive(Debug, Clone, Copy)]
pub enum HashSource<'a> {
    /// A file on disk
    Path(&'a Path),
    /// An in-memory buffer
    Bytes(&'a [u8]),
}

/// Hashes the contents of archive entries on demand.
///
/// The walker only calls this when entry hashing was requested.
pub trait ContentHasher {
    /// Hex digest of `data`
    fn hash_content(&self, data: &[u8]) -> String;
}

impl<F> ContentHasher for F
where
    F: Fn(&[u8]) -> String,
{
    fn hash_content(&self, data: &[u8]) -> String {
        self(data)
    }
}

/// Smallest input handed to the multi-threaded BLAKE3 path
#[cfg(feature = "rayon")]
const RAYON_MIN_LEN: usize = 128 * 1024;

enum DigestState {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            #[cfg(feature = "rayon")]
            Self::Blake3(h) if data.len() >= RAYON_MIN_LEN => {
                h.update_rayon(data);
            }
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Content hasher with a fixed algorithm and read size
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl Hasher {
    /// Create a hasher with the default 64 KiB read size
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self::with_buffer_size(algorithm, DEFAULT_BUFFER_SIZE)
    }

    /// Create a hasher with a custom read size (clamped to at least 1 byte)
    #[must_use]
    pub fn with_buffer_size(algorithm: HashAlgorithm, buffer_size: usize) -> Self {
        Self {
            algorithm,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Digest algorithm in use
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash everything readable from `reader`
    ///
    /// # Errors
    ///
    /// Returns the first read error other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<String> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&buffer[..n]);
        }

        Ok(state.finalize_hex())
    }

    /// Hash a file on disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn hash_path(&self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        self.hash_reader(file)
    }

    /// Hash an in-memory buffer. Large buffers take the multi-threaded
    /// BLAKE3 path when the `rayon` feature is on.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        let mut state = DigestState::new(self.algorithm);
        state.update(data);
        state.finalize_hex()
    }

    /// Hash a path or buffer, reporting failures in-band.
    ///
    /// A read failure yields `"ERROR: <message>"` in place of the digest.
    #[must_use]
    pub fn hash(&self, source: HashSource<'_>) -> String {
        match source {
            HashSource::Bytes(data) => self.hash_bytes(data),
            HashSource::Path(path) => match self.hash_path(path) {
                Ok(digest) => digest,
                Err(e) => {
                    tracing::warn!("Failed to hash {}: {}", path.display(), e);
                    error_note(&e)
                }
            },
        }
    }
}

impl ContentHasher for Hasher {
    fn hash_content(&self, data: &[u8]) -> String {
        self.hash_bytes(data)
    }
}

/// Format an error for the in-band hash column.
pub(crate) fn error_note(err: &dyn fmt::Display) -> String {
    format!("ERROR: {err}")
}

/// Hash every top-level file ahead of the archive walk.
///
/// `progress` receives a 0-100 percentage after each file. Returns `None`
/// when `is_canceled` fires; the partial map is discarded. Unreadable files
/// map to an `"ERROR: ..."` note rather than aborting the pass.
#[cfg(not(feature = "parallel"))]
pub fn hash_files<P, C>(
    hasher: &Hasher,
    files: &[PathBuf],
    mut progress: P,
    is_canceled: C,
) -> Option<FileHashMap>
where
    P: FnMut(u8) + Send,
    C: Fn() -> bool + Sync,
{
    let mut hashes = FileHashMap::with_capacity(files.len());
    let total = files.len();

    for (index, file) in files.iter().enumerate() {
        if is_canceled() {
            tracing::info!("Hashing canceled after {} of {} files", index, total);
            return None;
        }

        let digest = hasher.hash(HashSource::Path(file));
        hashes.insert(file.clone(), digest);
        progress(percent(index + 1, total));
    }

    Some(hashes)
}

/// Hash every top-level file ahead of the archive walk.
///
/// `progress` receives a 0-100 percentage after each file. Returns `None`
/// when `is_canceled` fires; the partial map is discarded. Unreadable files
/// map to an `"ERROR: ..."` note rather than aborting the pass.
#[cfg(feature = "parallel")]
pub fn hash_files<P, C>(
    hasher: &Hasher,
    files: &[PathBuf],
    progress: P,
    is_canceled: C,
) -> Option<FileHashMap>
where
    P: FnMut(u8) + Send,
    C: Fn() -> bool + Sync,
{
    use rayon_crate::prelude::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    let total = files.len();
    let completed = AtomicUsize::new(0);
    let canceled = AtomicBool::new(false);
    let progress = Mutex::new(progress);

    let digests: Vec<(PathBuf, String)> = files
        .par_iter()
        .filter_map(|file| {
            if canceled.load(Ordering::Relaxed) || is_canceled() {
                canceled.store(true, Ordering::Relaxed);
                return None;
            }
            let digest = hasher.hash(HashSource::Path(file));
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Ok(mut report) = progress.lock() {
                report(percent(done, total));
            }
            Some((file.clone(), digest))
        })
        .collect();

    if canceled.load(Ordering::Relaxed) {
        tracing::info!("Hashing canceled after {} of {} files", digests.len(), total);
        return None;
    }

    Some(digests.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const SHA256_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const BLAKE3_EMPTY: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

    #[test]
    fn test_sha256_known_vectors() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        assert_eq!(hasher.hash_bytes(b"abc"), SHA256_ABC);
        assert_eq!(hasher.hash_bytes(b""), SHA256_EMPTY);
    }

    #[test]
    fn test_blake3_known_vector() {
        let hasher = Hasher::new(HashAlgorithm::Blake3);
        assert_eq!(hasher.hash_bytes(b""), BLAKE3_EMPTY);
    }

    #[test]
    fn test_large_blake3_buffer_matches_reference() {
        let data: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i % 239) as u8).collect();
        let hasher = Hasher::new(HashAlgorithm::Blake3);
        assert_eq!(hasher.hash_bytes(&data), blake3::hash(&data).to_hex().to_string());
        assert_eq!(hasher.hash_reader(data.as_slice()).unwrap(), hasher.hash_bytes(&data));
    }

    #[test]
    fn test_path_and_bytes_agree_across_chunk_boundaries() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&data).unwrap();
        temp_file.flush().unwrap();

        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            // Small buffer forces many reads
            let hasher = Hasher::with_buffer_size(algorithm, 1000);
            let from_path = hasher.hash_path(temp_file.path()).unwrap();
            let from_bytes = hasher.hash_bytes(&data);
            assert_eq!(from_path, from_bytes);
            assert_eq!(from_path, Hasher::new(algorithm).hash_bytes(&data));
        }
    }

    #[test]
    fn test_missing_file_yields_error_note() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.bin");

        let digest = Hasher::default().hash(HashSource::Path(&missing));
        assert!(digest.starts_with("ERROR: "), "got {digest}");
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(" blake3 ".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!("md4".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::Blake3.to_string(), "blake3");
    }

    #[test]
    fn test_closure_content_hasher() {
        let tagger = |data: &[u8]| format!("len={}", data.len());
        assert_eq!(tagger.hash_content(b"four"), "len=4");
    }

    #[test]
    fn test_hash_files_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("b.txt");
        std::fs::write(&a, b"abc").unwrap();
        std::fs::write(&b, b"").unwrap();
        let files = vec![a.clone(), b.clone()];

        let mut seen = Vec::new();
        let hashes = hash_files(&Hasher::default(), &files, |p| seen.push(p), || false).unwrap();

        assert_eq!(hashes[&a], SHA256_ABC);
        assert_eq!(hashes[&b], SHA256_EMPTY);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.iter().max(), Some(&100));
    }

    #[test]
    fn test_hash_files_canceled_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.txt");
        std::fs::write(&a, b"abc").unwrap();

        let result = hash_files(&Hasher::default(), &[a], |_| {}, || true);
        assert!(result.is_none());
    }

    #[test]
    fn test_hash_files_keeps_going_after_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone.txt");
        let present = temp_dir.path().join("here.txt");
        std::fs::write(&present, b"abc").unwrap();

        let hashes = hash_files(
            &Hasher::default(),
            &[missing.clone(), present.clone()],
            |_| {},
            || false,
        )
        .unwrap();

        assert!(hashes[&missing].starts_with("ERROR: "));
        assert_eq!(hashes[&present], SHA256_ABC);
    }
}
