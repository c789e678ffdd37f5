//! Archive kind detection.
//!
//! The kind of a container is decided once, from its file name, before any
//! bytes are read. TAR streams are then opened transparently: the compression
//! layer is sniffed from magic bytes rather than trusted from the suffix.

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use std::io::{self, BufRead, Read};
use xz2::read::XzDecoder;

/// Suffixes that mark a TAR stream, compressed or not.
const TAR_SUFFIXES: [&str; 7] = [
    ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz",
];

/// gzip magic bytes (RFC 1952).
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BZIP2_MAGIC: [u8; 3] = *b"BZh";
const XZ_MAGIC: [u8; 6] = [0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// Container formats the walker descends into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// ZIP archive with a central directory
    Zip,
    /// TAR stream, possibly gzip/bzip2/xz compressed
    Tar,
    /// Single-payload gzip stream (not `.tar.gz`)
    Gzip,
}

impl ArchiveKind {
    /// Classify a file or entry name by suffix, case-insensitively.
    ///
    /// Returns `None` for anything that is not a recognized container.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();

        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if TAR_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            Some(Self::Tar)
        } else if lower.ends_with(".gz") {
            Some(Self::Gzip)
        } else {
            None
        }
    }

    /// Short label used in diagnostics
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Zip => "ZIP",
            Self::Tar => "TAR",
            Self::Gzip => "GZ",
        }
    }
}

/// Compression layer wrapped around a TAR stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    /// Plain TAR
    None,
    /// gzip
    Gzip,
    /// bzip2
    Bzip2,
    /// xz
    Xz,
}

impl TarCompression {
    /// Detect the compression layer from the first bytes of a stream.
    #[must_use]
    pub fn sniff(header: &[u8]) -> Self {
        if header.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else if header.starts_with(&BZIP2_MAGIC) {
            Self::Bzip2
        } else if header.starts_with(&XZ_MAGIC) {
            Self::Xz
        } else {
            Self::None
        }
    }
}

/// Open a TAR stream, peeling off any compression layer.
///
/// # Errors
///
/// Returns an error if the leading bytes cannot be read.
pub fn open_tar<'r, R>(mut reader: R) -> io::Result<tar::Archive<Box<dyn Read + 'r>>>
where
    R: BufRead + 'r,
{
    let compression = TarCompression::sniff(reader.fill_buf()?);
    tracing::trace!("TAR compression: {:?}", compression);

    let inner: Box<dyn Read + 'r> = match compression {
        TarCompression::None => Box::new(reader),
        TarCompression::Gzip => Box::new(MultiGzDecoder::new(reader)),
        TarCompression::Bzip2 => Box::new(BzDecoder::new(reader)),
        TarCompression::Xz => Box::new(XzDecoder::new(reader)),
    };

    Ok(tar::Archive::new(inner))
}

/// Decompress a complete gzip stream (all members) into memory.
///
/// # Errors
///
/// Returns an error if the stream is not valid gzip or cannot be read.
pub fn gunzip<R: Read>(reader: R) -> io::Result<Vec<u8>> {
    let mut payload = Vec::new();
    MultiGzDecoder::new(reader).read_to_end(&mut payload)?;
    Ok(payload)
}

/// Name of the payload inside a gzip container: the container name minus
/// its `.gz` suffix.
#[must_use]
pub fn gzip_payload_name(container: &str) -> &str {
    let split = container.len().saturating_sub(3);
    match (container.get(..split), container.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".gz") => stem,
        _ => container,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};

    #[test]
    fn test_classify_suffixes() {
        assert_eq!(ArchiveKind::from_name("bundle.zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_name("BUNDLE.ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_name("nested.tar"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_name("data.tar.gz"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_name("data.TGZ"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_name("data.tar.bz2"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_name("data.tar.xz"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_name("payload.gz"), Some(ArchiveKind::Gzip));
        assert_eq!(ArchiveKind::from_name("report.txt"), None);
        assert_eq!(ArchiveKind::from_name("zip"), None);
        assert_eq!(ArchiveKind::from_name("archive.zip.bak"), None);
    }

    #[test]
    fn test_sniff_compression() {
        assert_eq!(TarCompression::sniff(&[0x1f, 0x8b, 8, 0]), TarCompression::Gzip);
        assert_eq!(TarCompression::sniff(b"BZh91AY"), TarCompression::Bzip2);
        assert_eq!(
            TarCompression::sniff(&[0xfd, b'7', b'z', b'X', b'Z', 0x00, 0x00]),
            TarCompression::Xz
        );
        assert_eq!(TarCompression::sniff(b"file.txt\0"), TarCompression::None);
        assert_eq!(TarCompression::sniff(&[]), TarCompression::None);
    }

    #[test]
    fn test_gzip_payload_name() {
        assert_eq!(gzip_payload_name("payload.txt.gz"), "payload.txt");
        assert_eq!(gzip_payload_name("LOG.GZ"), "LOG");
        assert_eq!(gzip_payload_name("noext"), "noext");
    }

    #[test]
    fn test_gunzip_roundtrip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello gzip").unwrap();
        let compressed = encoder.finish().unwrap();

        let payload = gunzip(Cursor::new(compressed)).unwrap();
        assert_eq!(payload, b"hello gzip");
    }

    #[test]
    fn test_gunzip_rejects_garbage() {
        assert!(gunzip(Cursor::new(b"definitely not gzip".to_vec())).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_plain_names_are_not_archives(stem in "[a-zA-Z0-9_]{1,16}", ext in "(txt|csv|pdf|docx|bin)") {
                let name = format!("{stem}.{ext}");
                prop_assert_eq!(ArchiveKind::from_name(&name), None);
            }

            #[test]
            fn prop_case_does_not_matter(stem in "[a-z0-9_/]{1,24}", suffix in "(zip|tar|tgz|gz|tar\\.gz|tar\\.bz2|tar\\.xz)") {
                let lower = format!("{stem}.{suffix}");
                let upper = lower.to_ascii_uppercase();
                prop_assert!(ArchiveKind::from_name(&lower).is_some());
                prop_assert_eq!(ArchiveKind::from_name(&lower), ArchiveKind::from_name(&upper));
            }
        }
    }
}
