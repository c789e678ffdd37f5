//! Shared fixtures for DTA integration tests
//!
//! Builders for in-memory archives so tests can nest containers to any
//! depth without checked-in binaries.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// One member of a fixture archive
pub enum Member<'a> {
    /// Regular file with contents
    File(&'a str, &'a [u8]),
    /// Directory entry
    Dir(&'a str),
}

/// Build a ZIP archive in memory
pub fn zip_bytes(members: &[Member<'_>]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for member in members {
        match member {
            Member::File(name, data) => {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            Member::Dir(name) => zip.add_directory(*name, options).unwrap(),
        }
    }
    zip.finish().unwrap().into_inner()
}

/// Build an uncompressed TAR archive in memory
pub fn tar_bytes(members: &[Member<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for member in members {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o644);
        match member {
            Member::File(name, data) => {
                header.set_size(data.len() as u64);
                builder.append_data(&mut header, name, *data).unwrap();
            }
            Member::Dir(name) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                builder.append_data(&mut header, name, std::io::empty()).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

/// gzip-compress `data`
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// bzip2-compress `data`
pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// xz-compress `data`
pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A ZIP holding `inner` as `name`, `depth` times over.
///
/// Depth 0 returns `inner` unchanged; each wrap names its payload
/// `layer<N>.zip`, counting from the outside.
pub fn nested_zips(inner: &[u8], name: &str, depth: usize) -> Vec<u8> {
    let mut bytes = inner.to_vec();
    let mut member = name.to_string();
    for layer in (0..depth).rev() {
        bytes = zip_bytes(&[Member::File(&member, &bytes)]);
        member = format!("layer{layer}.zip");
    }
    bytes
}

/// Write `data` to `dir/name`, creating parent directories
pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, data).unwrap();
    path
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}
