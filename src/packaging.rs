//! Packaging of completed batch results for download.
//!
//! With an archive writer available every completed item goes into one
//! `compressed-images-<timestamp>.zip`. Without one, each item becomes an
//! individual [`Download`], staggered by [`DOWNLOAD_STAGGER_MS`] per index so
//! a consumer that triggers downloads one after another does not drop any.
//!
//! Entry names come from [`BatchRun::entry_names`], the same names the batch
//! report lists. Two sources that map to the same name (`a.png` and `a.jpg`
//! both becoming `a.webp`) are disambiguated with a `-2`, `-3` suffix.

use crate::batch::BatchRun;
use crate::naming::archive_name;
use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DOWNLOAD_STAGGER_MS: u64 = 100;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Minimal archive capability: add named entries, then produce the bytes.
pub trait ArchiveWriter {
    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), PackageError>;
    fn finalize(self) -> Result<Vec<u8>, PackageError>;
}

/// In-memory ZIP archive with Deflate entries.
pub struct ZipArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ZipArchive {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(6)),
        }
    }
}

impl Default for ZipArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter for ZipArchive {
    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), PackageError> {
        self.writer.start_file(name, self.options)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn finalize(self) -> Result<Vec<u8>, PackageError> {
        Ok(self.writer.finish()?.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub name: String,
    pub bytes: Vec<u8>,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Package {
    Archive { name: String, bytes: Vec<u8> },
    Individual(Vec<Download>),
}

/// Package every completed item of `run`.
///
/// Failed and pending items are skipped. `timestamp_ms` only feeds the
/// archive name.
pub fn package_results<A: ArchiveWriter>(
    run: &BatchRun,
    archive: Option<A>,
    timestamp_ms: u128,
) -> Result<Package, PackageError> {
    let entries: Vec<(String, &[u8])> = run
        .items
        .iter()
        .zip(run.entry_names())
        .filter_map(|(item, name)| Some((name?, item.result.as_ref()?.bytes.as_slice())))
        .collect();

    match archive {
        Some(mut archive) => {
            for (name, bytes) in &entries {
                archive.add_entry(name, bytes)?;
            }
            let name = archive_name(timestamp_ms);
            debug!(archive = %name, entries = entries.len(), "archive written");
            Ok(Package::Archive {
                name,
                bytes: archive.finalize()?,
            })
        }
        None => Ok(Package::Individual(
            entries
                .into_iter()
                .enumerate()
                .map(|(index, (name, bytes))| Download {
                    name,
                    bytes: bytes.to_vec(),
                    delay_ms: index as u64 * DOWNLOAD_STAGGER_MS,
                })
                .collect(),
        )),
    }
}
