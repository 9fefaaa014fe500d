//! Archive extraction and table file discovery
//!
//! A mudata archive is a zip file holding the five table files at any depth.
//! Extraction goes to a temporary directory that is removed when the
//! [`ExtractedArchive`] is dropped, whatever the import outcome.

use crate::error::{MudataError, Result};
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

/// A zip archive unpacked into a temporary directory
#[derive(Debug)]
pub struct ExtractedArchive {
    dir: TempDir,
    file_count: usize,
}

impl ExtractedArchive {
    /// Extract archive bytes into a fresh temporary directory
    ///
    /// Entries whose names would land outside the extraction root are
    /// rejected rather than skipped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("mudata-import").tempdir()?;
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut file_count = 0;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let rel_path = entry.enclosed_name().ok_or_else(|| {
                MudataError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("archive entry '{}' escapes the extraction root", entry.name()),
                ))
            })?;

            let out_path = dir.path().join(&rel_path);
            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&out_path)?;
            io::copy(&mut entry, &mut outfile)?;
            file_count += 1;
        }

        debug!(
            "Extracted {} files into {}",
            file_count,
            dir.path().display()
        );
        Ok(Self { dir, file_count })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }
}

/// Find the first file named exactly `name` below `root`
///
/// The walk is depth-first. Within a directory its files are checked before
/// its subdirectories, and both are taken in file name order, so the result
/// does not depend on directory listing order.
pub fn find_table_file(root: &Path, name: &str) -> Result<PathBuf> {
    let walker = WalkDir::new(root).follow_links(false).sort_by(|a, b| {
        a.file_type()
            .is_dir()
            .cmp(&b.file_type().is_dir())
            .then_with(|| a.file_name().cmp(b.file_name()))
    });
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == name {
            return Ok(entry.into_path());
        }
    }
    Err(MudataError::MissingRequiredFile {
        name: name.to_string(),
    })
}
