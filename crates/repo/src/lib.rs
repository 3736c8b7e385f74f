//! # Overview
//!
//! `repo` is the server's repository format (spec §4.4, component `C4`):
//! a directory holding `objects/` (the content-addressed [`blobstore`])
//! and `versions/` (one file per version, encoded with [`codec`]).
//!
//! # Invariants
//!
//! - Version numbering has no gaps: [`Repository::write_version`] only
//!   ever advances `latest_version() + 1`.
//! - A version file is never modified once written; writes go through a
//!   temp file in `versions/` and are renamed into place.
//! - `versions/0` always exists after [`Repository::init`] and decodes to
//!   the empty set.

mod codec;

use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use blobstore::{BlobStore, BlobWriter};
use tempfile::NamedTempFile;
use wire::{Checksum, FileItem, SyncError, SyncResult};

pub use codec::{decode, encode};

pub struct Repository {
    root: PathBuf,
    blobs: BlobStore,
}

impl Repository {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let blobs = BlobStore::new(root.join("objects"));
        Self { root, blobs }
    }

    fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    /// Creates `objects/`, `versions/`, and an empty `versions/0`.
    pub fn init(&self) -> SyncResult<()> {
        fs::create_dir_all(self.root.join("objects"))?;
        fs::create_dir_all(self.versions_dir())?;
        self.write_version(0, HashSet::new())?;
        Ok(())
    }

    /// The highest existing version number.
    pub fn latest_version(&self) -> SyncResult<u64> {
        let mut max = None;
        for entry in fs::read_dir(self.versions_dir())? {
            let entry = entry?;
            if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) {
                max = Some(max.map_or(n, |m: u64| m.max(n)));
            }
        }
        max.ok_or_else(|| SyncError::NotFound("no versions present".into()))
    }

    /// Decodes `versions/n`; fails with `NotFound` if absent.
    pub fn read_version(&self, n: u64) -> SyncResult<HashSet<FileItem>> {
        let path = self.versions_dir().join(n.to_string());
        let text = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::NotFound(format!("version {n}"))
            } else {
                SyncError::Io(e)
            }
        })?;
        codec::decode(&text)
    }

    /// Writes a new version file atomically; fails with `VersionExists` if
    /// `n` is already present.
    pub fn write_version(&self, n: u64, items: HashSet<FileItem>) -> SyncResult<()> {
        let path = self.versions_dir().join(n.to_string());
        if path.is_file() {
            return Err(SyncError::VersionExists(n));
        }
        fs::create_dir_all(self.versions_dir())?;
        let mut temp = NamedTempFile::new_in(self.versions_dir())?;
        temp.write_all(codec::encode(items).as_bytes())?;
        temp.persist(&path).map_err(|e| e.error)?;
        tracing::debug!(version = n, "version committed");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, checksum: &Checksum) -> bool {
        self.blobs.contains(checksum)
    }

    pub fn read_blob(&self, checksum: &Checksum) -> SyncResult<impl Read> {
        self.blobs.read(checksum)
    }

    pub fn write_blob(&self, expected: Option<Checksum>) -> SyncResult<BlobWriter> {
        self.blobs.write(expected)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
