//! Content-addressed blob storage (spec §4.2, component `C2`).
//!
//! Blobs live under `root/<bucket>/<rest>` where `bucket` is the first two
//! hex characters of the SHA-1 checksum and `rest` is the remaining 38.
//! Writes go through a [`tempfile::NamedTempFile`] in `root` itself and are
//! renamed into place only once the digest is known (and, if the caller
//! supplied an expected checksum, verified) -- the sole mechanism that keeps
//! a crashed or rejected upload invisible to [`BlobStore::contains`].

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use digest::Digest;
use tempfile::NamedTempFile;
use wire::{Checksum, SyncError, SyncResult};

pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, checksum: &Checksum) -> PathBuf {
        let (bucket, rest) = checksum.bucket();
        self.root.join(bucket).join(rest)
    }

    /// Pure filesystem membership check.
    #[must_use]
    pub fn contains(&self, checksum: &Checksum) -> bool {
        self.blob_path(checksum).is_file()
    }

    /// Opens the blob for reading; fails with `NotFound` if absent.
    pub fn read(&self, checksum: &Checksum) -> SyncResult<File> {
        File::open(self.blob_path(checksum)).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                SyncError::NotFound(format!("blob {checksum}"))
            } else {
                SyncError::Io(e)
            }
        })
    }

    /// Opens a scoped writer. `expected` is the checksum the caller claims
    /// the bytes will hash to; [`BlobWriter::finish`] verifies it and
    /// atomically renames the blob into its bucket on success.
    pub fn write(&self, expected: Option<Checksum>) -> SyncResult<BlobWriter> {
        fs::create_dir_all(&self.root)?;
        let temp = NamedTempFile::new_in(&self.root)?;
        Ok(BlobWriter {
            temp,
            hasher: sha1::Sha1::new(),
            root: self.root.clone(),
            expected,
        })
    }
}

/// A write-in-progress blob: hashes everything written, then renames into
/// its bucket on [`finish`](BlobWriter::finish).
pub struct BlobWriter {
    temp: NamedTempFile,
    hasher: sha1::Sha1,
    root: PathBuf,
    expected: Option<Checksum>,
}

impl Write for BlobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.temp.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}

impl BlobWriter {
    /// Finalizes the digest, checks it against the expected checksum if one
    /// was supplied, and renames the temp file into its bucket directory.
    /// Returns the checksum the bytes actually hashed to.
    pub fn finish(self) -> SyncResult<Checksum> {
        let digest: [u8; 20] = self.hasher.finalize().into();
        let actual = Checksum::from_bytes(digest);

        if let Some(expected) = self.expected {
            if expected != actual {
                return Err(SyncError::ChecksumMismatch { expected, actual });
            }
        }

        let (bucket, rest) = actual.bucket();
        let bucket_dir = self.root.join(bucket);
        fs::create_dir_all(&bucket_dir)?;
        self.temp.persist(bucket_dir.join(rest)).map_err(|e| e.error)?;
        tracing::debug!(checksum = %actual, "blob committed");
        Ok(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let mut w = store.write(None).unwrap();
        w.write_all(b"some data").unwrap();
        let ck = w.finish().unwrap();
        assert_eq!(ck.to_string(), "baf34551fecb48acc3da868eb85e1b6dac9de356");
        assert!(store.contains(&ck));

        let mut f = store.read(&ck).unwrap();
        let mut out = Vec::new();
        f.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"some data");
    }

    #[test]
    fn mismatched_expected_checksum_is_rejected_and_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let bogus: Checksum = "0000000000000000000000000000000000000a".parse().unwrap();

        let mut w = store.write(Some(bogus)).unwrap();
        w.write_all(b"some data").unwrap();
        let err = w.finish().unwrap_err();
        assert!(matches!(err, SyncError::ChecksumMismatch { .. }));
        assert!(!store.contains(&bogus));
    }

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let ck: Checksum = "0000000000000000000000000000000000000a".parse().unwrap();
        assert!(matches!(store.read(&ck), Err(SyncError::NotFound(_))));
    }

    #[test]
    fn no_temp_files_leak_into_bucket_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let mut w = store.write(None).unwrap();
        w.write_all(b"x").unwrap();
        let ck = w.finish().unwrap();
        let (bucket, _) = ck.bucket();
        let entries: Vec<_> = fs::read_dir(dir.path().join(bucket))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }
}
