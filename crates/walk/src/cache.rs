//! On-disk `(size, mtime) -> checksum` cache (spec §11, ported from
//! `checksum.py::repo_file_events`'s pickle cache). The format is a small
//! hand-rolled line format, one entry per line:
//! `<size>\t<mtime>\t<checksum>\t<path>\n`, matching the rest of the
//! workspace's preference for purpose-built codecs over a new
//! serialization dependency for internal bookkeeping.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use wire::{Checksum, SyncResult};

use crate::WalkEntry;

pub struct Cache {
    entries: HashMap<String, (u64, i64, Checksum)>,
}

impl Cache {
    /// Loads a cache file; a missing or unreadable file yields an empty
    /// cache rather than an error, since the cache is always regenerable.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let mut entries = HashMap::new();
        if let Ok(text) = fs::read_to_string(path) {
            for line in text.lines() {
                if let Some(entry) = parse_line(line) {
                    entries.insert(entry.0, (entry.1, entry.2, entry.3));
                }
            }
        }
        Self { entries }
    }

    /// Returns the cached checksum for `relative_path` if its `(size,
    /// mtime)` matches exactly.
    #[must_use]
    pub fn lookup(&self, relative_path: &str, size: u64, mtime: i64) -> Option<Checksum> {
        self.entries.get(relative_path).and_then(|&(s, t, ck)| {
            if s == size && t == mtime {
                Some(ck)
            } else {
                None
            }
        })
    }

    /// Atomically rewrites `path` with one line per entry in `fresh`.
    pub fn save(path: &Path, fresh: &[WalkEntry]) -> SyncResult<()> {
        let parent = path.parent().expect("cache path has a parent directory");
        let mut temp = NamedTempFile::new_in(parent)?;
        for entry in fresh {
            writeln!(
                temp,
                "{}\t{}\t{}\t{}",
                entry.size, entry.mtime, entry.checksum, entry.relative_path
            )?;
        }
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<(String, u64, i64, Checksum)> {
    let mut parts = line.splitn(4, '\t');
    let size: u64 = parts.next()?.parse().ok()?;
    let mtime: i64 = parts.next()?.parse().ok()?;
    let checksum: Checksum = parts.next()?.parse().ok()?;
    let path = parts.next()?.to_string();
    Some((path, size, mtime, checksum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ck(byte: u8) -> Checksum {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        Checksum::from_bytes(bytes)
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache");
        let entries = vec![WalkEntry {
            relative_path: "a.txt".into(),
            fs_path: PathBuf::from("a.txt"),
            checksum: ck(1),
            size: 9,
            mtime: 1_700_000_000,
        }];
        Cache::save(&cache_path, &entries).unwrap();

        let cache = Cache::load(&cache_path);
        assert_eq!(cache.lookup("a.txt", 9, 1_700_000_000), Some(ck(1)));
        assert_eq!(cache.lookup("a.txt", 9, 1), None);
    }

    #[test]
    fn missing_cache_file_is_empty() {
        let cache = Cache::load(Path::new("/nonexistent/cache"));
        assert_eq!(cache.lookup("a.txt", 1, 1), None);
    }
}
