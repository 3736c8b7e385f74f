//! # Overview
//!
//! `walk` is the filesystem walker collaborator (spec §6): it scans a
//! working tree and emits one [`WalkEntry`] per file, skipping the private
//! metadata directory and any path matched by `.mfignore`. Re-scans can be
//! accelerated by an on-disk `(size, mtime)` cache unless `--paranoid`
//! forces full rehashing.
//!
//! # Design
//!
//! This crate is a `session`/`cli` collaborator, not part of the core the
//! spec budgets precisely (§1: "the filesystem walker ... specified only at
//! their interface"). The cache format is a small hand-rolled line format
//! rather than a new serialization dependency, deliberately mirroring the
//! rest of the workspace's preference for the teacher's own codec style
//! over pulling in `serde`/`bincode` for internal bookkeeping.

mod cache;
mod ignore;

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use digest::Digest;
use wire::{Checksum, SyncResult};

pub use cache::Cache;
pub use ignore::IgnoreSet;

const READ_CHUNK: usize = 64 * 1024;

/// One file found during a walk, with enough identity to build a
/// `FileItem` (spec §3) plus the local-only `time` a caller may keep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry {
    pub relative_path: String,
    pub fs_path: PathBuf,
    pub checksum: Checksum,
    pub size: u64,
    pub mtime: i64,
}

/// Walks `root`, skipping `private_dir` (the client's metadata directory,
/// e.g. `.mfsync`) and anything matched by an `.mfignore` file at `root`.
///
/// When `cache` is `Some` and `paranoid` is `false`, entries whose
/// `(size, mtime)` match the cached record reuse the cached checksum
/// instead of rehashing. The returned entries are sorted by
/// `relative_path` ascending so callers get deterministic `file_meta`
/// ordering without an extra sort pass.
pub fn walk(
    root: &Path,
    private_dir: &str,
    cache: Option<&Cache>,
    paranoid: bool,
) -> SyncResult<Vec<WalkEntry>> {
    let ignore = IgnoreSet::load(root)?;
    let mut entries = Vec::new();
    walk_dir(root, root, private_dir, &ignore, cache, paranoid, &mut entries)?;
    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    private_dir: &str,
    ignore: &IgnoreSet,
    cache: Option<&Cache>,
    paranoid: bool,
    out: &mut Vec<WalkEntry>,
) -> SyncResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if dir == root && (file_name == private_dir || file_name == ignore::FILE_NAME) {
            continue;
        }
        let fs_path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(root, &fs_path, private_dir, ignore, cache, paranoid, out)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let relative_path = relative_slash_path(root, &fs_path);
        if ignore.is_excluded(&relative_path) {
            continue;
        }

        let metadata = entry.metadata()?;
        let size = metadata.len();
        let mtime = mtime_secs(&metadata);

        let checksum = if paranoid {
            hash_file(&fs_path)?
        } else {
            match cache.and_then(|c| c.lookup(&relative_path, size, mtime)) {
                Some(checksum) => checksum,
                None => hash_file(&fs_path)?,
            }
        };

        out.push(WalkEntry {
            relative_path,
            fs_path,
            checksum,
            size,
            mtime,
        });
    }
    Ok(())
}

fn relative_slash_path(root: &Path, fs_path: &Path) -> String {
    let rel = fs_path.strip_prefix(root).expect("fs_path is under root");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn mtime_secs(metadata: &fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    metadata.mtime()
}

#[cfg(not(unix))]
fn mtime_secs(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs() as i64)
}

fn hash_file(fs_path: &Path) -> SyncResult<Checksum> {
    let mut file = File::open(fs_path)?;
    let mut hasher = sha1::Sha1::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest: [u8; 20] = hasher.finalize().into();
    Ok(Checksum::from_bytes(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walk_skips_private_dir_and_sorts_by_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".mfsync")).unwrap();
        fs::write(dir.path().join(".mfsync/cache"), b"junk").unwrap();
        fs::write(dir.path().join("z.txt"), b"z").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let entries = walk(dir.path(), ".mfsync", None, false).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "z.txt"]);
    }

    #[test]
    fn walk_recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/nested.txt"), b"x").unwrap();

        let entries = walk(dir.path(), ".mfsync", None, false).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path, "sub/nested.txt");
    }

    #[test]
    fn walk_honors_mfignore_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".mfignore"), "*.log\n").unwrap();
        fs::write(dir.path().join("keep.txt"), b"keep").unwrap();
        fs::write(dir.path().join("skip.log"), b"skip").unwrap();

        let entries = walk(dir.path(), ".mfsync", None, false).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["keep.txt"]);
    }
}
