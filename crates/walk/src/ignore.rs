//! `.mfignore` glob matching (spec §9, "Open question — ignore-file
//! semantics"): one glob pattern per line, blank lines and `#`-prefixed
//! lines skipped, matched against the slash-normalized relative path.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use wire::SyncResult;

pub const FILE_NAME: &str = ".mfignore";

pub struct IgnoreSet {
    set: Option<GlobSet>,
}

impl IgnoreSet {
    pub fn load(root: &Path) -> SyncResult<Self> {
        let path = root.join(FILE_NAME);
        let Ok(text) = fs::read_to_string(&path) else {
            return Ok(Self { set: None });
        };

        let mut builder = GlobSetBuilder::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            builder.add(Glob::new(line).map_err(|e| {
                wire::SyncError::InvariantViolation(format!("bad .mfignore pattern {line:?}: {e}"))
            })?);
        }
        Ok(Self {
            set: Some(builder.build().map_err(|e| {
                wire::SyncError::InvariantViolation(format!("bad .mfignore: {e}"))
            })?),
        })
    }

    #[must_use]
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(relative_path),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ignore_file_excludes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ignore = IgnoreSet::load(dir.path()).unwrap();
        assert!(!ignore.is_excluded("anything.txt"));
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE_NAME), "\n# comment\n*.tmp\n").unwrap();
        let ignore = IgnoreSet::load(dir.path()).unwrap();
        assert!(ignore.is_excluded("build.tmp"));
        assert!(!ignore.is_excluded("build.rs"));
    }
}
