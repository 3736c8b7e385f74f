use crate::Checksum;

/// One file's identity within a snapshot (spec §3 `FileItem`).
///
/// `time` is local-only bookkeeping for the client's walker cache: it is
/// never transmitted on the wire and never persisted in a version index.
/// Every `FileItem` constructed by the server, by the version codec, or by
/// `file_meta` deserialization therefore carries `time: None`, which is why
/// a plain derived `Eq`/`Hash` on all four fields is sound for every
/// cross-boundary comparison the protocol and merge engine perform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileItem {
    pub path: String,
    pub checksum: Checksum,
    pub size: u64,
    pub time: Option<i64>,
}

impl FileItem {
    #[must_use]
    pub fn new(path: impl Into<String>, checksum: Checksum, size: u64) -> Self {
        Self {
            path: path.into(),
            checksum,
            size,
            time: None,
        }
    }

    /// Strips `time`, the form every item takes once it crosses the wire or
    /// is written to a version index.
    #[must_use]
    pub fn without_time(&self) -> Self {
        Self {
            path: self.path.clone(),
            checksum: self.checksum,
            size: self.size,
            time: None,
        }
    }

    /// Content equality ignoring `time`, used by the merge engine (spec
    /// §4.5: "Equality of items uses (checksum, size) on the same path").
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.checksum == other.checksum && self.size == other.size
    }
}
