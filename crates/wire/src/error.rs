use std::io;

use thiserror::Error;

/// Result alias used across the mfsync workspace.
pub type SyncResult<T> = Result<T, SyncError>;

/// The error taxonomy shared by every layer above the wire (spec §7).
///
/// Each variant maps to a distinct observable behavior: `TransportClosed`
/// aborts the session outright, `ProtocolError` sends `error(report)` before
/// closing, `ChecksumMismatch` aborts before any version file is written, and
/// so on. Lower crates (`blobstore`, `repo`, `merge`) return this type
/// directly rather than defining their own, since nearly every one of their
/// failure modes is already named here.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The underlying stream hit EOF or a broken pipe mid-frame.
    #[error("transport closed")]
    TransportClosed,

    /// An unexpected tag or malformed payload arrived.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// An uploaded blob's hash did not match its declared checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: crate::Checksum,
        actual: crate::Checksum,
    },

    /// A referenced blob or version is missing from the repository.
    #[error("not found: {0}")]
    NotFound(String),

    /// An attempt was made to write a version number that already exists.
    #[error("version {0} already exists")]
    VersionExists(u64),

    /// A duplicate path, negative size, or malformed checksum was observed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Wraps a lower-level I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SyncError {
    /// Whether this error should be reported to the peer as `error(report)`
    /// (every kind except `TransportClosed`, which means there is no peer
    /// left to report to).
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !matches!(self, Self::TransportClosed)
    }
}
