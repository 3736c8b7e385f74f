//! # Overview
//!
//! `wire` implements the framed, tagged-message channel that carries an
//! entire mfsync session (spec §4.1, component `C1`), plus the checksum,
//! file-item, and error types every other crate in the workspace builds on.
//!
//! # Design
//!
//! Frames are a closed discriminated union ([`Frame`]) rather than a
//! dynamically tagged payload, decoded by a single-byte tag followed by a
//! deterministic binary encoding (see [`codec`]). [`Channel`] wraps an
//! input and output byte stream and exposes `send`/`recv` plus the chunked
//! `send_file`/`recv_file` pair used during blob transfer.
//!
//! # Invariants
//!
//! - `file_chunk`/`file_end` sequences never interleave with other frames;
//!   callers only invoke `send_file`/`recv_file` inside a transfer phase
//!   the surrounding protocol has already opened.
//! - `recv` surfaces EOF before a frame boundary as `SyncError::TransportClosed`,
//!   never a bare I/O error, so callers can match on it directly.

mod channel;
mod checksum;
mod codec;
mod error;
mod frame;
mod item;

pub use channel::{Channel, CHUNK_SIZE};
pub use checksum::Checksum;
pub use error::{SyncError, SyncResult};
pub use frame::Frame;
pub use item::FileItem;
