use std::io::{Read, Write};

use crate::codec::{
    read_bytes, read_checksum, read_item, read_item_list, read_str, read_varint, write_bytes,
    write_checksum, write_item, write_item_list, write_str, write_varint,
};
use crate::error::{SyncError, SyncResult};
use crate::{Checksum, FileItem};

/// The full tag set of spec §6, modeled as a discriminated union rather
/// than a dynamically tagged payload (spec §9, "Dynamic tagged messages ->
/// sum type").
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Sync { base: u64 },
    WaitingForFiles,
    FileMeta(FileItem),
    Done,
    Data { checksum: Checksum },
    FileChunk(Vec<u8>),
    FileEnd,
    FileBegin(FileItem),
    FileRemove(FileItem),
    SyncComplete { version: u64 },
    CommitDiff { added: Vec<FileItem>, removed: Vec<FileItem> },
    Quit,
    Bye,
    Error(String),
}

impl Frame {
    /// Short name used in `ProtocolError` messages and log lines.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Sync { .. } => "sync",
            Self::WaitingForFiles => "waiting_for_files",
            Self::FileMeta(_) => "file_meta",
            Self::Done => "done",
            Self::Data { .. } => "data",
            Self::FileChunk(_) => "file_chunk",
            Self::FileEnd => "file_end",
            Self::FileBegin(_) => "file_begin",
            Self::FileRemove(_) => "file_remove",
            Self::SyncComplete { .. } => "sync_complete",
            Self::CommitDiff { .. } => "commit_diff",
            Self::Quit => "quit",
            Self::Bye => "bye",
            Self::Error(_) => "error",
        }
    }

    const TAG_SYNC: u8 = 0;
    const TAG_WAITING_FOR_FILES: u8 = 1;
    const TAG_FILE_META: u8 = 2;
    const TAG_DONE: u8 = 3;
    const TAG_DATA: u8 = 4;
    const TAG_FILE_CHUNK: u8 = 5;
    const TAG_FILE_END: u8 = 6;
    const TAG_FILE_BEGIN: u8 = 7;
    const TAG_FILE_REMOVE: u8 = 8;
    const TAG_SYNC_COMPLETE: u8 = 9;
    const TAG_COMMIT_DIFF: u8 = 10;
    const TAG_QUIT: u8 = 11;
    const TAG_BYE: u8 = 12;
    const TAG_ERROR: u8 = 13;

    pub(crate) fn encode<W: Write>(&self, w: &mut W) -> SyncResult<()> {
        match self {
            Self::Sync { base } => {
                w.write_all(&[Self::TAG_SYNC])?;
                write_varint(w, *base)?;
            }
            Self::WaitingForFiles => w.write_all(&[Self::TAG_WAITING_FOR_FILES])?,
            Self::FileMeta(item) => {
                w.write_all(&[Self::TAG_FILE_META])?;
                write_item(w, item)?;
            }
            Self::Done => w.write_all(&[Self::TAG_DONE])?,
            Self::Data { checksum } => {
                w.write_all(&[Self::TAG_DATA])?;
                write_checksum(w, checksum)?;
            }
            Self::FileChunk(bytes) => {
                w.write_all(&[Self::TAG_FILE_CHUNK])?;
                write_bytes(w, bytes)?;
            }
            Self::FileEnd => w.write_all(&[Self::TAG_FILE_END])?,
            Self::FileBegin(item) => {
                w.write_all(&[Self::TAG_FILE_BEGIN])?;
                write_item(w, item)?;
            }
            Self::FileRemove(item) => {
                w.write_all(&[Self::TAG_FILE_REMOVE])?;
                write_item(w, item)?;
            }
            Self::SyncComplete { version } => {
                w.write_all(&[Self::TAG_SYNC_COMPLETE])?;
                write_varint(w, *version)?;
            }
            Self::CommitDiff { added, removed } => {
                w.write_all(&[Self::TAG_COMMIT_DIFF])?;
                write_item_list(w, added)?;
                write_item_list(w, removed)?;
            }
            Self::Quit => w.write_all(&[Self::TAG_QUIT])?,
            Self::Bye => w.write_all(&[Self::TAG_BYE])?,
            Self::Error(report) => {
                w.write_all(&[Self::TAG_ERROR])?;
                write_str(w, report)?;
            }
        }
        Ok(())
    }

    pub(crate) fn decode<R: Read>(r: &mut R) -> SyncResult<Self> {
        let mut tag = [0u8; 1];
        match r.read_exact(&mut tag) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(SyncError::TransportClosed);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(match tag[0] {
            Self::TAG_SYNC => Self::Sync { base: read_varint(r)? },
            Self::TAG_WAITING_FOR_FILES => Self::WaitingForFiles,
            Self::TAG_FILE_META => Self::FileMeta(read_item(r)?),
            Self::TAG_DONE => Self::Done,
            Self::TAG_DATA => Self::Data { checksum: read_checksum(r)? },
            Self::TAG_FILE_CHUNK => Self::FileChunk(read_bytes(r)?),
            Self::TAG_FILE_END => Self::FileEnd,
            Self::TAG_FILE_BEGIN => Self::FileBegin(read_item(r)?),
            Self::TAG_FILE_REMOVE => Self::FileRemove(read_item(r)?),
            Self::TAG_SYNC_COMPLETE => Self::SyncComplete { version: read_varint(r)? },
            Self::TAG_COMMIT_DIFF => Self::CommitDiff {
                added: read_item_list(r)?,
                removed: read_item_list(r)?,
            },
            Self::TAG_QUIT => Self::Quit,
            Self::TAG_BYE => Self::Bye,
            Self::TAG_ERROR => Self::Error(read_str(r)?),
            other => {
                return Err(SyncError::ProtocolError(format!("unknown frame tag {other}")));
            }
        })
    }
}
