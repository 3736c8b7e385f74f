use std::io::{BufReader, Read, Write};

use crate::error::{SyncError, SyncResult};
use crate::frame::Frame;

/// Fixed chunk size for file streaming (spec §4.1): keeping this observable
/// at exactly 64 KiB is load-bearing for the chunk-boundary assertions in
/// the end-to-end scenarios (spec §8, scenario 2).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A bidirectional tagged-message channel over two independent byte streams
/// (spec §4.1 `C1`). `R` and `W` are typically a child process's stdout and
/// stdin respectively.
pub struct Channel<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R: Read, W: Write> Channel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Sends a frame and flushes the underlying writer.
    pub fn send(&mut self, frame: &Frame) -> SyncResult<()> {
        frame.encode(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Blocks until a full frame arrives; fails with `TransportClosed` on
    /// EOF before a frame boundary.
    pub fn recv(&mut self) -> SyncResult<Frame> {
        Frame::decode(&mut self.reader)
    }

    /// Streams `reader` out as `file_chunk` frames of at most
    /// [`CHUNK_SIZE`] bytes, followed by `file_end`.
    pub fn send_file(
        &mut self,
        reader: &mut dyn Read,
        progress: &mut dyn FnMut(usize),
    ) -> SyncResult<()> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.send(&Frame::FileChunk(buf[..n].to_vec()))?;
            progress(n);
        }
        self.send(&Frame::FileEnd)
    }

    /// Receives `file_chunk` frames into `writer` until `file_end`.
    pub fn recv_file(
        &mut self,
        writer: &mut dyn Write,
        progress: &mut dyn FnMut(usize),
    ) -> SyncResult<()> {
        loop {
            match self.recv()? {
                Frame::FileChunk(bytes) => {
                    writer.write_all(&bytes)?;
                    progress(bytes.len());
                }
                Frame::FileEnd => return Ok(()),
                other => {
                    return Err(SyncError::ProtocolError(format!(
                        "expected file_chunk or file_end, got {}",
                        other.tag()
                    )));
                }
            }
        }
    }

    /// Sends a textual error report; the receiver should treat the session
    /// as aborted.
    pub fn send_error(&mut self, report: impl Into<String>) -> SyncResult<()> {
        self.send(&Frame::Error(report.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Checksum, FileItem};
    use std::io::Cursor;

    fn roundtrip(frame: Frame) -> Frame {
        let mut buf = Vec::new();
        {
            let mut ch = Channel::new(Cursor::new(Vec::new()), &mut buf);
            ch.send(&frame).unwrap();
        }
        let mut ch = Channel::new(Cursor::new(buf), Vec::new());
        ch.recv().unwrap()
    }

    #[test]
    fn frames_round_trip() {
        assert_eq!(roundtrip(Frame::Sync { base: 7 }), Frame::Sync { base: 7 });
        assert_eq!(roundtrip(Frame::WaitingForFiles), Frame::WaitingForFiles);
        assert_eq!(roundtrip(Frame::Done), Frame::Done);
        assert_eq!(roundtrip(Frame::Quit), Frame::Quit);
        assert_eq!(roundtrip(Frame::Bye), Frame::Bye);
        assert_eq!(
            roundtrip(Frame::Error("boom".into())),
            Frame::Error("boom".into())
        );

        let ck: Checksum = "baf34551fecb48acc3da868eb85e1b6dac9de356".parse().unwrap();
        let item = FileItem::new("a/b.txt", ck, 42);
        assert_eq!(roundtrip(Frame::FileMeta(item.clone())), Frame::FileMeta(item.clone()));
        assert_eq!(roundtrip(Frame::FileBegin(item.clone())), Frame::FileBegin(item.clone()));
        assert_eq!(roundtrip(Frame::FileRemove(item.clone())), Frame::FileRemove(item.clone()));
        assert_eq!(roundtrip(Frame::Data { checksum: ck }), Frame::Data { checksum: ck });
        assert_eq!(
            roundtrip(Frame::SyncComplete { version: 3 }),
            Frame::SyncComplete { version: 3 }
        );
        assert_eq!(
            roundtrip(Frame::CommitDiff {
                added: vec![item.clone()],
                removed: vec![],
            }),
            Frame::CommitDiff {
                added: vec![item],
                removed: vec![],
            }
        );
    }

    #[test]
    fn send_file_chunks_at_chunk_size_boundaries() {
        let data = vec![7u8; CHUNK_SIZE + 10];
        let mut wire = Vec::new();
        {
            let mut ch = Channel::new(Cursor::new(Vec::new()), &mut wire);
            let mut total = 0usize;
            ch.send_file(&mut Cursor::new(data.clone()), &mut |n| total += n)
                .unwrap();
            assert_eq!(total, data.len());
        }

        let mut ch = Channel::new(Cursor::new(wire), Vec::new());
        let mut out = Vec::new();
        let mut received = 0usize;
        ch.recv_file(&mut out, &mut |n| received += n).unwrap();
        assert_eq!(out, data);
        assert_eq!(received, data.len());
    }

    #[test]
    fn recv_on_empty_stream_is_transport_closed() {
        let mut ch = Channel::new(Cursor::new(Vec::<u8>::new()), Vec::new());
        assert!(matches!(ch.recv(), Err(SyncError::TransportClosed)));
    }

    #[test]
    fn recv_file_rejects_foreign_tag() {
        let mut wire = Vec::new();
        {
            let mut ch = Channel::new(Cursor::new(Vec::new()), &mut wire);
            ch.send(&Frame::Quit).unwrap();
        }
        let mut ch = Channel::new(Cursor::new(wire), Vec::new());
        let mut out = Vec::new();
        let err = ch.recv_file(&mut out, &mut |_| {}).unwrap_err();
        assert!(matches!(err, SyncError::ProtocolError(_)));
    }
}
