//! Byte-level primitives for the tagged-record wire format.
//!
//! Every frame is `<tag: u8> <payload>`. Integers are LEB128 varints,
//! strings and chunks are a varint length followed by raw bytes. This is a
//! hand-rolled binary encoding rather than a general-purpose serialization
//! crate: the wire format only ever needs to carry the handful of shapes
//! spec §4.1 names (tags, `none`, nested records, sets of `FileItem`), and a
//! small encoder makes byte-for-byte determinism (spec's testable property)
//! trivial to reason about.

use std::io::{self, Read, Write};

use crate::{Checksum, FileItem};

pub(crate) fn write_varint<W: Write>(w: &mut W, mut value: u64) -> io::Result<()> {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        w.write_all(&[byte])?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

pub(crate) fn read_varint<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)?;
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(value)
}

pub(crate) fn write_bytes<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    write_varint(w, data.len() as u64)?;
    w.write_all(data)
}

pub(crate) fn read_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = read_varint(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub(crate) fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_bytes(w, s.as_bytes())
}

pub(crate) fn read_str<R: Read>(r: &mut R) -> io::Result<String> {
    let bytes = read_bytes(r)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub(crate) fn write_checksum<W: Write>(w: &mut W, ck: &Checksum) -> io::Result<()> {
    w.write_all(ck.as_bytes())
}

pub(crate) fn read_checksum<R: Read>(r: &mut R) -> io::Result<Checksum> {
    let mut buf = [0u8; Checksum::LEN];
    r.read_exact(&mut buf)?;
    Ok(Checksum::from_bytes(buf))
}

pub(crate) fn write_item<W: Write>(w: &mut W, item: &FileItem) -> io::Result<()> {
    write_str(w, &item.path)?;
    write_checksum(w, &item.checksum)?;
    write_varint(w, item.size)
}

pub(crate) fn read_item<R: Read>(r: &mut R) -> io::Result<FileItem> {
    let path = read_str(r)?;
    let checksum = read_checksum(r)?;
    let size = read_varint(r)?;
    Ok(FileItem::new(path, checksum, size))
}

pub(crate) fn write_item_list<W: Write>(w: &mut W, items: &[FileItem]) -> io::Result<()> {
    write_varint(w, items.len() as u64)?;
    for item in items {
        write_item(w, item)?;
    }
    Ok(())
}

pub(crate) fn read_item_list<R: Read>(r: &mut R) -> io::Result<Vec<FileItem>> {
    let len = read_varint(r)?;
    (0..len).map(|_| read_item(r)).collect()
}
