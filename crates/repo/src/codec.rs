//! Line-oriented version index codec (spec §4.3, component `C3`).
//!
//! Each line is `"<40hex>" <10-digit-size> "<json path>"\n`, sorted by path
//! ascending in the canonical writer. The reader is lenient about the
//! amount of inter-token whitespace but strict about the grammar.

use std::collections::HashSet;

use wire::{Checksum, FileItem, SyncError, SyncResult};

/// Decodes a full version-index file (spec: zero bytes decodes to the
/// empty set).
pub fn decode(text: &str) -> SyncResult<HashSet<FileItem>> {
    let mut items = HashSet::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        items.insert(decode_line(line)?);
    }
    Ok(items)
}

/// Encodes a set of items into the canonical text form, sorted by path.
pub fn encode(items: impl IntoIterator<Item = FileItem>) -> String {
    let mut sorted: Vec<FileItem> = items.into_iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut out = String::new();
    for item in sorted {
        encode_line(&mut out, &item);
    }
    out
}

fn encode_line(out: &mut String, item: &FileItem) {
    let path_json = serde_json::to_string(&item.path).expect("string serialization cannot fail");
    out.push_str(&format!(
        "\"{}\" {:>10} {}\n",
        item.checksum, item.size, path_json
    ));
}

fn malformed(line: &str) -> SyncError {
    SyncError::InvariantViolation(format!("malformed version-index entry: {line:?}"))
}

fn decode_line(line: &str) -> SyncResult<FileItem> {
    let rest = line.trim_start();
    let rest = rest.strip_prefix('"').ok_or_else(|| malformed(line))?;
    let close = rest.find('"').ok_or_else(|| malformed(line))?;
    let checksum: Checksum = rest[..close].parse()?;
    let rest = rest[close + 1..].trim_start();

    let size_end = rest
        .find(|c: char| c.is_whitespace())
        .ok_or_else(|| malformed(line))?;
    let size: u64 = rest[..size_end]
        .parse()
        .map_err(|_| malformed(line))?;
    let rest = rest[size_end..].trim();

    if !rest.starts_with('"') || !rest.ends_with('"') || rest.len() < 2 {
        return Err(malformed(line));
    }
    let path: String = serde_json::from_str(rest).map_err(|_| malformed(line))?;

    Ok(FileItem::new(path, checksum, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_decodes_to_empty_set() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn round_trips_arbitrary_unicode_paths() {
        let ck: Checksum = "baf34551fecb48acc3da868eb85e1b6dac9de356".parse().unwrap();
        let items = vec![
            FileItem::new("a/b.txt", ck, 9),
            FileItem::new("emoji/\u{1f600}.png", ck, 1234567),
            FileItem::new("quote/\"fancy\".txt", ck, 0),
        ];
        let encoded = encode(items.clone());
        let decoded: HashSet<FileItem> = decode(&encoded).unwrap();
        let expected: HashSet<FileItem> = items.into_iter().collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn accepts_extra_inter_token_whitespace() {
        let line = "\"baf34551fecb48acc3da868eb85e1b6dac9de356\"      9   \"some data.txt\"\n";
        let item = decode_line(line).unwrap();
        assert_eq!(item.path, "some data.txt");
        assert_eq!(item.size, 9);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(decode("not a valid line\n").is_err());
    }

    #[test]
    fn canonical_writer_sorts_by_path() {
        let ck: Checksum = "baf34551fecb48acc3da868eb85e1b6dac9de356".parse().unwrap();
        let items = vec![
            FileItem::new("z.txt", ck, 1),
            FileItem::new("a.txt", ck, 1),
        ];
        let encoded = encode(items);
        let first_line = encoded.lines().next().unwrap();
        assert!(first_line.ends_with("\"a.txt\""));
    }
}
