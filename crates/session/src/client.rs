//! Client session state machine (spec §4.7, component `C7`). Grounded on
//! `magicfolder/client.py::ClientRepo`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use ui::Ui;
use walk::Cache;
use wire::{Channel, Checksum, FileItem, Frame, SyncError, SyncResult};

const REMOTE_FILE: &str = "remote";
const LAST_SYNC_FILE: &str = "last_sync";
const CACHE_FILE: &str = "cache";

/// Creates a client working tree's private directory, `remote`, and
/// `last_sync = 0` (`magicfolder/client.py::client_init`).
pub fn init_working_tree(root: &Path, private_dir: &str, remote: &str) -> SyncResult<()> {
    let private = root.join(private_dir);
    fs::create_dir_all(&private)?;
    fs::write(private.join(REMOTE_FILE), format!("{remote}\n"))?;
    fs::write(private.join(LAST_SYNC_FILE), "0\n")?;
    Ok(())
}

/// Reads `.<private>/remote`.
pub fn read_remote(root: &Path, private_dir: &str) -> SyncResult<String> {
    let text = fs::read_to_string(root.join(private_dir).join(REMOTE_FILE))?;
    Ok(text.trim().to_string())
}

/// Runs one full client-side session over `channel` against the working
/// tree at `root`.
pub fn run_client<R: Read, W: Write>(
    root: &Path,
    private_dir: &str,
    channel: &mut Channel<R, W>,
    paranoid: bool,
    ui: &mut dyn Ui,
) -> SyncResult<()> {
    let last_sync_path = root.join(private_dir).join(LAST_SYNC_FILE);
    let cache_path = root.join(private_dir).join(CACHE_FILE);
    let base = read_last_sync(&last_sync_path)?;

    channel.send(&Frame::Sync { base })?;
    match channel.recv()? {
        Frame::WaitingForFiles => {}
        Frame::Error(report) => return Err(SyncError::ProtocolError(report)),
        other => return Err(unexpected("waiting_for_files", &other)),
    }

    let cache = if paranoid { None } else { Some(Cache::load(&cache_path)) };
    let entries = walk::walk(root, private_dir, cache.as_ref(), paranoid)?;
    Cache::save(&cache_path, &entries)?;

    let mut by_checksum: HashMap<Checksum, PathBuf> = HashMap::new();
    for entry in &entries {
        channel.send(&Frame::FileMeta(FileItem::new(
            entry.relative_path.clone(),
            entry.checksum,
            entry.size,
        )))?;
        by_checksum.insert(entry.checksum, entry.fs_path.clone());
    }
    channel.send(&Frame::Done)?;

    let (version, added, removed) = receive_update(channel, root, &by_checksum, ui)?;

    if version < base {
        return Err(SyncError::ProtocolError(format!(
            "server went backwards: version {version} < base {base}"
        )));
    }
    write_last_sync(&last_sync_path, version)?;
    ui.commit_diff(version, &added, &removed);

    channel.send(&Frame::Quit)?;
    match channel.recv()? {
        Frame::Bye => Ok(()),
        other => Err(unexpected("bye", &other)),
    }
}

fn receive_update<R: Read, W: Write>(
    channel: &mut Channel<R, W>,
    root: &Path,
    by_checksum: &HashMap<Checksum, PathBuf>,
    ui: &mut dyn Ui,
) -> SyncResult<(u64, Vec<FileItem>, Vec<FileItem>)> {
    let mut version = None;
    loop {
        match channel.recv()? {
            Frame::Data { checksum } => {
                let fs_path = by_checksum.get(&checksum).ok_or_else(|| {
                    SyncError::ProtocolError(format!("server asked for unknown checksum {checksum}"))
                })?;
                let mut file = File::open(fs_path)?;
                ui.status_line(&format!("uploading {}", fs_path.display()));
                channel.send_file(&mut file, &mut |_| {})?;
            }
            Frame::FileBegin(item) => {
                let dest = root.join(&item.path);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut file = File::create(&dest)?;
                ui.status_line(&format!("downloading {}", item.path));
                channel.recv_file(&mut file, &mut |_| {})?;
            }
            Frame::FileRemove(item) => {
                let dest = root.join(&item.path);
                fs::remove_file(&dest).or_else(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Ok(())
                    } else {
                        Err(e)
                    }
                })?;
                prune_empty_ancestors(root, &dest);
            }
            Frame::SyncComplete { version: v } => version = Some(v),
            Frame::CommitDiff { added, removed } => {
                ui.clear_status();
                let version = version.ok_or_else(|| {
                    SyncError::ProtocolError("commit_diff arrived before sync_complete".into())
                })?;
                return Ok((version, added, removed));
            }
            Frame::Error(report) => return Err(SyncError::ProtocolError(report)),
            other => return Err(unexpected("data/file_begin/file_remove/sync_complete/commit_diff", &other)),
        }
    }
}

/// Removes now-empty ancestor directories of `removed_path`, stopping at
/// `root` (`magicfolder/client.py` deletes files but leaves pruning
/// implicit; made explicit here per spec §4.7).
fn prune_empty_ancestors(root: &Path, removed_path: &Path) {
    let mut dir = removed_path.parent();
    while let Some(d) = dir {
        if d == root {
            break;
        }
        match fs::read_dir(d) {
            Ok(mut entries) if entries.next().is_none() => {
                if fs::remove_dir(d).is_err() {
                    break;
                }
                dir = d.parent();
            }
            _ => break,
        }
    }
}

fn read_last_sync(path: &Path) -> SyncResult<u64> {
    let text = fs::read_to_string(path)?;
    text.trim()
        .parse()
        .map_err(|_| SyncError::InvariantViolation(format!("malformed last_sync file: {text:?}")))
}

fn write_last_sync(path: &Path, version: u64) -> SyncResult<()> {
    let parent = path.parent().expect("last_sync path has a parent directory");
    let mut temp = NamedTempFile::new_in(parent)?;
    writeln!(temp, "{version}")?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn unexpected(expected: &str, got: &Frame) -> SyncError {
    SyncError::ProtocolError(format!("expected {expected}, got {}", got.tag()))
}
