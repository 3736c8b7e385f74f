//! Server session state machine (spec §4.6, component `C6`):
//! `AwaitSync -> LoadIndices -> AwaitMeta -> FetchMissing -> Reconcile ->
//! PushUpdate -> AwaitQuit -> Done`. Grounded on `magicfolder/server.py::server_sync`.

use std::collections::HashSet;
use std::io::{Read, Write};

use repo::Repository;
use wire::{Channel, FileItem, Frame, SyncError, SyncResult};

/// Runs one full server-side session against `repo`, reporting any error
/// to the peer as `error(report)` before propagating it
/// (`magicfolder/server.py::try_except_send_remote`).
pub fn run_server<R: Read, W: Write>(repo: &Repository, channel: &mut Channel<R, W>) -> SyncResult<()> {
    match handle_session(repo, channel) {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::error!(error = %err, "session failed");
            if err.is_reportable() {
                let _ = channel.send_error(err.to_string());
            }
            Err(err)
        }
    }
}

fn handle_session<R: Read, W: Write>(repo: &Repository, channel: &mut Channel<R, W>) -> SyncResult<()> {
    // AwaitSync
    let base = match channel.recv()? {
        Frame::Sync { base } => base,
        other => return Err(unexpected("sync", &other)),
    };

    // LoadIndices
    let latest = repo.latest_version()?;
    if base > latest {
        return Err(SyncError::ProtocolError(format!(
            "client's base version {base} is newer than the latest {latest}"
        )));
    }
    let server_bag = repo.read_version(latest)?;
    let (remote_outdated, old_bag) = if base == latest {
        (false, server_bag.clone())
    } else {
        (true, repo.read_version(base)?)
    };
    tracing::debug!(latest, base, remote_outdated, "begin sync");
    channel.send(&Frame::WaitingForFiles)?;

    // AwaitMeta
    let (client_order, client_bag) = receive_client_bag(channel)?;

    // FetchMissing
    for item in &client_order {
        if !repo.contains(&item.checksum) {
            tracing::debug!(checksum = %item.checksum, path = %item.path, "fetching missing blob");
            channel.send(&Frame::Data { checksum: item.checksum })?;
            let mut writer = repo.write_blob(Some(item.checksum))?;
            channel.recv_file(&mut writer, &mut |_| {})?;
            writer.finish()?;
        }
    }

    // Reconcile
    let (new_server_bag, current_version) = reconcile(
        repo,
        remote_outdated,
        latest,
        &old_bag,
        &client_bag,
        &server_bag,
    )?;

    // PushUpdate
    push_update(channel, repo, &client_bag, &new_server_bag)?;
    channel.send(&Frame::SyncComplete { version: current_version })?;

    let mut added: Vec<FileItem> = new_server_bag.difference(&server_bag).cloned().collect();
    added.sort_by(|a, b| a.path.cmp(&b.path));
    let mut removed: Vec<FileItem> = server_bag.difference(&new_server_bag).cloned().collect();
    removed.sort_by(|a, b| a.path.cmp(&b.path));
    channel.send(&Frame::CommitDiff { added, removed })?;

    // AwaitQuit
    match channel.recv()? {
        Frame::Quit => {}
        other => return Err(unexpected("quit", &other)),
    }
    channel.send(&Frame::Bye)?;
    Ok(())
}

/// Accumulates `file_meta` frames into `client_bag` until `done`, keeping
/// the received order for `FetchMissing`'s deterministic iteration.
/// A duplicate path within the bag is a protocol error.
fn receive_client_bag<R: Read, W: Write>(
    channel: &mut Channel<R, W>,
) -> SyncResult<(Vec<FileItem>, HashSet<FileItem>)> {
    let mut order = Vec::new();
    let mut seen_paths = HashSet::new();
    loop {
        match channel.recv()? {
            Frame::FileMeta(item) => {
                let item = item.without_time();
                if !seen_paths.insert(item.path.clone()) {
                    return Err(SyncError::InvariantViolation(format!(
                        "duplicate path in client bag: {}",
                        item.path
                    )));
                }
                order.push(item);
            }
            Frame::Done => break,
            other => return Err(unexpected("file_meta or done", &other)),
        }
    }
    let bag = order.iter().cloned().collect();
    Ok((order, bag))
}

fn reconcile(
    repo: &Repository,
    remote_outdated: bool,
    latest: u64,
    old_bag: &HashSet<FileItem>,
    client_bag: &HashSet<FileItem>,
    server_bag: &HashSet<FileItem>,
) -> SyncResult<(HashSet<FileItem>, u64)> {
    if remote_outdated {
        if old_bag == client_bag {
            tracing::debug!(latest, "client was outdated but had no changes");
            return Ok((server_bag.clone(), latest));
        }
        tracing::debug!("client was outdated and had changes, merging");
        let result = merge::merge(old_bag, client_bag, server_bag)?;
        let mut new_tree = result.new_tree;
        merge::rename_conflicts(&mut new_tree, &result.conflict);
        let new_server_bag: HashSet<FileItem> = new_tree.into_values().collect();
        let current_version = latest + 1;
        repo.write_version(current_version, new_server_bag.clone())?;
        Ok((new_server_bag, current_version))
    } else if server_bag == client_bag {
        tracing::debug!(latest, "client has no changes");
        Ok((server_bag.clone(), latest))
    } else {
        let current_version = latest + 1;
        tracing::debug!(current_version, "client has changes, creating new version");
        repo.write_version(current_version, client_bag.clone())?;
        Ok((client_bag.clone(), current_version))
    }
}

fn push_update<R: Read, W: Write>(
    channel: &mut Channel<R, W>,
    repo: &Repository,
    client_bag: &HashSet<FileItem>,
    new_server_bag: &HashSet<FileItem>,
) -> SyncResult<()> {
    let mut to_remove: Vec<FileItem> = client_bag.difference(new_server_bag).cloned().collect();
    to_remove.sort_by(|a, b| a.path.cmp(&b.path));
    for item in &to_remove {
        tracing::debug!(path = %item.path, "asking client to remove");
        channel.send(&Frame::FileRemove(item.clone()))?;
    }

    let mut to_add: Vec<FileItem> = new_server_bag.difference(client_bag).cloned().collect();
    to_add.sort_by(|a, b| a.path.cmp(&b.path));
    for item in &to_add {
        tracing::debug!(path = %item.path, checksum = %item.checksum, "sending file");
        channel.send(&Frame::FileBegin(item.clone()))?;
        let mut reader = repo.read_blob(&item.checksum)?;
        channel.send_file(&mut reader, &mut |_| {})?;
    }
    Ok(())
}

fn unexpected(expected: &str, got: &Frame) -> SyncError {
    SyncError::ProtocolError(format!("expected {expected}, got {}", got.tag()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use wire::Checksum;

    fn repo_with(dir: &std::path::Path) -> Repository {
        let repo = Repository::new(dir);
        repo.init().unwrap();
        repo
    }

    fn ck(byte: u8) -> Checksum {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        Checksum::from_bytes(bytes)
    }

    #[test]
    fn empty_initial_sync_commits_no_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with(dir.path());

        let mut to_server = Vec::new();
        {
            let mut ch = Channel::new(Cursor::new(Vec::new()), &mut to_server);
            ch.send(&Frame::Sync { base: 0 }).unwrap();
            ch.send(&Frame::Done).unwrap();
            ch.send(&Frame::Quit).unwrap();
        }

        let mut out = Vec::new();
        let mut ch = Channel::new(Cursor::new(to_server), &mut out);
        run_server(&repo, &mut ch).unwrap();

        let mut reply = Channel::new(Cursor::new(out), Vec::new());
        assert_eq!(reply.recv().unwrap(), Frame::WaitingForFiles);
        assert_eq!(reply.recv().unwrap(), Frame::SyncComplete { version: 0 });
        assert_eq!(
            reply.recv().unwrap(),
            Frame::CommitDiff { added: vec![], removed: vec![] }
        );
        assert_eq!(reply.recv().unwrap(), Frame::Bye);
        assert_eq!(repo.latest_version().unwrap(), 0);
    }

    #[test]
    fn rejects_unknown_base_version() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with(dir.path());

        let mut to_server = Vec::new();
        {
            let mut ch = Channel::new(Cursor::new(Vec::new()), &mut to_server);
            ch.send(&Frame::Sync { base: 99 }).unwrap();
        }
        let mut out = Vec::new();
        let mut ch = Channel::new(Cursor::new(to_server), &mut out);
        let err = run_server(&repo, &mut ch).unwrap_err();
        assert!(matches!(err, SyncError::ProtocolError(_)));
    }

    #[test]
    fn duplicate_client_path_is_a_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with(dir.path());

        let mut to_server = Vec::new();
        {
            let mut ch = Channel::new(Cursor::new(Vec::new()), &mut to_server);
            ch.send(&Frame::Sync { base: 0 }).unwrap();
            ch.send(&Frame::FileMeta(FileItem::new("a.txt", ck(1), 1))).unwrap();
            ch.send(&Frame::FileMeta(FileItem::new("a.txt", ck(2), 2))).unwrap();
            ch.send(&Frame::Done).unwrap();
        }
        let mut out = Vec::new();
        let mut ch = Channel::new(Cursor::new(to_server), &mut out);
        let err = run_server(&repo, &mut ch).unwrap_err();
        assert!(matches!(err, SyncError::InvariantViolation(_)));
    }
}
