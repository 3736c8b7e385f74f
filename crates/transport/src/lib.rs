//! # Overview
//!
//! `transport` is the shell transport collaborator (spec §6): given a
//! remote specifier `<host>:<path>`, it launches a remote server process
//! over SSH and hands back a [`wire::Channel`] wired to its stdin/stdout.
//! Launching details are opaque to the core; stderr is inherited so the
//! remote process's own diagnostics reach the local terminal directly
//! rather than being part of the protocol (spec §6).

use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use wire::{Channel, SyncError, SyncResult};

/// A parsed `<host>:<path>` remote specifier (`magicfolder/client.py::pipe_to_remote`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpec {
    pub host: String,
    pub path: String,
}

impl RemoteSpec {
    pub fn parse(spec: &str) -> SyncResult<Self> {
        let (host, path) = spec.split_once(':').ok_or_else(|| {
            SyncError::InvariantViolation(format!("remote spec {spec:?} is not <host>:<path>"))
        })?;
        if host.is_empty() || path.is_empty() {
            return Err(SyncError::InvariantViolation(format!(
                "remote spec {spec:?} has an empty host or path"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            path: path.to_string(),
        })
    }
}

/// A live connection to a remote server process: the process handle is
/// kept alongside the channel so the caller can reap it once the session
/// ends.
pub struct RemoteSession {
    pub channel: Channel<ChildStdout, ChildStdin>,
    child: Child,
}

impl RemoteSession {
    /// Waits for the child to exit after the session's `quit`/`bye`
    /// handshake has completed.
    pub fn finish(mut self) -> SyncResult<()> {
        self.child.wait()?;
        Ok(())
    }
}

/// Spawns `ssh <host> mf-server <path>` and returns a channel over its
/// stdio (spec §6, "the client launches a remote process that serves over
/// its stdin/stdout").
pub fn connect(remote: &str) -> SyncResult<RemoteSession> {
    let spec = RemoteSpec::parse(remote)?;
    tracing::debug!(host = %spec.host, path = %spec.path, "spawning remote server");

    let mut child = Command::new("ssh")
        .arg(&spec.host)
        .arg("mf-server")
        .arg(&spec.path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stdin = child.stdin.take().expect("stdin was piped");

    Ok(RemoteSession {
        channel: Channel::new(stdout, stdin),
        child,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_path() {
        let spec = RemoteSpec::parse("example.com:/srv/repo").unwrap();
        assert_eq!(spec.host, "example.com");
        assert_eq!(spec.path, "/srv/repo");
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(RemoteSpec::parse("no-colon-here").is_err());
    }

    #[test]
    fn rejects_empty_host_or_path() {
        assert!(RemoteSpec::parse(":/srv/repo").is_err());
        assert!(RemoteSpec::parse("example.com:").is_err());
    }

    #[test]
    fn path_may_itself_contain_colons() {
        let spec = RemoteSpec::parse("example.com:/srv/repo:with:colons").unwrap();
        assert_eq!(spec.path, "/srv/repo:with:colons");
    }
}
