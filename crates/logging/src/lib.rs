//! # Overview
//!
//! `logging` installs the process-wide [`tracing`] subscriber used by both
//! the client and server halves of `mfsync` (spec §6, §7: "the error is
//! logged to the client's debug log file"). It is installed exactly once,
//! at process entry, and never again -- there is no mutable global state
//! beyond what `tracing` itself owns (spec §9: "Mutable global state. None
//! required.").

use std::fs::OpenOptions;
use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Installs a `tracing_subscriber::fmt` subscriber.
///
/// When `log_path` is `Some`, log lines are appended to that file (the
/// client's or server's `debug.log`, per spec §6's persisted-state
/// contract); otherwise they go to stderr. `verbose` selects `DEBUG`
/// instead of `INFO` as the maximum level, mirroring
/// `logging.basicConfig(level=logging.DEBUG, filename=...)` in the
/// original `client.py`/`server.py`.
///
/// Safe to call more than once per process; later calls are no-ops.
pub fn init(log_path: Option<&Path>, verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };

    let writer = match log_path {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => BoxMakeWriter::new(file),
            Err(_) => BoxMakeWriter::new(std::io::stderr),
        },
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_to_the_requested_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("debug.log");
        init(Some(&log_path), true);
        tracing::info!("hello from a test");
        assert!(log_path.exists());
    }
}
