//! # Overview
//!
//! `cli` is the command-line front end (spec §6): two user-facing
//! subcommands, `init` and `sync`, plus a hidden `serve` subcommand that is
//! the remote half a `sync` actually talks to (spawned by `transport` as
//! `ssh <host> mf-server <path>`). The crate wires together
//! `transport` + `session` + `walk` + `ui` + `logging`; it contains no
//! protocol or repository logic of its own.
//!
//! # Errors
//!
//! [`run`] never panics; every failure surfaces as a logged error and exit
//! code `1` (spec §7: "User-visible behavior ... On failure, the error is
//! logged to the client's debug log file; the process exits non-zero.").

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use repo::Repository;
use wire::{SyncError, SyncResult};

/// Name of the client's and server's private metadata directory
/// (`magicfolder/client.py` used `.mf`).
const PRIVATE_DIR: &str = ".mf";

#[derive(Parser)]
#[command(name = "mfsync", about = "Directory-tree synchronizer with a content-addressed server repository")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a server repository or a client working tree.
    Init {
        /// Initialize a server repository instead of a client working tree.
        #[arg(short, long)]
        server: bool,
        /// Remote specifier `<host>:<path>` (client init only).
        remote: Option<String>,
    },
    /// Synchronize the current working tree with its remote.
    Sync {
        /// Disable the walker's size+mtime cache and force full rehashing.
        #[arg(short, long)]
        paranoid: bool,
        /// Log at DEBUG level instead of INFO.
        #[arg(long)]
        debug: bool,
    },
    /// Serve a repository over stdin/stdout; this is what `transport`
    /// spawns on the remote host, not something a user runs directly.
    #[command(hide = true)]
    Serve {
        /// Repository root.
        path: PathBuf,
    },
}

/// Parses `std::env::args()` and runs the requested subcommand, returning
/// the process exit code.
#[must_use]
pub fn run() -> i32 {
    match Cli::try_parse() {
        Ok(cli) => execute(cli.command),
        Err(e) => {
            let _ = e.print();
            e.exit_code()
        }
    }
}

fn execute(command: Command) -> i32 {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let result = match command {
        Command::Init { server, remote } => run_init(&cwd, server, remote.as_deref()),
        Command::Sync { paranoid, debug } => run_sync(&cwd, paranoid, debug),
        Command::Serve { path } => run_serve(&path),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            1
        }
    }
}

fn run_init(cwd: &Path, server: bool, remote: Option<&str>) -> SyncResult<()> {
    logging::init(None, false);
    if server {
        Repository::new(cwd).init()
    } else {
        let remote = remote.ok_or_else(|| {
            SyncError::InvariantViolation("client init requires a <remote> argument".into())
        })?;
        session::client::init_working_tree(cwd, PRIVATE_DIR, remote)
    }
}

fn run_sync(cwd: &Path, paranoid: bool, debug: bool) -> SyncResult<()> {
    let log_path = cwd.join(PRIVATE_DIR).join("debug.log");
    logging::init(Some(&log_path), debug);

    let remote_spec = session::client::read_remote(cwd, PRIVATE_DIR)?;
    let mut remote_session = transport::connect(&remote_spec)?;
    let mut ui = ui::default_ui();
    session::client::run_client(cwd, PRIVATE_DIR, &mut remote_session.channel, paranoid, ui.as_mut())?;
    remote_session.finish()
}

fn run_serve(path: &Path) -> SyncResult<()> {
    logging::init(Some(&path.join("debug.log")), true);

    let repo = Repository::new(path);
    let mut channel = wire::Channel::new(std::io::stdin(), std::io::stdout());
    session::run_server(&repo, &mut channel)
}
