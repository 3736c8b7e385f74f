//! # Overview
//!
//! `ui` is the terminal UI collaborator (spec §6, §11): a colorized,
//! self-erasing status line during transfer, human-readable byte
//! formatting, and the end-of-sync commit-diff printout (spec §7:
//! "the client prints the per-file diff (deletions then additions, each
//! with size) and the new version number"). Ported from
//! `magicfolder/uilib.py`'s `ColorfulUi`/`DummyUi`/`pretty_bytes`.
//!
//! # Design
//!
//! `Ui` is a plain trait so `session`/`cli` can pass either implementation
//! explicitly (spec §9: "Mutable global state. None required. Logging and
//! UI are side collaborators; pass them explicitly").

use std::io::Write;

use is_terminal::IsTerminal;
use wire::FileItem;

const RED: &str = "\x1b[91m";
const GREEN: &str = "\x1b[92m";
const DEFAULT: &str = "\x1b[0m";

/// Side collaborator for progress and summary output.
pub trait Ui {
    /// Overwrites the current status line with `text`, clearing whatever
    /// was printed last time this or [`Ui::clear_status`] was called.
    fn status_line(&mut self, text: &str);

    /// Clears the current status line without printing a replacement.
    fn clear_status(&mut self);

    /// Prints the per-file diff and the version the client is now at,
    /// deletions before additions (spec §7).
    fn commit_diff(&mut self, version: u64, added: &[FileItem], removed: &[FileItem]);
}

/// ANSI-colored UI: red deletions, green additions, a self-erasing status
/// line while a transfer is in progress.
#[derive(Default)]
pub struct ColorfulUi {
    status_width: usize,
}

impl ColorfulUi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn out(&self, text: &str) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

impl Ui for ColorfulUi {
    fn status_line(&mut self, text: &str) {
        self.clear_status();
        self.out(text);
        self.status_width = text.len();
    }

    fn clear_status(&mut self) {
        if self.status_width > 0 {
            self.out(&format!("\r{}\r", " ".repeat(self.status_width)));
            self.status_width = 0;
        }
    }

    fn commit_diff(&mut self, version: u64, added: &[FileItem], removed: &[FileItem]) {
        self.clear_status();
        for item in removed {
            self.out(RED);
            self.out(&format!("- {} ({})\n", item.path, pretty_bytes(item.size)));
            self.out(DEFAULT);
        }
        for item in added {
            self.out(GREEN);
            self.out(&format!("+ {} ({})\n", item.path, pretty_bytes(item.size)));
            self.out(DEFAULT);
        }
        self.out(&format!("now at version {version}\n"));
    }
}

/// No-op UI for non-interactive runs (`DummyUi` in the original).
#[derive(Default)]
pub struct DummyUi;

impl Ui for DummyUi {
    fn status_line(&mut self, _text: &str) {}
    fn clear_status(&mut self) {}
    fn commit_diff(&mut self, _version: u64, _added: &[FileItem], _removed: &[FileItem]) {}
}

/// Picks [`ColorfulUi`] when stdout is a terminal, [`DummyUi`] otherwise.
#[must_use]
pub fn default_ui() -> Box<dyn Ui> {
    if std::io::stdout().is_terminal() {
        Box::new(ColorfulUi::new())
    } else {
        Box::new(DummyUi)
    }
}

/// Human-readable byte count (`uilib.py::pretty_bytes`).
///
/// ```
/// assert_eq!(ui::pretty_bytes(42), "42 bytes");
/// assert_eq!(ui::pretty_bytes(2048), "2.0 KiB");
/// ```
#[must_use]
pub fn pretty_bytes(n: u64) -> String {
    const K: f64 = 1024.0;
    let n_f = n as f64;
    if n < 1024 {
        format!("{n} bytes")
    } else if n_f < K * K {
        format!("{:.1} KiB", n_f / K)
    } else if n_f < K * K * K {
        format!("{:.1} MiB", n_f / (K * K))
    } else {
        format!("{:.1} GiB", n_f / (K * K * K))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire::Checksum;

    fn ck() -> Checksum {
        "baf34551fecb48acc3da868eb85e1b6dac9de356".parse().unwrap()
    }

    #[test]
    fn pretty_bytes_picks_the_right_unit() {
        assert_eq!(pretty_bytes(0), "0 bytes");
        assert_eq!(pretty_bytes(1023), "1023 bytes");
        assert_eq!(pretty_bytes(1024), "1.0 KiB");
        assert_eq!(pretty_bytes(1024 * 1024), "1.0 MiB");
        assert_eq!(pretty_bytes(1024 * 1024 * 1024), "1.0 GiB");
    }

    #[test]
    fn dummy_ui_never_panics() {
        let mut ui = DummyUi;
        ui.status_line("x");
        ui.commit_diff(1, &[FileItem::new("a", ck(), 1)], &[]);
        ui.clear_status();
    }
}
