// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! The user-visible console log.
//!
//! Load failures, process lifecycle, and fatal configuration problems all land here; the TUI
//! renders the buffer in its console pane and headless embedders can inspect it directly. The
//! buffer is the product surface for recoverable errors, not a tracing backend.

use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_LINES: usize = 1000;

#[derive(Debug, Default)]
pub struct Console {
    lines: Vec<String>,
    rev: u64,
}

impl Console {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Bumped on every append; lets a renderer skip work when nothing changed.
    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
        if self.lines.len() > MAX_LINES {
            let excess = self.lines.len() - MAX_LINES;
            self.lines.drain(..excess);
        }
        self.rev = self.rev.wrapping_add(1);
    }

    pub fn start_load(&mut self, path: &Path) {
        self.log(format!(">>> Loading: {}", path.display()));
    }

    pub fn end_load(&mut self) {
        self.log(">>> Done");
    }

    pub fn fail_load(&mut self, path: &Path, error: &dyn std::error::Error) {
        self.log(format!(">>> Error: cannot load {}: {error}", path.display()));
    }

    pub fn fail_save(&mut self, error: &dyn std::error::Error) {
        self.log(format!(">>> Error: save failed: {error}"));
    }

    pub fn fatal(&mut self, error: &dyn std::error::Error) {
        self.log(format!(">>> Fatal: {error}"));
    }
}

pub type SharedConsole = Arc<Mutex<Console>>;

pub fn shared() -> SharedConsole {
    Arc::new(Mutex::new(Console::default()))
}
