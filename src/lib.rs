// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! Flowdeck — terminal-first flow-graph workbench.
//!
//! The library core (notebook lifecycle, platform block registry, store, process execution) is
//! fully usable headless; the TUI shell in [`tui`] is one embedder of it.

pub mod console;
pub mod controller;
pub mod exec;
pub mod model;
pub mod platform;
pub mod store;
pub mod tui;
