// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! Persistence: flow-graph files on disk and the session-restore preferences file.

pub mod workspace;

pub use workspace::{
    default_config_dir, read_only_on_disk, save_flow_graph, Prefs, StoreError, WriteDurability,
    PREFS_FILENAME,
};
