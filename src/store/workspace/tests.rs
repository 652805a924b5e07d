// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};

use super::{read_only_on_disk, save_flow_graph, write_atomic, Prefs, StoreError, WriteDurability};
use crate::model::{BlockInstance, FlowGraph, OPTIONS_BLOCK_KEY};

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = env::temp_dir();
        path.push(format!("flowdeck-{prefix}-{}-{nanos}-{counter}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[fixture]
fn tmp() -> TempDir {
    TempDir::new("workspace")
}

#[rstest]
fn prefs_round_trip(tmp: TempDir) {
    let prefs = Prefs {
        open_files: vec![PathBuf::from("/tmp/a.fdg"), PathBuf::from("/tmp/b.fdg")],
        file_open: Some(PathBuf::from("/tmp/b.fdg")),
        console_visible: true,
        blocks_visible: false,
    };

    prefs.save(tmp.path(), WriteDurability::BestEffort).unwrap();
    let loaded = Prefs::load(tmp.path()).unwrap();
    assert_eq!(loaded, prefs);
}

#[rstest]
fn missing_prefs_file_yields_defaults(tmp: TempDir) {
    let loaded = Prefs::load(tmp.path()).unwrap();
    assert_eq!(loaded, Prefs::default());
}

#[rstest]
fn malformed_prefs_file_is_a_json_error(tmp: TempDir) {
    std::fs::write(Prefs::prefs_path(tmp.path()), "not json").unwrap();
    let err = Prefs::load(tmp.path()).unwrap_err();
    match err {
        StoreError::Json { path, .. } => assert_eq!(path, Prefs::prefs_path(tmp.path())),
        other => panic!("expected Json error, got: {other:?}"),
    }
}

#[rstest]
fn save_flow_graph_writes_trailing_newline(tmp: TempDir) {
    let mut graph = FlowGraph::default();
    graph.add_block(BlockInstance::new("options_0", OPTIONS_BLOCK_KEY));

    let path = tmp.path().join("demo.fdg");
    save_flow_graph(&path, &graph, WriteDurability::BestEffort).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.ends_with('\n'));
    let back: FlowGraph = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, graph);
}

#[rstest]
fn write_atomic_replaces_existing_content(tmp: TempDir) {
    let path = tmp.path().join("file.json");
    write_atomic(&path, b"first", WriteDurability::BestEffort).unwrap();
    write_atomic(&path, b"second", WriteDurability::Durable).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

    // No temp files left behind.
    let stray: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".flowdeck.tmp."))
        .collect();
    assert!(stray.is_empty());
}

#[rstest]
fn write_atomic_creates_missing_parent_dirs(tmp: TempDir) {
    let path = tmp.path().join("nested/deeper/file.json");
    write_atomic(&path, b"content", WriteDurability::BestEffort).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
}

#[cfg(unix)]
#[rstest]
fn write_atomic_refuses_symlink_target(tmp: TempDir) {
    let target = tmp.path().join("target.json");
    std::fs::write(&target, "original").unwrap();
    let link = tmp.path().join("link.json");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let err = write_atomic(&link, b"replaced", WriteDurability::BestEffort).unwrap_err();
    match err {
        StoreError::SymlinkRefused { path } => assert_eq!(path, link),
        other => panic!("expected SymlinkRefused, got: {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
}

#[cfg(unix)]
#[rstest]
fn read_only_detection_follows_permission_bits(tmp: TempDir) {
    use std::os::unix::fs::PermissionsExt;

    let path = tmp.path().join("ro.fdg");
    std::fs::write(&path, "{}").unwrap();
    assert!(!read_only_on_disk(&path));

    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o444);
    std::fs::set_permissions(&path, permissions).unwrap();
    assert!(read_only_on_disk(&path));

    assert!(!read_only_on_disk(&tmp.path().join("missing.fdg")));
}
