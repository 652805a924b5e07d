// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! End-to-end session lifecycle: open files, shut down cleanly, restore into a fresh
//! controller the way the binary does at startup.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use flowdeck::console;
use flowdeck::controller::{LifecycleController, SaveChoice, SavePrompt};
use flowdeck::model::Page;
use flowdeck::platform::Platform;
use flowdeck::store::Prefs;

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
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

struct DiscardAll;

impl SavePrompt for DiscardAll {
    fn unsaved_changes(&mut self, _page: &Page) -> SaveChoice {
        SaveChoice::Discard
    }

    fn save_path_for(&mut self, _page: &Page) -> Option<PathBuf> {
        None
    }
}

fn controller(config_dir: &Path) -> LifecycleController {
    let (platform, warnings) = Platform::build(None).unwrap();
    assert!(warnings.is_empty());
    LifecycleController::new(platform, console::shared(), config_dir)
}

fn graph_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "{\"blocks\": [{\"name\": \"options_0\", \"key\": \"options\"}]}\n").unwrap();
    path
}

/// The startup half of the restore protocol, mirroring what the binary does.
fn restore(controller: &mut LifecycleController, prefs: &Prefs) {
    for path in &prefs.open_files {
        controller.open_document(Some(path), false).unwrap();
    }
    if let Some(path) = &prefs.file_open {
        if controller.notebook().find_by_path(path).is_some() {
            controller.open_document(Some(path), true).unwrap();
        }
    }
    if controller.notebook().is_empty() {
        controller.new_page().unwrap();
    }
}

#[test]
fn clean_shutdown_restores_tabs_and_active_page() {
    let tmp = TempDir::new("restore");
    let config_dir = tmp.path().join("config");
    let path_a = graph_file(tmp.path(), "a.fdg");
    let path_b = graph_file(tmp.path(), "b.fdg");
    let path_c = graph_file(tmp.path(), "c.fdg");

    let mut first = controller(&config_dir);
    first.open_document(Some(&path_a), true).unwrap();
    first.open_document(Some(&path_b), true).unwrap();
    first.open_document(Some(&path_c), true).unwrap();
    first.switch_page(1).unwrap();
    assert!(first.close_all(&mut DiscardAll).unwrap());

    let prefs = Prefs::load(&config_dir).unwrap();
    let mut second = controller(&config_dir);
    restore(&mut second, &prefs);

    let open: Vec<Option<PathBuf>> = second.notebook().open_paths();
    assert_eq!(
        open,
        vec![Some(path_a), Some(path_b.clone()), Some(path_c)],
    );
    let active = second.notebook().active_page().unwrap();
    assert_eq!(active.document().file_path(), Some(path_b.as_path()));
}

#[test]
fn restore_skips_files_deleted_since_last_run() {
    let tmp = TempDir::new("restore");
    let config_dir = tmp.path().join("config");
    let path_a = graph_file(tmp.path(), "a.fdg");
    let path_b = graph_file(tmp.path(), "b.fdg");

    let mut first = controller(&config_dir);
    first.open_document(Some(&path_a), true).unwrap();
    first.open_document(Some(&path_b), true).unwrap();
    assert!(first.close_all(&mut DiscardAll).unwrap());

    fs::remove_file(&path_b).unwrap();

    let prefs = Prefs::load(&config_dir).unwrap();
    let mut second = controller(&config_dir);
    restore(&mut second, &prefs);

    // The missing file is reported on the console; the surviving tab still opens.
    assert_eq!(second.notebook().len(), 1);
    assert_eq!(
        second.notebook().active_page().unwrap().document().file_path(),
        Some(path_a.as_path()),
    );
    let console = second.console().lock().unwrap();
    assert!(console.lines().iter().any(|line| line.contains(">>> Error: cannot load")));
}

#[test]
fn restore_with_no_previous_session_starts_blank() {
    let tmp = TempDir::new("restore");
    let config_dir = tmp.path().join("config");

    let prefs = Prefs::load(&config_dir).unwrap();
    assert_eq!(prefs, Prefs::default());

    let mut fresh = controller(&config_dir);
    restore(&mut fresh, &prefs);

    assert_eq!(fresh.notebook().len(), 1);
    let page = fresh.notebook().active_page().unwrap();
    assert!(page.document().file_path().is_none());
    assert!(page.document().is_saved());
}
