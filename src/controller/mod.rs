// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! The notebook lifecycle controller.
//!
//! Orchestrates open/close/switch over the notebook, including unsaved-change prompts and
//! external-process teardown. Every operation takes or returns the affected page explicitly, so
//! any front end (TUI, test harness, headless driver) can embed the controller through the
//! [`UiAction`] dispatch table instead of toolkit signal wiring.
//!
//! A close attempt walks:
//! `REQUESTED -> {CHECK_RUNNING -> ACTIVATE} | {CHECK_DIRTY -> PROMPT ->
//! {SAVE_THEN_RECHECK | DISCARD | CANCEL}} -> KILL_PROCESS_IF_RUNNING -> REMOVED`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::console::SharedConsole;
use crate::exec::{generate_runner, FlowProcess};
use crate::model::{Document, Notebook, NotebookError, Page, PageId};
use crate::platform::{FatalConfigError, GraphLoadError, Platform};
use crate::store::{read_only_on_disk, save_flow_graph, Prefs, WriteDurability};

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome of the three-way unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Save,
    Discard,
    Cancel,
}

/// Decision provider for close-time prompts.
///
/// The TUI answers interactively; tests and headless drivers answer from a script.
pub trait SavePrompt {
    /// Three-way choice for a page with unsaved changes.
    fn unsaved_changes(&mut self, page: &Page) -> SaveChoice;

    /// Target path for saving a page that has none yet (Save-As). `None` cancels the save.
    fn save_path_for(&mut self, page: &Page) -> Option<PathBuf>;
}

/// Notified whenever the active page changes; the refresh is a pure function of the new active
/// page and must not mutate it.
pub trait RefreshSink {
    fn on_active_page_changed(&mut self, page_id: Option<PageId>);
}

#[derive(Debug, Default)]
pub struct NullRefresh;

impl RefreshSink for NullRefresh {
    fn on_active_page_changed(&mut self, _page_id: Option<PageId>) {}
}

/// Invoked exactly once when the platform configuration turns out to be fatally broken mid-flight
/// (the `options` definition vanished). The production handler terminates the process.
pub trait FatalHandler {
    fn terminate(&mut self, error: &FatalConfigError);
}

/// Production fatal handler: print and exit. No attempt to continue with a degraded state,
/// because every document construction depends on the missing definition.
#[derive(Debug, Default)]
pub struct ExitProcess;

impl FatalHandler for ExitProcess {
    fn terminate(&mut self, error: &FatalConfigError) {
        eprintln!("flowdeck: fatal: {error}");
        std::process::exit(1);
    }
}

/// Fatal handler for front ends that must unwind (restore the terminal) before exiting;
/// termination then happens through the propagated [`LifecycleError::Fatal`].
#[derive(Debug, Default)]
pub struct RaiseFatal;

impl FatalHandler for RaiseFatal {
    fn terminate(&mut self, _error: &FatalConfigError) {}
}

/// Identifiers for UI-triggered operations; the dispatch table that replaces toolkit signal
/// registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    NewPage,
    OpenDocument { path: PathBuf },
    SavePage,
    SavePageAs { path: PathBuf },
    ClosePage,
    CloseAll,
    SwitchPage { index: usize },
    NextPage,
    PrevPage,
    RunPage,
    StopPage,
    ReloadPages,
}

/// Whether the embedding front end should keep running after a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchFlow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub enum LifecycleError {
    PageNotFound { page_id: PageId },
    TabOutOfRange { index: usize },
    NoActivePage,
    Fatal(FatalConfigError),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageNotFound { page_id } => write!(f, "no such page: {page_id}"),
            Self::TabOutOfRange { index } => write!(f, "tab index out of range: {index}"),
            Self::NoActivePage => f.write_str("no active page"),
            Self::Fatal(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fatal(error) => Some(error),
            _ => None,
        }
    }
}

impl From<NotebookError> for LifecycleError {
    fn from(error: NotebookError) -> Self {
        match error {
            NotebookError::PageNotFound { page_id } => Self::PageNotFound { page_id },
            NotebookError::TabOutOfRange { index } => Self::TabOutOfRange { index },
        }
    }
}

pub struct LifecycleController {
    platform: Platform,
    notebook: Notebook,
    console: SharedConsole,
    config_dir: PathBuf,
    durability: WriteDurability,
    stop_timeout: Duration,
    console_visible: bool,
    blocks_visible: bool,
    refresh: Box<dyn RefreshSink>,
    fatal: Box<dyn FatalHandler>,
}

impl LifecycleController {
    pub fn new(platform: Platform, console: SharedConsole, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            notebook: Notebook::new(),
            console,
            config_dir: config_dir.into(),
            durability: WriteDurability::default(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            console_visible: false,
            blocks_visible: false,
            refresh: Box::new(NullRefresh),
            fatal: Box::new(ExitProcess),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_refresh(mut self, refresh: Box<dyn RefreshSink>) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_fatal_handler(mut self, fatal: Box<dyn FatalHandler>) -> Self {
        self.fatal = fatal;
        self
    }

    pub fn notebook(&self) -> &Notebook {
        &self.notebook
    }

    /// Mutable access for graph editing; edits mark their document unsaved through
    /// [`Document::graph_mut`].
    pub fn notebook_mut(&mut self) -> &mut Notebook {
        &mut self.notebook
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn console(&self) -> &SharedConsole {
        &self.console
    }

    pub fn set_console_visible(&mut self, visible: bool) {
        self.console_visible = visible;
    }

    pub fn console_visible(&self) -> bool {
        self.console_visible
    }

    pub fn set_blocks_visible(&mut self, visible: bool) {
        self.blocks_visible = visible;
    }

    pub fn blocks_visible(&self) -> bool {
        self.blocks_visible
    }

    pub fn dispatch(
        &mut self,
        action: UiAction,
        prompt: &mut dyn SavePrompt,
    ) -> Result<DispatchFlow, LifecycleError> {
        match action {
            UiAction::NewPage => {
                self.new_page()?;
            }
            UiAction::OpenDocument { path } => {
                self.open_document(Some(&path), true)?;
            }
            UiAction::SavePage => {
                let page_id = self.require_active()?;
                self.save_page(page_id, prompt)?;
            }
            UiAction::SavePageAs { path } => {
                let page_id = self.require_active()?;
                self.save_page_as(page_id, path)?;
            }
            UiAction::ClosePage => {
                let page_id = self.require_active()?;
                self.close_page(page_id, true, prompt)?;
            }
            UiAction::CloseAll => {
                if self.close_all(prompt)? {
                    return Ok(DispatchFlow::Quit);
                }
            }
            UiAction::SwitchPage { index } => {
                self.switch_page(index)?;
            }
            UiAction::NextPage => {
                self.cycle_page(1)?;
            }
            UiAction::PrevPage => {
                self.cycle_page(-1)?;
            }
            UiAction::RunPage => {
                let page_id = self.require_active()?;
                self.run_page(page_id)?;
            }
            UiAction::StopPage => {
                let page_id = self.require_active()?;
                self.stop_page(page_id)?;
            }
            UiAction::ReloadPages => {
                self.reload_pages()?;
            }
        }
        Ok(DispatchFlow::Continue)
    }

    /// Opens `path` into a new page, or a blank page when `path` is `None`.
    ///
    /// Re-opening an already-open file activates the existing page instead of duplicating it.
    /// Load failures are logged and leave the notebook unchanged; a fatal configuration error
    /// invokes the fatal handler exactly once.
    pub fn open_document(
        &mut self,
        path: Option<&Path>,
        force_show: bool,
    ) -> Result<Option<PageId>, LifecycleError> {
        let Some(path) = path else {
            let graph = match self.platform.new_flow_graph() {
                Ok(graph) => graph,
                Err(error) => return Err(self.handle_fatal(error)),
            };
            let page_id = self.notebook.insert(Document::new_blank(graph), true);
            self.refresh_active();
            return Ok(Some(page_id));
        };

        if let Some(existing) = self.notebook.find_by_path(path) {
            self.notebook.activate(existing)?;
            self.refresh_active();
            return Ok(Some(existing));
        }

        self.console.lock().expect("console lock poisoned").start_load(path);
        match self.platform.load_flow_graph(path) {
            Ok(loaded) => {
                self.console.lock().expect("console lock poisoned").end_load();
                let document = Document::from_file(path, loaded.graph, loaded.read_only);
                let page_id = self.notebook.insert(document, force_show);
                self.refresh_active();
                Ok(Some(page_id))
            }
            Err(GraphLoadError::Load(error)) => {
                self.console.lock().expect("console lock poisoned").fail_load(path, &error);
                Ok(None)
            }
            Err(GraphLoadError::Fatal(error)) => Err(self.handle_fatal(error)),
        }
    }

    pub fn new_page(&mut self) -> Result<PageId, LifecycleError> {
        match self.open_document(None, true)? {
            Some(page_id) => Ok(page_id),
            None => unreachable!("blank page creation cannot fail recoverably"),
        }
    }

    /// Closes one page after resolving the unsaved-changes prompt and stopping any running
    /// process. Returns `Ok(false)` when the user cancelled (or a Save left the page unsaved).
    pub fn close_page(
        &mut self,
        page_id: PageId,
        ensure_non_empty: bool,
        prompt: &mut dyn SavePrompt,
    ) -> Result<bool, LifecycleError> {
        let (running, saved) = {
            let page = self
                .notebook
                .page(page_id)
                .ok_or(LifecycleError::PageNotFound { page_id })?;
            (page.document().has_running_process(), page.document().is_saved())
        };

        // Bring the page to the front so the user sees what they are confirming.
        if running || !saved {
            self.notebook.activate(page_id)?;
            self.refresh_active();
        }

        if !saved {
            let choice = {
                let page = self
                    .notebook
                    .page(page_id)
                    .ok_or(LifecycleError::PageNotFound { page_id })?;
                prompt.unsaved_changes(page)
            };
            match choice {
                SaveChoice::Save => {
                    self.save_page(page_id, prompt)?;
                    let still_unsaved = !self
                        .notebook
                        .page(page_id)
                        .ok_or(LifecycleError::PageNotFound { page_id })?
                        .document()
                        .is_saved();
                    if still_unsaved {
                        return Ok(false);
                    }
                }
                SaveChoice::Discard => {}
                SaveChoice::Cancel => return Ok(false),
            }
        }

        // The user already confirmed discard; a stuck process is logged, not fatal.
        let process = self
            .notebook
            .page_mut(page_id)
            .and_then(|page| page.document_mut().take_process());
        if let Some(mut process) = process {
            if let Err(error) = process.stop(self.stop_timeout) {
                self.console
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Error: cannot stop flow process: {error}"));
            }
        }

        self.notebook.remove(page_id)?;
        if self.notebook.is_empty() && ensure_non_empty {
            self.new_page()?;
        }
        self.refresh_active();
        Ok(true)
    }

    /// Current session state, captured for restore-on-next-start. Only file-backed pages enter
    /// the snapshot.
    pub fn session_snapshot(&self) -> Prefs {
        Prefs {
            open_files: self.notebook.open_paths().into_iter().flatten().collect(),
            file_open: self
                .notebook
                .active_page()
                .and_then(|page| page.document().file_path().map(Path::to_path_buf)),
            console_visible: self.console_visible,
            blocks_visible: self.blocks_visible,
        }
    }

    /// Closes every page, unsaved pages first so a cancel aborts the teardown before any saved
    /// page is touched. Returns `Ok(true)` only when the notebook ended empty, in which case the
    /// session snapshot taken at entry has been persisted for restore.
    pub fn close_all(&mut self, prompt: &mut dyn SavePrompt) -> Result<bool, LifecycleError> {
        let snapshot = self.session_snapshot();
        self.close_all_from(snapshot, prompt)
    }

    /// Like [`close_all`](Self::close_all) but with a snapshot captured earlier. Front ends that
    /// resolve prompts across event-loop turns capture once and re-enter with the same snapshot,
    /// so pages closed on earlier attempts still restore next start.
    pub fn close_all_from(
        &mut self,
        snapshot: Prefs,
        prompt: &mut dyn SavePrompt,
    ) -> Result<bool, LifecycleError> {
        let mut order: Vec<PageId> = self.notebook.pages().iter().map(Page::page_id).collect();
        order.sort_by_key(|page_id| {
            self.notebook
                .page(*page_id)
                .is_some_and(|page| page.document().is_saved())
        });

        for page_id in order {
            if !self.close_page(page_id, false, prompt)? {
                break;
            }
        }
        if !self.notebook.is_empty() {
            return Ok(false);
        }

        if let Err(error) = snapshot.save(&self.config_dir, self.durability) {
            self.console
                .lock()
                .expect("console lock poisoned")
                .log(format!(">>> Error: cannot persist session state: {error}"));
        }
        Ok(true)
    }

    pub fn switch_page(&mut self, index: usize) -> Result<PageId, LifecycleError> {
        let page_id = self
            .notebook
            .page_at(index)
            .map(Page::page_id)
            .ok_or(LifecycleError::TabOutOfRange { index })?;
        self.notebook.activate(page_id)?;
        self.refresh_active();
        Ok(page_id)
    }

    pub fn activate(&mut self, page_id: PageId) -> Result<(), LifecycleError> {
        self.notebook.activate(page_id)?;
        self.refresh_active();
        Ok(())
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), LifecycleError> {
        self.notebook.move_page(from, to)?;
        Ok(())
    }

    /// Saves a page, prompting for a target path when it has none. Save failures are recovered
    /// locally: logged, the page stays open and unsaved. Data is never silently discarded.
    pub fn save_page(
        &mut self,
        page_id: PageId,
        prompt: &mut dyn SavePrompt,
    ) -> Result<(), LifecycleError> {
        let has_path = self
            .notebook
            .page(page_id)
            .ok_or(LifecycleError::PageNotFound { page_id })?
            .document()
            .file_path()
            .is_some();

        if !has_path {
            let chosen = {
                let page = self
                    .notebook
                    .page(page_id)
                    .ok_or(LifecycleError::PageNotFound { page_id })?;
                prompt.save_path_for(page)
            };
            return match chosen {
                Some(path) => self.save_page_as(page_id, path),
                None => Ok(()),
            };
        }
        self.write_page(page_id)
    }

    /// Retargets a page to `path` and saves. Refused when another page already owns the path
    /// (the no-duplicate-path invariant).
    pub fn save_page_as(&mut self, page_id: PageId, path: PathBuf) -> Result<(), LifecycleError> {
        if let Some(other) = self.notebook.find_by_path(&path) {
            if other != page_id {
                self.console.lock().expect("console lock poisoned").log(format!(
                    ">>> Error: {} is already open in another tab",
                    path.display()
                ));
                return Ok(());
            }
        }

        let document = self
            .notebook
            .page_mut(page_id)
            .ok_or(LifecycleError::PageNotFound { page_id })?
            .document_mut();
        document.set_file_path(path);
        document.set_read_only(false);
        self.write_page(page_id)
    }

    fn write_page(&mut self, page_id: PageId) -> Result<(), LifecycleError> {
        let write_result = {
            let page = self
                .notebook
                .page(page_id)
                .ok_or(LifecycleError::PageNotFound { page_id })?;
            let document = page.document();
            let Some(path) = document.file_path() else {
                return Ok(());
            };
            if document.is_read_only() {
                self.console
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Error: {} is read only, use save-as", path.display()));
                return Ok(());
            }
            save_flow_graph(path, document.graph(), self.durability).map(|()| path.to_path_buf())
        };

        match write_result {
            Ok(path) => {
                let document = self
                    .notebook
                    .page_mut(page_id)
                    .ok_or(LifecycleError::PageNotFound { page_id })?
                    .document_mut();
                document.mark_saved();
                document.set_read_only(read_only_on_disk(&path));
            }
            Err(error) => {
                self.console.lock().expect("console lock poisoned").fail_save(&error);
            }
        }
        Ok(())
    }

    /// Reloads every file-backed page from disk. A reload that discarded in-memory changes marks
    /// the page unsaved so the user sees it diverged.
    pub fn reload_pages(&mut self) -> Result<(), LifecycleError> {
        let page_ids: Vec<PageId> = self.notebook.pages().iter().map(Page::page_id).collect();
        for page_id in page_ids {
            let Some(path) = self
                .notebook
                .page(page_id)
                .and_then(|page| page.document().file_path().map(Path::to_path_buf))
            else {
                continue;
            };
            match self.platform.load_flow_graph(&path) {
                Ok(loaded) => {
                    let document = self
                        .notebook
                        .page_mut(page_id)
                        .ok_or(LifecycleError::PageNotFound { page_id })?
                        .document_mut();
                    let diverged = document.replace_graph(loaded.graph);
                    document.set_read_only(loaded.read_only);
                    if diverged {
                        document.mark_unsaved();
                    }
                }
                Err(GraphLoadError::Load(error)) => {
                    self.console.lock().expect("console lock poisoned").fail_load(&path, &error);
                }
                Err(GraphLoadError::Fatal(error)) => return Err(self.handle_fatal(error)),
            }
        }
        Ok(())
    }

    /// Generates the runner artifact and starts the flow graph out of process. Requires a saved,
    /// file-backed page. Returns whether a process was started.
    pub fn run_page(&mut self, page_id: PageId) -> Result<bool, LifecycleError> {
        let (path, saved, running) = {
            let page = self
                .notebook
                .page(page_id)
                .ok_or(LifecycleError::PageNotFound { page_id })?;
            let document = page.document();
            (
                document.file_path().map(Path::to_path_buf),
                document.is_saved(),
                document.has_running_process(),
            )
        };

        if running {
            self.console
                .lock()
                .expect("console lock poisoned")
                .log(">>> Flow graph is already running");
            return Ok(false);
        }
        let Some(path) = path else {
            self.console
                .lock()
                .expect("console lock poisoned")
                .log(">>> Error: save the flow graph before running it");
            return Ok(false);
        };
        if !saved {
            self.console
                .lock()
                .expect("console lock poisoned")
                .log(">>> Error: save the flow graph before running it");
            return Ok(false);
        }

        let runner = match generate_runner(&path) {
            Ok(runner) => runner,
            Err(error) => {
                self.console
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Error: cannot generate runner: {error}"));
                return Ok(false);
            }
        };
        match FlowProcess::spawn_runner(&runner) {
            Ok(process) => {
                self.console
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Running: {}", process.command_line()));
                let document = self
                    .notebook
                    .page_mut(page_id)
                    .ok_or(LifecycleError::PageNotFound { page_id })?
                    .document_mut();
                document.set_process(process);
                Ok(true)
            }
            Err(error) => {
                self.console
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Error: cannot start flow process: {error}"));
                Ok(false)
            }
        }
    }

    /// Stops the page's running process, if any. Returns whether one was stopped.
    pub fn stop_page(&mut self, page_id: PageId) -> Result<bool, LifecycleError> {
        let process = self
            .notebook
            .page_mut(page_id)
            .ok_or(LifecycleError::PageNotFound { page_id })?
            .document_mut()
            .take_process();
        let Some(mut process) = process else {
            return Ok(false);
        };
        match process.stop(self.stop_timeout) {
            Ok(()) => {
                self.console.lock().expect("console lock poisoned").log(">>> Stopped");
            }
            Err(error) => {
                self.console
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Error: cannot stop flow process: {error}"));
            }
        }
        Ok(true)
    }

    fn require_active(&self) -> Result<PageId, LifecycleError> {
        self.notebook.active_page_id().ok_or(LifecycleError::NoActivePage)
    }

    fn cycle_page(&mut self, step: isize) -> Result<(), LifecycleError> {
        let count = self.notebook.len();
        if count == 0 {
            return Err(LifecycleError::NoActivePage);
        }
        let current = self
            .require_active()
            .ok()
            .and_then(|page_id| self.notebook.index_of(page_id))
            .unwrap_or(0);
        let next = (current as isize + step).rem_euclid(count as isize) as usize;
        self.switch_page(next)?;
        Ok(())
    }

    fn refresh_active(&mut self) {
        let active = self.notebook.active_page_id();
        self.refresh.on_active_page_changed(active);
    }

    fn handle_fatal(&mut self, error: FatalConfigError) -> LifecycleError {
        self.console.lock().expect("console lock poisoned").fatal(&error);
        self.fatal.terminate(&error);
        LifecycleError::Fatal(error)
    }
}
