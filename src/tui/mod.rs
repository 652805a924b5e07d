// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! Terminal UI.
//!
//! Provides the interactive TUI shell (ratatui + crossterm): notebook tab bar, flow-graph view,
//! block palette, console pane, and the save/discard/cancel overlays that resolve lifecycle
//! prompts across event-loop turns.

use std::{
    error::Error,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::controller::{
    LifecycleController, LifecycleError, SaveChoice, SavePrompt, UiAction,
};
use crate::model::{BlockInstance, Connection, Page, PageId};
use crate::platform::APP_NAME;
use crate::store::Prefs;

const TAB_SAVED_COLOR: Color = Color::Gray;
const TAB_UNSAVED_COLOR: Color = Color::LightRed;
const ACTIVE_BORDER_COLOR: Color = Color::LightGreen;
const OVERLAY_BORDER_COLOR: Color = Color::LightYellow;
const FOOTER_LABEL_COLOR: Color = Color::Gray;
const FOOTER_KEY_COLOR: Color = Color::Cyan;
const FOOTER_BRAND_COLOR: Color = Color::White;
const CONSOLE_HEIGHT: u16 = 8;

/// Runs the interactive terminal UI over an already-populated controller.
pub fn run(controller: LifecycleController) -> Result<(), Box<dyn Error>> {
    let mut terminal = TerminalSession::new()?;
    let mut app = App::new(controller);

    while !app.should_quit {
        terminal.draw(|frame| draw(frame, &mut app))?;

        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key)?;
                }
                _ => {}
            }
        }
    }

    Ok(())
}

include!("chrome.rs");

/// What a close attempt was working toward when it got interrupted by a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseTarget {
    Page(PageId),
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Overlay {
    ConfirmClose { page_id: PageId, target: CloseTarget },
    PathInput { kind: PathInputKind, buffer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathInputKind {
    Open,
    SaveAs { page_id: PageId, follow_up: Option<CloseTarget> },
}

/// One-shot prompt fed pre-resolved answers from the overlay. An unanswered question is
/// recorded instead of blocking, so the event loop can raise the matching overlay and re-enter
/// the lifecycle operation next turn.
#[derive(Debug, Default)]
struct TurnPrompt {
    choice: Option<(PageId, SaveChoice)>,
    save_path: Option<(PageId, PathBuf)>,
    needs_choice: Option<PageId>,
    needs_path: Option<PageId>,
}

impl TurnPrompt {
    fn with_choice(page_id: PageId, choice: SaveChoice) -> Self {
        Self { choice: Some((page_id, choice)), ..Self::default() }
    }
}

impl SavePrompt for TurnPrompt {
    fn unsaved_changes(&mut self, page: &Page) -> SaveChoice {
        if let Some((page_id, choice)) = self.choice {
            if page_id == page.page_id() {
                self.choice = None;
                return choice;
            }
        }
        self.needs_choice = Some(page.page_id());
        SaveChoice::Cancel
    }

    fn save_path_for(&mut self, page: &Page) -> Option<PathBuf> {
        if let Some((page_id, _)) = &self.save_path {
            if *page_id == page.page_id() {
                return self.save_path.take().map(|(_, path)| path);
            }
        }
        self.needs_path = Some(page.page_id());
        None
    }
}

struct App {
    controller: LifecycleController,
    overlay: Option<Overlay>,
    quit_snapshot: Option<Prefs>,
    should_quit: bool,
}

impl App {
    fn new(controller: LifecycleController) -> Self {
        Self { controller, overlay: None, quit_snapshot: None, should_quit: false }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<(), LifecycleError> {
        if self.overlay.is_some() {
            return self.handle_overlay_key(key);
        }

        match key.code {
            KeyCode::Char('q') => self.request_quit()?,
            KeyCode::Char('n') => self.dispatch(UiAction::NewPage)?,
            KeyCode::Char('o') => {
                self.overlay = Some(Overlay::PathInput {
                    kind: PathInputKind::Open,
                    buffer: String::new(),
                });
            }
            KeyCode::Char('w') => self.request_close_page()?,
            KeyCode::Char('s') => self.request_save()?,
            KeyCode::Char('S') => {
                if let Some(page_id) = self.controller.notebook().active_page_id() {
                    self.overlay = Some(Overlay::PathInput {
                        kind: PathInputKind::SaveAs { page_id, follow_up: None },
                        buffer: self.active_path_text(),
                    });
                }
            }
            KeyCode::Char('r') => self.dispatch(UiAction::RunPage)?,
            KeyCode::Char('x') => self.dispatch(UiAction::StopPage)?,
            KeyCode::Char('c') => {
                let visible = self.controller.console_visible();
                self.controller.set_console_visible(!visible);
            }
            KeyCode::Char('b') => {
                let visible = self.controller.blocks_visible();
                self.controller.set_blocks_visible(!visible);
            }
            KeyCode::Tab => self.dispatch(UiAction::NextPage)?,
            KeyCode::BackTab => self.dispatch(UiAction::PrevPage)?,
            KeyCode::Char('<') => self.move_active_tab(-1)?,
            KeyCode::Char('>') => self.move_active_tab(1)?,
            KeyCode::F(5) => self.dispatch(UiAction::ReloadPages)?,
            KeyCode::Char(digit @ '1'..='9') => {
                let index = digit as usize - '1' as usize;
                if index < self.controller.notebook().len() {
                    self.dispatch(UiAction::SwitchPage { index })?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> Result<(), LifecycleError> {
        let Some(overlay) = self.overlay.take() else {
            return Ok(());
        };
        match overlay {
            Overlay::ConfirmClose { page_id, target } => match key.code {
                KeyCode::Char('s') | KeyCode::Char('S') => {
                    self.attempt_close(target, TurnPrompt::with_choice(page_id, SaveChoice::Save))?;
                }
                KeyCode::Char('d') | KeyCode::Char('D') => {
                    self.attempt_close(
                        target,
                        TurnPrompt::with_choice(page_id, SaveChoice::Discard),
                    )?;
                }
                KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('C') => {
                    self.quit_snapshot = None;
                }
                _ => {
                    self.overlay = Some(Overlay::ConfirmClose { page_id, target });
                }
            },
            Overlay::PathInput { kind, mut buffer } => match key.code {
                KeyCode::Enter => {
                    let path = PathBuf::from(buffer.trim());
                    if path.as_os_str().is_empty() {
                        self.overlay = Some(Overlay::PathInput { kind, buffer });
                        return Ok(());
                    }
                    match kind {
                        PathInputKind::Open => {
                            self.dispatch(UiAction::OpenDocument { path })?;
                        }
                        PathInputKind::SaveAs { page_id, follow_up: None } => {
                            let result = self.controller.save_page_as(page_id, path);
                            self.absorb(result)?;
                        }
                        PathInputKind::SaveAs { page_id, follow_up: Some(target) } => {
                            let mut prompt = TurnPrompt::with_choice(page_id, SaveChoice::Save);
                            prompt.save_path = Some((page_id, path));
                            self.attempt_close(target, prompt)?;
                        }
                    }
                }
                KeyCode::Esc => {
                    self.quit_snapshot = None;
                }
                KeyCode::Backspace => {
                    buffer.pop();
                    self.overlay = Some(Overlay::PathInput { kind, buffer });
                }
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    buffer.push(ch);
                    self.overlay = Some(Overlay::PathInput { kind, buffer });
                }
                _ => {
                    self.overlay = Some(Overlay::PathInput { kind, buffer });
                }
            },
        }
        Ok(())
    }

    fn move_active_tab(&mut self, step: isize) -> Result<(), LifecycleError> {
        let Some(from) = self
            .controller
            .notebook()
            .active_page_id()
            .and_then(|page_id| self.controller.notebook().index_of(page_id))
        else {
            return Ok(());
        };
        let Some(to) = from.checked_add_signed(step) else {
            return Ok(());
        };
        let result = self.controller.move_page(from, to);
        self.absorb(result)?;
        Ok(())
    }

    fn request_save(&mut self) -> Result<(), LifecycleError> {
        let Some(page_id) = self.controller.notebook().active_page_id() else {
            return Ok(());
        };
        let mut prompt = TurnPrompt::default();
        let result = self.controller.save_page(page_id, &mut prompt);
        self.absorb(result)?;
        if let Some(page_id) = prompt.needs_path {
            self.overlay = Some(Overlay::PathInput {
                kind: PathInputKind::SaveAs { page_id, follow_up: None },
                buffer: String::new(),
            });
        }
        Ok(())
    }

    fn request_close_page(&mut self) -> Result<(), LifecycleError> {
        let Some(page_id) = self.controller.notebook().active_page_id() else {
            return Ok(());
        };
        self.attempt_close(CloseTarget::Page(page_id), TurnPrompt::default())
    }

    fn request_quit(&mut self) -> Result<(), LifecycleError> {
        // Snapshot once; re-entries after overlay answers reuse it so pages already closed
        // still restore next start.
        if self.quit_snapshot.is_none() {
            self.quit_snapshot = Some(self.controller.session_snapshot());
        }
        self.attempt_close(CloseTarget::Quit, TurnPrompt::default())
    }

    fn attempt_close(
        &mut self,
        target: CloseTarget,
        mut prompt: TurnPrompt,
    ) -> Result<(), LifecycleError> {
        let done = match target {
            CloseTarget::Page(page_id) => {
                let result = self.controller.close_page(page_id, true, &mut prompt);
                self.absorb(result)?;
                false
            }
            CloseTarget::Quit => {
                let snapshot = match &self.quit_snapshot {
                    Some(snapshot) => snapshot.clone(),
                    None => self.controller.session_snapshot(),
                };
                let result = self.controller.close_all_from(snapshot, &mut prompt);
                self.absorb(result)?.unwrap_or(false)
            }
        };

        if done {
            self.should_quit = true;
        } else if let Some(page_id) = prompt.needs_path {
            self.overlay = Some(Overlay::PathInput {
                kind: PathInputKind::SaveAs { page_id, follow_up: Some(target) },
                buffer: String::new(),
            });
        } else if let Some(page_id) = prompt.needs_choice {
            self.overlay = Some(Overlay::ConfirmClose { page_id, target });
        } else {
            // Close finished or failed without needing input; stand down from quitting.
            self.quit_snapshot = None;
        }
        Ok(())
    }

    fn dispatch(&mut self, action: UiAction) -> Result<(), LifecycleError> {
        let mut prompt = TurnPrompt::default();
        let result = self.controller.dispatch(action, &mut prompt);
        self.absorb(result)?;
        Ok(())
    }

    /// Benign lifecycle errors are logged to the console pane; a fatal configuration error
    /// unwinds the UI so the terminal is restored before the process exits.
    fn absorb<T>(
        &mut self,
        result: Result<T, LifecycleError>,
    ) -> Result<Option<T>, LifecycleError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(error @ LifecycleError::Fatal(_)) => Err(error),
            Err(error) => {
                self.controller
                    .console()
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Error: {error}"));
                Ok(None)
            }
        }
    }

    fn active_path_text(&self) -> String {
        self.controller
            .notebook()
            .active_page()
            .and_then(|page| page.document().file_path())
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    }

    fn page_label(&self, page_id: PageId) -> String {
        self.controller
            .notebook()
            .page(page_id)
            .map(|page| {
                tab_label(page.document().file_path(), page.document().is_read_only())
            })
            .unwrap_or_else(|| UNTITLED.to_owned())
    }
}

// Borrow rules: collect render inputs from the controller up front, then hand out the frame.
fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.size();
    let tab_bar = tab_bar_visible(app.controller.notebook().len());
    let console_visible = app.controller.console_visible();

    let mut constraints = Vec::with_capacity(4);
    if tab_bar {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(3));
    if console_visible {
        constraints.push(Constraint::Length(CONSOLE_HEIGHT));
    }
    constraints.push(Constraint::Length(1));
    let rows = Layout::vertical(constraints).split(area);

    let mut row = 0;
    if tab_bar {
        draw_tab_bar(frame, rows[row], app);
        row += 1;
    }
    draw_main(frame, rows[row], app);
    row += 1;
    if console_visible {
        draw_console(frame, rows[row], app);
        row += 1;
    }
    let footer = Paragraph::new(footer_help_line(app.overlay.is_some()));
    frame.render_widget(footer, rows[row]);

    if let Some(overlay) = &app.overlay {
        draw_overlay(frame, area, app, overlay);
    }
}

fn draw_tab_bar(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = app.controller.notebook().active_page_id();
    let mut spans = Vec::new();
    for page in app.controller.notebook().pages() {
        let document = page.document();
        let label = tab_label(document.file_path(), document.is_read_only());
        let is_active = active == Some(page.page_id());
        spans.push(Span::styled(
            format!(" {label} "),
            tab_style(document.is_saved(), is_active),
        ));
        spans.push(Span::raw("│"));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_main(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let blocks_visible = app.controller.blocks_visible();
    let (graph_area, palette_area) = if blocks_visible {
        if stack_side_panel_vertically(area) {
            let halves = Layout::vertical([Constraint::Min(3), Constraint::Length(10)]).split(area);
            (halves[0], Some(halves[1]))
        } else {
            let halves =
                Layout::horizontal([Constraint::Min(40), Constraint::Length(32)]).split(area);
            (halves[0], Some(halves[1]))
        }
    } else {
        (area, None)
    };

    let (title, lines) = match app.controller.notebook().active_page() {
        Some(page) => {
            let document = page.document();
            let title = frame_title(
                document.file_path(),
                document.is_saved(),
                document.is_read_only(),
            );
            let mut lines: Vec<Line<'_>> = document
                .graph()
                .blocks()
                .iter()
                .map(|block| Line::from(block_line(block)))
                .collect();
            if !document.graph().connections().is_empty() {
                lines.push(Line::from(""));
                lines.extend(
                    document
                        .graph()
                        .connections()
                        .iter()
                        .map(|connection| Line::from(connection_line(connection))),
                );
            }
            (title, lines)
        }
        None => (APP_NAME.to_owned(), Vec::new()),
    };

    let graph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACTIVE_BORDER_COLOR))
            .title(format!(" {title} ")),
    );
    frame.render_widget(graph, graph_area);

    if let Some(palette_area) = palette_area {
        let items: Vec<ListItem<'_>> = app
            .controller
            .platform()
            .block_defs()
            .values()
            .map(|def| ListItem::new(format!("{} [{}]", def.label, def.key)))
            .collect();
        let palette =
            List::new(items).block(Block::default().borders(Borders::ALL).title(" Blocks "));
        frame.render_widget(palette, palette_area);
    }
}

fn draw_console(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let console = app.controller.console().lock().expect("console lock poisoned");
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line<'_>> = console
        .lines()
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|line| Line::from(line.clone()))
        .collect();
    let pane = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Console "));
    frame.render_widget(pane, area);
}

fn draw_overlay(frame: &mut Frame<'_>, area: Rect, app: &App, overlay: &Overlay) {
    let rect = overlay_rect(area);
    frame.render_widget(Clear, rect);

    let (title, body) = match overlay {
        Overlay::ConfirmClose { page_id, .. } => (
            " Unsaved changes ".to_owned(),
            format!(
                "Save changes to {} before closing?\n\n[s]ave  [d]iscard  [esc] cancel",
                app.page_label(*page_id)
            ),
        ),
        Overlay::PathInput { kind, buffer } => {
            let title = match kind {
                PathInputKind::Open => " Open flow graph ",
                PathInputKind::SaveAs { .. } => " Save as ",
            };
            (title.to_owned(), format!("> {buffer}\u{2588}\n\n[enter] accept  [esc] cancel"))
        }
    };

    let pane = Paragraph::new(body).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(OVERLAY_BORDER_COLOR))
            .title(title),
    );
    frame.render_widget(pane, rect);
}

fn overlay_rect(area: Rect) -> Rect {
    let width = area.width.min(60).max(20);
    let height = 5;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect { x, y, width, height: height.min(area.height) }
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);
}
