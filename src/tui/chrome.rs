// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

/// Title, tab-label, footer, and style helpers used by TUI rendering.
const UNTITLED: &str = "untitled";
const READ_ONLY_SUFFIX: &str = " (read only)";
const READ_ONLY_MARKER: &str = " (ro)";

fn file_stem_label(path: Option<&Path>) -> String {
    path.and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNTITLED.to_owned())
}

/// Window-title line: `*` for unsaved, file stem or placeholder, long-form read-only suffix,
/// then the containing directory or the application name.
fn frame_title(path: Option<&Path>, saved: bool, read_only: bool) -> String {
    let mut title = String::new();
    if !saved {
        title.push('*');
    }
    title.push_str(&file_stem_label(path));
    if read_only {
        title.push_str(READ_ONLY_SUFFIX);
    }
    title.push_str(" - ");
    let dir = path
        .and_then(Path::parent)
        .map(|dir| dir.display().to_string())
        .filter(|dir| !dir.is_empty());
    match dir {
        Some(dir) => title.push_str(&dir),
        None => title.push_str(APP_NAME),
    }
    title
}

/// Tab label: same prefix logic as the title but with the short read-only marker; the
/// unsaved state is conveyed by color, not text.
fn tab_label(path: Option<&Path>, read_only: bool) -> String {
    let mut label = file_stem_label(path);
    if read_only {
        label.push_str(READ_ONLY_MARKER);
    }
    label
}

fn tab_style(saved: bool, active: bool) -> Style {
    let mut style = if saved {
        Style::default().fg(TAB_SAVED_COLOR)
    } else {
        Style::default().fg(TAB_UNSAVED_COLOR)
    };
    if active {
        style = style.add_modifier(Modifier::BOLD);
    }
    style
}

/// The tab bar disappears with a single page so the graph gets the full height.
fn tab_bar_visible(page_count: usize) -> bool {
    page_count > 1
}

fn stack_side_panel_vertically(area: Rect) -> bool {
    area.width < 100
}

fn block_line(block: &BlockInstance) -> String {
    if block.params.is_empty() {
        return format!("{} [{}]", block.name, block.key);
    }
    let params = block
        .params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} [{}] {params}", block.name, block.key)
}

fn connection_line(connection: &Connection) -> String {
    format!(
        "{}:{} -> {}:{}",
        connection.src_block, connection.src_port, connection.dst_block, connection.dst_port
    )
}

fn footer_help_line(overlay_active: bool) -> Line<'static> {
    let hints: &[(&str, &str)] = if overlay_active {
        &[("s", "save"), ("d", "discard"), ("esc", "cancel")]
    } else {
        &[
            ("n", "new"),
            ("o", "open"),
            ("w", "close"),
            ("s", "save"),
            ("S", "save as"),
            ("r", "run"),
            ("x", "stop"),
            ("tab", "next"),
            ("c", "console"),
            ("b", "blocks"),
            ("q", "quit"),
        ]
    };

    let mut spans = Vec::with_capacity(hints.len() * 2 + 1);
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {key}"), Style::default().fg(FOOTER_KEY_COLOR)));
        spans.push(Span::styled(
            format!(":{label}"),
            Style::default().fg(FOOTER_LABEL_COLOR),
        ));
    }
    spans.push(Span::styled(
        format!("  {APP_NAME}"),
        Style::default().fg(FOOTER_BRAND_COLOR),
    ));
    Line::from(spans)
}
