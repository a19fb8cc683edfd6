//! Rendering for the log panel TUI: toggle strip, log surface, input bar.

use logpanel::html::html_to_plain;
use logpanel::{CaptureState, LogEntry, LogPanel};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::TuiConfig;
use crate::app::{App, InputMode};

// ── Public Utilities ──────────────────────────────────────────────────

/// Spans for the control strip: one checkbox per capture toggle.
pub fn toggle_strip_spans(state: CaptureState, plotting_available: bool) -> Vec<Span<'static>> {
    let checkbox = |label: &'static str, key: char, on: bool, enabled: bool| -> Vec<Span<'static>> {
        let mark = if on { "[x]" } else { "[ ]" };
        let style = if !enabled {
            Style::default().fg(Color::DarkGray)
        } else if on {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        vec![
            Span::styled(format!("{mark} {label}"), style),
            Span::styled(format!(" ({key})   "), Style::default().fg(Color::DarkGray)),
        ]
    };

    let mut spans = Vec::new();
    spans.extend(checkbox("Printing", 'p', state.printing, true));
    spans.extend(checkbox("HTML", 'h', state.html, true));
    spans.extend(checkbox("Logging", 'l', state.logging, true));
    spans.extend(checkbox("Plotting", 'g', state.plotting, plotting_available));
    spans
}

/// Lay entries out as display lines.
///
/// Text and HTML entries flow into each other the way the plain-text
/// snapshot does, so a stream write without a newline continues the
/// current line. Each image gets a placeholder line of its own.
pub fn entry_lines(entries: &[LogEntry], selected_image: Option<u64>) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for entry in entries {
        let (text, style) = match entry {
            LogEntry::Text(text) => (text.clone(), Style::default()),
            LogEntry::Html(html) => (html_to_plain(html), Style::default().fg(Color::Cyan)),
            LogEntry::Image(image) => {
                if !current.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
                let mut style = Style::default().fg(Color::Magenta);
                if selected_image == Some(image.id()) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                lines.push(Line::from(Span::styled(
                    format!("\u{fffc} [image {}x{}]", image.width(), image.height()),
                    style,
                )));
                lines.push(Line::from(""));
                continue;
            }
        };

        let mut pieces = text.split('\n').peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                current.push(Span::styled(piece.replace('\t', "    "), style));
            }
            if pieces.peek().is_some() {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

// ── Root Render ───────────────────────────────────────────────────────

/// Everything the frame needs, copied out of the panel before any widget
/// is built.
struct RenderSnapshot {
    state: CaptureState,
    plotting_available: bool,
    entries: Vec<LogEntry>,
    len: usize,
    max_history: usize,
}

pub(crate) fn render(frame: &mut Frame, panel: &LogPanel, app: &App, config: &TuiConfig) {
    let area = frame.area();

    // Outer layout: [3] toggle strip | [flex] log | [3] input bar.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    let snap = RenderSnapshot {
        state: panel.state(),
        plotting_available: panel.contexts().plotter.is_some(),
        entries: panel.view().entries().cloned().collect(),
        len: panel.view().sink().len(),
        max_history: panel.view().sink().max_history(),
    };

    render_toggles(frame, chunks[0], &snap);
    render_log(frame, chunks[1], &snap, app, config);
    render_input(frame, chunks[2], app);
}

// ── Toggle Strip ──────────────────────────────────────────────────────

fn render_toggles(frame: &mut Frame, area: Rect, snap: &RenderSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(" Capture ");
    let paragraph = Paragraph::new(Line::from(toggle_strip_spans(
        snap.state,
        snap.plotting_available,
    )))
    .block(block);
    frame.render_widget(paragraph, area);
}

// ── Log Surface ───────────────────────────────────────────────────────

fn render_log(frame: &mut Frame, area: Rect, snap: &RenderSnapshot, app: &App, config: &TuiConfig) {
    let inner_height = area.height.saturating_sub(2) as usize;
    let lines = entry_lines(&snap.entries, app.selected_image);

    let total = lines.len();
    let scroll = total
        .saturating_sub(inner_height)
        .saturating_sub(app.log_scroll);

    let title = if app.log_scroll == 0 {
        format!(" {} ({}/{}) ", config.title, snap.len, snap.max_history)
    } else {
        format!(
            " {} ({}/{}) [scrolled, End to follow] ",
            config.title, snap.len, snap.max_history
        )
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));

    frame.render_widget(paragraph, area);
}

// ── Input Bar ─────────────────────────────────────────────────────────

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let (title, style) = match app.input_mode {
        InputMode::Normal => {
            let hint = if let Some(ref msg) = app.status_message {
                msg.clone()
            } else {
                "[q] quit  [p/h/l/g] toggles  [f] show figures  [[/]] select image  [c] copy  [s] save  [x] clear"
                    .to_string()
            };
            (format!(" {hint} "), Style::default().fg(Color::DarkGray))
        }
        InputMode::SavePath => (
            " Save Image \u{2014} [Enter] save  [Esc] cancel ".to_string(),
            Style::default().fg(Color::Yellow),
        ),
    };

    let input_text = match app.input_mode {
        InputMode::Normal => String::new(),
        InputMode::SavePath => format!("> {}\u{2588}", app.input_buffer),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title);

    let paragraph = Paragraph::new(input_text).block(block);
    frame.render_widget(paragraph, area);
}

// ── Tests ─────────────────────────────────────────────────────────────
