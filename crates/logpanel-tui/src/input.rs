//! Key handling for the log panel TUI.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use logpanel::LogPanel;

use crate::app::{App, InputMode};

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App, panel: &mut LogPanel) {
    // Ctrl+C always quits.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_key(key, app, panel),
        InputMode::SavePath => handle_save_path_key(key, app, panel),
    }
}

fn handle_normal_key(key: KeyEvent, app: &mut App, panel: &mut LogPanel) {
    app.status_message = None;
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // ── Toggles ───────────────────────────────────────────
        KeyCode::Char('p') => panel.toggle_printing(),
        KeyCode::Char('h') => panel.toggle_html(),
        KeyCode::Char('l') => panel.toggle_logging(),
        KeyCode::Char('g') => {
            if let Err(e) = panel.toggle_plotting() {
                app.status_message = Some(format!("Plotting: {e}"));
            }
        }
        KeyCode::Char('f') => show_figures(app, panel),
        KeyCode::Char('x') => {
            panel.clear();
            app.log_scroll = 0;
            app.selected_image = None;
        }

        // ── Scrolling ─────────────────────────────────────────
        KeyCode::Up | KeyCode::Char('k') => app.log_scroll = app.log_scroll.saturating_add(3),
        KeyCode::Down | KeyCode::Char('j') => app.log_scroll = app.log_scroll.saturating_sub(3),
        KeyCode::PageUp => app.log_scroll = app.log_scroll.saturating_add(20),
        KeyCode::PageDown => app.log_scroll = app.log_scroll.saturating_sub(20),
        KeyCode::End => app.log_scroll = 0, // follow tail

        // ── Image actions ─────────────────────────────────────
        KeyCode::Char('[') => app.step_image(panel.view(), -1),
        KeyCode::Char(']') => app.step_image(panel.view(), 1),
        KeyCode::Char('c') => match app.selected_index(panel.view()) {
            Some(index) => {
                app.status_message = Some(match panel.copy_image(index) {
                    Ok(()) => "Image copied.".into(),
                    Err(e) => format!("Copy failed: {e}"),
                });
            }
            None => app.status_message = Some("Select an image with [ or ] first.".into()),
        },
        KeyCode::Char('s') => {
            if app.selected_index(panel.view()).is_none() {
                app.status_message = Some("Select an image with [ or ] first.".into());
                return;
            }
            let request = panel.exporter().save_request();
            let dir = request.directory.unwrap_or_else(|| PathBuf::from("."));
            app.input_buffer = format!("{}{}", dir.display(), std::path::MAIN_SEPARATOR);
            app.input_mode = InputMode::SavePath;
        }
        _ => {}
    }
}

fn show_figures(app: &mut App, panel: &LogPanel) {
    let Some(plotter) = panel.contexts().plotter.as_ref() else {
        app.status_message = Some("Plotting is unavailable.".into());
        return;
    };
    let open = plotter.open_figures();
    app.status_message = Some(match plotter.show() {
        Ok(()) if panel.state().plotting => format!("Showed {open} figure(s)."),
        Ok(()) => format!("{open} figure(s) open; enable Plotting [g] to capture them."),
        Err(e) => format!("Show failed: {e}"),
    });
}

fn handle_save_path_key(key: KeyEvent, app: &mut App, panel: &mut LogPanel) {
    match key.code {
        KeyCode::Esc => {
            app.input_buffer.clear();
            app.input_mode = InputMode::Normal;
            app.status_message = Some("Save cancelled.".into());
        }
        KeyCode::Enter => {
            let text = app.input_buffer.trim().to_string();
            app.input_buffer.clear();
            app.input_mode = InputMode::Normal;

            let Some(index) = app.selected_index(panel.view()) else {
                app.status_message = Some("The selected image is no longer in the log.".into());
                return;
            };
            let mut prompt = (!text.is_empty()).then(|| PathBuf::from(text));
            app.status_message = Some(match panel.save_image_as(index, &mut prompt) {
                Ok(Some(path)) => format!("Saved {}", path.display()),
                Ok(None) => "Save cancelled.".into(),
                Err(e) => format!("Save failed: {e}"),
            });
        }
        KeyCode::Backspace => {
            app.input_buffer.pop();
        }
        KeyCode::Char(c) => {
            app.input_buffer.push(c);
        }
        _ => {}
    }
}
