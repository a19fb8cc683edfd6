//! Terminal frontend for a [`LogPanel`].
//!
//! Draws the capture toggle strip and the scrollable log surface with
//! ratatui + crossterm, and drains the panel's producer queue once per
//! frame.
//!
//! # Quick start
//!
//! ```ignore
//! use logpanel::prelude::*;
//! use logpanel_tui::{TuiConfig, spawn_tui};
//!
//! let contexts = CaptureContexts::new(console, router).with_plotter(Plotter::new());
//! let panel = LogPanel::new(&PanelConfig::default(), contexts)?;
//! let logger = panel.logger().clone();
//! let handle = spawn_tui(panel, TuiConfig::default());
//! logger.print("hello from another thread");
//! handle.join().unwrap();
//! ```

use std::io;
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{cursor, execute};
use logpanel::LogPanel;
use ratatui::prelude::*;

mod app;
mod input;
mod render;

pub use render::{entry_lines, toggle_strip_spans};

use app::App;
use input::handle_key_event;
use render::render;

/// Configuration for the TUI.
#[derive(Debug, Clone)]
pub struct TuiConfig {
    /// Title of the log surface. Default: `"Log"`.
    pub title: String,
    /// How long to wait for input between frames. Default: 100ms.
    pub tick_rate: Duration,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            title: "Log".to_string(),
            tick_rate: Duration::from_millis(100),
        }
    }
}

/// Spawn the TUI on a dedicated OS thread. The panel is handed back when
/// the user quits.
pub fn spawn_tui(mut panel: LogPanel, config: TuiConfig) -> JoinHandle<LogPanel> {
    std::thread::spawn(move || {
        if let Err(e) = run_tui(&mut panel, &config) {
            eprintln!("TUI error: {e}");
        }
        panel
    })
}

/// Run the TUI event loop (blocking) until the user presses `q`.
pub fn run_tui(panel: &mut LogPanel, config: &TuiConfig) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let result = event_loop(&mut terminal, panel, config);

    // Restore the terminal even when the loop failed.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    panel: &mut LogPanel,
    config: &TuiConfig,
) -> io::Result<()> {
    let mut app = App::new();

    while !app.should_quit {
        // Apply everything producers queued since the last frame.
        panel.process_pending();

        terminal.draw(|frame| render(frame, panel, &app, config))?;

        if event::poll(config.tick_rate)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key_event(key, &mut app, panel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tui_config_default() {
        let config = TuiConfig::default();
        assert_eq!(config.title, "Log");
        assert_eq!(config.tick_rate, Duration::from_millis(100));
    }
}
