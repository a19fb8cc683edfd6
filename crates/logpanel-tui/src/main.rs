//! Terminal log panel: pipe a program's output in and watch it with
//! capture toggles, HTML rendering and image export.
//!
//! Standard input is read line by line and printed through the panel's
//! console, so it shows up while Printing is on. Output printed while
//! Printing is off is held back and written to stdout on exit.
//!
//! # Examples
//!
//! ```sh
//! # Follow a build log, keeping the last 2000 entries
//! cargo build 2>&1 | logpanel --printing --max-history 2000
//!
//! # Treat stdin lines as log records from the `stdin` logger
//! ./server | logpanel --stdin-as-log --logging --format "{time} {level} {message}"
//!
//! # Start with an rST note, a table and a plot in the log
//! logpanel --rst notes.rst --table data.json --plot samples.txt --plotting
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;
use logpanel::capture::LineFigure;
use logpanel::prelude::*;
use logpanel_tui::{TuiConfig, spawn_tui};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Terminal log panel with stdout, logging and plot capture.
#[derive(Parser)]
#[command(name = "logpanel")]
struct Cli {
    // ── Panel ──────────────────────────────────────────────────
    /// JSON file with panel settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of entries kept
    #[arg(long)]
    max_history: Option<usize>,

    /// Panel background as #rrggbb (drives the plot style)
    #[arg(long, value_parser = parse_rgb)]
    background: Option<[u8; 3]>,

    /// Title of the log surface
    #[arg(long, default_value = "Log")]
    title: String,

    // ── Initial toggles ────────────────────────────────────────
    /// Start with Printing on
    #[arg(long)]
    printing: bool,

    /// Start with HTML on
    #[arg(long)]
    html: bool,

    /// Start with Logging on
    #[arg(long)]
    logging: bool,

    /// Start with Plotting on
    #[arg(long)]
    plotting: bool,

    // ── Logging ────────────────────────────────────────────────
    /// Logger the Logging toggle attaches to (default: root)
    #[arg(long)]
    logger_name: Option<String>,

    /// Record format, with {level}, {message}, {target} and {time}
    #[arg(long)]
    format: Option<String>,

    /// Minimum level of captured records
    #[arg(long, value_parser = parse_level)]
    log_level: Option<LogLevel>,

    /// Emit stdin lines as INFO records on the `stdin` logger instead of
    /// printing them
    #[arg(long)]
    stdin_as_log: bool,

    // ── Startup content ────────────────────────────────────────
    /// reStructuredText file to show first
    #[arg(long)]
    rst: Option<PathBuf>,

    /// JSON table (records, columns or rows) to show first
    #[arg(long)]
    table: Option<PathBuf>,

    /// Image file to show first
    #[arg(long)]
    image: Option<PathBuf>,

    /// Colormap for grayscale images
    #[arg(long, value_parser = parse_cmap)]
    cmap: Option<Colormap>,

    /// Whitespace-separated samples to open as a line plot
    #[arg(long)]
    plot: Option<PathBuf>,
}

fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| format!("expected #rrggbb, got {s:?}"))
    };
    if hex.len() != 6 {
        return Err(format!("expected #rrggbb, got {s:?}"));
    }
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Ok(LogLevel::Trace),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        _ => Err(format!("unknown level {s:?}")),
    }
}

fn parse_cmap(s: &str) -> Result<Colormap, String> {
    Colormap::from_name(s).ok_or_else(|| format!("unknown colormap {s:?}"))
}

fn build_config(cli: &Cli) -> Result<PanelConfig, String> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&raw)
                .map_err(|e| format!("invalid config {}: {e}", path.display()))?
        }
        None => PanelConfig::default().with_log_level(LogLevel::Info),
    };
    if let Some(n) = cli.max_history {
        config = config.with_max_history(n);
    }
    if let Some(rgb) = cli.background {
        config = config.with_background(rgb);
    }
    if let Some(name) = &cli.logger_name {
        config = config.with_logger_name(name.clone());
    }
    if let Some(format) = &cli.format {
        config = config.with_log_format(format.clone());
    }
    if let Some(level) = cli.log_level {
        config = config.with_log_level(level);
    }
    config.printing |= cli.printing;
    config.html |= cli.html;
    config.logging |= cli.logging;
    config.plotting |= cli.plotting;
    Ok(config)
}

/// Queue the content named on the command line.
fn load_startup_content(cli: &Cli, logger: &Logger, plotter: &Plotter) -> Result<(), String> {
    if let Some(path) = &cli.rst {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        logger.print_rst(&source);
    }
    if let Some(path) = &cli.table {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
        logger
            .print_table_json(&value, &TableOptions::default())
            .map_err(|e| e.to_string())?;
    }
    if let Some(path) = &cli.image {
        let mut opts = ImageOptions::default();
        if let Some(cmap) = cli.cmap {
            opts = opts.with_cmap(cmap);
        }
        logger
            .print_image(path.clone(), &opts)
            .map_err(|e| e.to_string())?;
    }
    if let Some(path) = &cli.plot {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let samples = raw
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid sample in {}: {e}", path.display()))?;
        let points = samples.into_iter().enumerate().map(|(i, y)| (i as f64, y));
        plotter.add_figure(LineFigure::new(480, 240).with_series(points));
        plotter.show().map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Console output produced while Printing is off.
#[derive(Clone, Default)]
struct HeldOutput(Arc<Mutex<Vec<u8>>>);

impl Write for HeldOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    // The terminal belongs to the TUI, so the console's own target is a
    // buffer flushed on exit.
    let held = HeldOutput::default();
    let console = Console::with_target(held.clone());

    // Set up tracing → panel router.
    let router = LogRouter::new();
    tracing_subscriber::registry().with(router.layer()).init();

    let plotter = Plotter::new();
    let contexts = CaptureContexts::new(console.clone(), router).with_plotter(plotter.clone());
    let panel = match LogPanel::new(&config, contexts) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = load_startup_content(&cli, panel.logger(), &plotter) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    // Feed stdin into the console (or the `stdin` logger) from its own
    // thread; the TUI reads keys from the terminal.
    let stdin_as_log = cli.stdin_as_log;
    let stdin_console = console.clone();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if stdin_as_log {
                tracing::info!(target: "stdin", "{line}");
            } else if stdin_console.println(&line).is_err() {
                break;
            }
        }
    });

    let tui_config = TuiConfig {
        title: cli.title.clone(),
        ..Default::default()
    };
    match spawn_tui(panel, tui_config).join() {
        // Dropping the panel releases every capture.
        Ok(panel) => drop(panel),
        Err(_) => {
            eprintln!("Error: TUI thread panicked");
            process::exit(1);
        }
    }

    let held = std::mem::take(&mut *held.0.lock().unwrap_or_else(|e| e.into_inner()));
    let mut stdout = io::stdout();
    if stdout.write_all(&held).and_then(|()| stdout.flush()).is_err() {
        process::exit(1);
    }
}
