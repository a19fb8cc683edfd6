//! Producer-side handle: every way of putting content into the log.

use std::fmt::Display;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::capture::{
    AttachGuard, Console, Figure, Formatter, LogHandler, LogLevel, LogRecord, LogRouter,
    PlotCaptureGuard, PlotStyle, Plotter, RedirectGuard,
};
use crate::entry::{LogEntry, LogImage};
use crate::error::{PlotError, RenderError};
use crate::render::{
    ImageData, ImageOptions, Table, TableOptions, join_text, prepare_image, rst_to_html,
};
use crate::view::{CommandSender, ViewCommand};

/// Line break appended to HTML entries so that consecutive fragments
/// stack vertically.
const HTML_BREAK: &str = "<br></br>";

struct LoggerShared {
    print_as_html: AtomicBool,
    formatter: RwLock<Formatter>,
    level: RwLock<LogLevel>,
}

/// Cloneable handle that appends to a [`LogView`](crate::LogView) from any
/// thread.
///
/// All clones share the same HTML mode and log formatter. Appends after the
/// view is gone are dropped without error.
pub struct Logger {
    tx: CommandSender,
    shared: Arc<LoggerShared>,
    /// Trailing bytes of a UTF-8 sequence split across `io::Write` calls.
    partial: Vec<u8>,
}

impl Clone for Logger {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
            partial: Vec::new(),
        }
    }
}

impl Logger {
    pub(crate) fn from_sender(tx: CommandSender) -> Self {
        Self {
            tx,
            shared: Arc::new(LoggerShared {
                print_as_html: AtomicBool::new(false),
                formatter: RwLock::new(Formatter::default()),
                level: RwLock::new(LogLevel::Trace),
            }),
            partial: Vec::new(),
        }
    }

    /// Queue a raw entry.
    pub fn append(&self, entry: LogEntry) {
        // A closed channel means the view is gone.
        let _ = self.tx.send(ViewCommand::Append(entry));
    }

    /// Queue removal of every entry, ordered with the appends around it.
    pub fn clear(&self) {
        let _ = self.tx.send(ViewCommand::Clear);
    }

    /// Whether the owning view still exists.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    // ── Text ──────────────────────────────────────────────────────────

    /// Append `value` followed by a newline.
    pub fn print(&self, value: impl Display) {
        self.append(LogEntry::Text(format!("{value}\n")));
    }

    /// Append `pieces` joined by `sep` and terminated by `end`.
    pub fn print_joined<I, D>(&self, pieces: I, sep: &str, end: &str)
    where
        I: IntoIterator<Item = D>,
        D: Display,
    {
        self.append(LogEntry::Text(join_text(pieces, sep, end)));
    }

    /// Append an HTML fragment followed by a line break.
    pub fn print_html(&self, html: impl Into<String>) {
        self.print_html_with_end(html, HTML_BREAK);
    }

    pub fn print_html_with_end(&self, html: impl Into<String>, end: &str) {
        let mut html = html.into();
        html.push_str(end);
        self.append(LogEntry::Html(html));
    }

    /// Append reStructuredText rendered as HTML.
    ///
    /// Markup the converter rejects is logged as a warning and appended as
    /// plain text instead.
    pub fn print_rst(&self, source: &str) {
        match rst_to_html(source) {
            Ok(html) => self.print_html(html),
            Err(e) => {
                tracing::warn!(error = %e, "reStructuredText conversion failed; appending source as text");
                self.append(LogEntry::Text(format!("{source}\n")));
            }
        }
    }

    /// Append `table` rendered as an HTML table.
    pub fn print_table(&self, table: &Table, opts: &TableOptions) {
        self.print_html(table.to_html(opts));
    }

    /// Append a JSON value that has a table shape (see [`Table::from_json`]).
    pub fn print_table_json(&self, value: &Value, opts: &TableOptions) -> Result<(), RenderError> {
        let table = Table::from_json(value)?;
        self.print_table(&table, opts);
        Ok(())
    }

    /// Append a bitmap, colormapped and scaled for display.
    pub fn print_image(
        &self,
        data: impl Into<ImageData>,
        opts: &ImageOptions,
    ) -> Result<(), RenderError> {
        let pixels = prepare_image(data.into(), opts)?;
        self.append(LogEntry::Image(LogImage::new(pixels)));
        Ok(())
    }

    /// Rasterize `figure` with `style` and append it as an image.
    pub fn print_figure(&self, figure: &dyn Figure, style: &PlotStyle) -> Result<(), PlotError> {
        let pixels = figure.rasterize(style)?;
        self.print_image(pixels, &ImageOptions::default())?;
        Ok(())
    }

    // ── Stream mode ───────────────────────────────────────────────────

    /// When on, text written through the stream interface is appended as
    /// HTML (with a trailing line break) instead of plain text.
    pub fn set_print_as_html(&self, on: bool) {
        self.shared.print_as_html.store(on, Ordering::Relaxed);
    }

    pub fn print_as_html(&self) -> bool {
        self.shared.print_as_html.load(Ordering::Relaxed)
    }

    /// Stream-style write: each call becomes exactly one entry.
    pub fn write_str(&self, chunk: &str) {
        if self.print_as_html() {
            self.print_html(chunk);
        } else {
            self.append(LogEntry::Text(chunk.to_string()));
        }
    }

    // ── Log records ───────────────────────────────────────────────────

    pub fn set_formatter(&self, formatter: Formatter) {
        *self.shared.formatter.write().unwrap_or_else(|e| e.into_inner()) = formatter;
    }

    pub fn formatter(&self) -> Formatter {
        self.shared
            .formatter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Minimum level of records accepted when attached as a log handler.
    pub fn set_level(&self, level: LogLevel) {
        *self.shared.level.write().unwrap_or_else(|e| e.into_inner()) = level;
    }

    // ── Capture ───────────────────────────────────────────────────────

    /// Route `console` output into this log until the guard drops.
    pub fn capture_stdout(&self, console: &Arc<Console>) -> RedirectGuard {
        console.redirect(self.clone())
    }

    /// Receive records from `logger` (`None` = root) until the guard drops.
    pub fn attach(&self, router: &LogRouter, logger: Option<&str>) -> AttachGuard {
        router.attach(logger, Arc::new(self.clone()))
    }

    /// Become the active plotting target until the guard drops.
    pub fn capture_plots(
        &self,
        plotter: &Arc<Plotter>,
        style: PlotStyle,
    ) -> Result<PlotCaptureGuard, PlotError> {
        plotter.capture(self.clone(), style)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("connected", &self.is_connected())
            .field("print_as_html", &self.print_as_html())
            .finish_non_exhaustive()
    }
}

/// Length of an incomplete UTF-8 sequence at the end of `bytes`.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

impl io::Write for Logger {
    /// Each call becomes one entry. A character split across calls is held
    /// back until its remaining bytes arrive.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);
        let complete = self.partial.len() - incomplete_utf8_tail(&self.partial);
        if complete > 0 {
            let bytes: Vec<u8> = self.partial.drain(..complete).collect();
            self.write_str(&String::from_utf8_lossy(&bytes));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogHandler for Logger {
    fn emit(&self, record: &LogRecord) {
        let line = self.formatter().format(record);
        self.append(LogEntry::Text(format!("{line}\n")));
    }

    fn level(&self) -> LogLevel {
        *self.shared.level.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::LogView;
    use std::io::Write;

    #[test]
    fn text_and_joined_text() {
        let (mut view, logger) = LogView::new(10);
        logger.print(1);
        logger.print_joined(["a", "b"], "-", "!\n");
        view.process_pending();
        assert_eq!(view.value(), "1\na-b!\n");
    }

    #[test]
    fn stream_writes_follow_html_mode() {
        let (mut view, mut logger) = LogView::new(10);
        write!(logger, "x").unwrap();
        logger.set_print_as_html(true);
        logger.write_str("<b>0</b>");
        logger.write_str("\n");
        view.process_pending();
        assert_eq!(view.sink().len(), 3);
        assert_eq!(view.value(), "x0\n\n");
        assert!(matches!(view.sink().get(1), Some(LogEntry::Html(h)) if h == "<b>0</b><br></br>"));
    }

    #[test]
    fn html_mode_is_shared_between_clones() {
        let (_view, logger) = LogView::new(10);
        let other = logger.clone();
        other.set_print_as_html(true);
        assert!(logger.print_as_html());
    }

    #[test]
    fn rst_failure_falls_back_to_text() {
        let (mut view, logger) = LogView::new(10);
        logger.print_rst("**open");
        logger.print_rst("*fine*");
        view.process_pending();
        assert!(matches!(view.sink().get(0), Some(LogEntry::Text(t)) if t == "**open\n"));
        assert!(matches!(view.sink().get(1), Some(LogEntry::Html(h)) if h.contains("<em>fine</em>")));
    }

    #[test]
    fn rst_failure_warns_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let (mut view, logger) = LogView::new(10);
        let (mut diagnostics, diag_logger) = LogView::new(10);
        diag_logger.set_formatter(Formatter::pattern("{level}|{message}"));

        let router = LogRouter::new();
        let subscriber = tracing_subscriber::registry().with(router.layer());
        tracing::subscriber::with_default(subscriber, || {
            let _guard = diag_logger.attach(&router, None);
            logger.print_rst("**open");
            logger.print_rst("*fine*");
        });

        view.process_pending();
        diagnostics.process_pending();
        let records = diagnostics.value();
        let lines: Vec<&str> = records.lines().collect();
        assert_eq!(lines.len(), 1, "{records}");
        assert!(lines[0].starts_with("WARNING|reStructuredText conversion failed"));
        assert_eq!(view.sink().len(), 2);
    }

    #[test]
    fn multibyte_characters_split_across_writes() {
        let (mut view, mut logger) = LogView::new(10);
        let bytes = "é€".as_bytes();
        logger.write_all(&bytes[..1]).unwrap();
        logger.write_all(&bytes[1..3]).unwrap();
        logger.write_all(&bytes[3..]).unwrap();
        view.process_pending();
        assert_eq!(view.value(), "é€");
        assert!(!view.value().contains('\u{fffd}'));
    }

    #[test]
    fn table_json_errors_append_nothing() {
        let (mut view, logger) = LogView::new(10);
        assert!(logger.print_table_json(&serde_json::json!(1), &TableOptions::default()).is_err());
        logger
            .print_table_json(&serde_json::json!({"a": [1]}), &TableOptions::default())
            .unwrap();
        view.process_pending();
        assert_eq!(view.value(), "\ta\n0\t1\n");
    }

    #[test]
    fn handler_formats_records() {
        let (mut view, logger) = LogView::new(10);
        logger.set_formatter(Formatter::pattern("{level}|| {message}"));
        logger.emit(&LogRecord::new(LogLevel::Warn, "app", "0"));
        view.process_pending();
        assert_eq!(view.value(), "WARNING|| 0\n");
    }

    #[test]
    fn images_are_scaled() {
        let (mut view, logger) = LogView::new(10);
        let pixels = image::RgbaImage::new(30, 10);
        logger.print_image(pixels, &ImageOptions::default()).unwrap();
        view.process_pending();
        let image = view.image(0).unwrap();
        assert_eq!((image.width(), image.height()), (360, 120));
    }
}
