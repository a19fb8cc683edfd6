//! Tracing capture: a subscriber layer that routes events to handlers
//! attached on named loggers.
//!
//! The [`RouterLayer`] is installed once; attaching and detaching handlers
//! afterwards only touches the router's handler list, so a panel can start
//! and stop receiving records without rebuilding the subscriber.
//!
//! ```ignore
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! let router = LogRouter::new();
//! tracing_subscriber::registry().with(router.layer()).init();
//!
//! let guard = router.attach(Some("my_app"), Arc::new(logger.clone()));
//! tracing::warn!(target: "my_app::worker", "disk almost full");
//! drop(guard); // detached
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::registry::LookupSpan;

/// Log severity level (mirrors tracing levels), ordered by severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Full level name as used in formatted records.
    pub fn name(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

/// One captured logging event.
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub time: DateTime<Local>,
    pub level: LogLevel,
    /// The logger name (tracing target).
    pub target: String,
    /// The message, with any extra fields appended as `{k=v, ...}`.
    pub message: String,
    /// Extra fields, in recording order.
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            time: Local::now(),
            level,
            target: target.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }
}

/// Something that receives log records.
pub trait LogHandler: Send + Sync {
    fn emit(&self, record: &LogRecord);

    fn flush(&self) {}

    fn close(&self) {}

    /// Records below this level are not delivered.
    fn level(&self) -> LogLevel {
        LogLevel::Trace
    }
}

// ── Formatter ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Piece {
    Literal(String),
    Level,
    Message,
    Target,
    Time,
}

#[derive(Clone)]
enum FormatterKind {
    Pattern(Vec<Piece>),
    Custom(Arc<dyn Fn(&LogRecord) -> String + Send + Sync>),
}

/// Turns a [`LogRecord`] into the line shown in the panel.
#[derive(Clone)]
pub struct Formatter(FormatterKind);

impl Formatter {
    /// A pattern with `{level}`, `{message}`, `{target}` and `{time}`
    /// placeholders. `{{` and `}}` are literal braces; unknown
    /// placeholders are kept verbatim.
    pub fn pattern(pattern: &str) -> Self {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(open) = rest.find(['{', '}']) {
            let (head, tail) = rest.split_at(open);
            literal.push_str(head);
            if let Some(after) = tail.strip_prefix("{{") {
                literal.push('{');
                rest = after;
                continue;
            }
            if let Some(after) = tail.strip_prefix("}}") {
                literal.push('}');
                rest = after;
                continue;
            }
            let placeholder = tail.find('}').and_then(|close| {
                let piece = match tail.get(1..close)? {
                    "level" => Piece::Level,
                    "message" => Piece::Message,
                    "target" => Piece::Target,
                    "time" => Piece::Time,
                    _ => return None,
                };
                Some((piece, close))
            });
            match placeholder {
                Some((piece, close)) => {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(piece);
                    rest = tail.get(close + 1..).unwrap_or_default();
                }
                None => {
                    literal.push_str(tail.get(..1).unwrap_or_default());
                    rest = tail.get(1..).unwrap_or_default();
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Self(FormatterKind::Pattern(pieces))
    }

    pub fn custom(f: impl Fn(&LogRecord) -> String + Send + Sync + 'static) -> Self {
        Self(FormatterKind::Custom(Arc::new(f)))
    }

    pub fn format(&self, record: &LogRecord) -> String {
        match &self.0 {
            FormatterKind::Custom(f) => f(record),
            FormatterKind::Pattern(pieces) => {
                let mut out = String::new();
                for piece in pieces {
                    match piece {
                        Piece::Literal(s) => out.push_str(s),
                        Piece::Level => out.push_str(record.level.name()),
                        Piece::Message => out.push_str(&record.message),
                        Piece::Target => out.push_str(&record.target),
                        Piece::Time => out.push_str(
                            &record.time.format("%Y-%m-%d %H:%M:%S").to_string(),
                        ),
                    }
                }
                out
            }
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::pattern("{message}")
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            FormatterKind::Pattern(pieces) => f.debug_tuple("Pattern").field(pieces).finish(),
            FormatterKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

/// Identifies one attachment of a handler to a [`LogRouter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registered {
    id: HandlerId,
    logger: Option<String>,
    handler: Arc<dyn LogHandler>,
}

#[derive(Default)]
struct RouterInner {
    handlers: RwLock<Vec<Registered>>,
    next_id: AtomicU64,
}

/// The set of attached handlers, shared between the subscriber layer and
/// whoever attaches handlers.
#[derive(Clone, Default)]
pub struct LogRouter {
    inner: Arc<RouterInner>,
}

impl LogRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The subscriber layer that feeds this router. Install it once.
    pub fn layer(&self) -> RouterLayer {
        RouterLayer {
            router: self.clone(),
        }
    }

    /// Attach `handler` to the logger called `logger` (`None` is the root
    /// logger, which sees every target). Detached when the guard drops.
    pub fn attach(&self, logger: Option<&str>, handler: Arc<dyn LogHandler>) -> AttachGuard {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let logger = logger.filter(|name| !name.is_empty()).map(str::to_string);
        tracing::debug!(?id, logger = logger.as_deref().unwrap_or("root"), "attaching log handler");
        self.inner
            .handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Registered {
                id,
                logger,
                handler,
            });
        AttachGuard {
            router: self.clone(),
            id,
        }
    }

    fn detach(&self, id: HandlerId) {
        let mut handlers = self.inner.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.retain(|r| r.id != id);
    }

    pub fn is_attached(&self, id: HandlerId) -> bool {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|r| r.id == id)
    }

    pub fn handler_count(&self) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Deliver `record` to every handler whose logger covers its target.
    ///
    /// Matching handlers are collected first and called without the lock
    /// held, so a handler may itself log or attach handlers.
    pub fn dispatch(&self, record: &LogRecord) {
        let matching: Vec<Arc<dyn LogHandler>> = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| logger_covers(r.logger.as_deref(), &record.target))
            .filter(|r| record.level >= r.handler.level())
            .map(|r| Arc::clone(&r.handler))
            .collect();
        for handler in matching {
            handler.emit(record);
        }
    }
}

/// Drop to detach the handler.
#[must_use = "the handler is detached as soon as the guard is dropped"]
pub struct AttachGuard {
    router: LogRouter,
    id: HandlerId,
}

impl AttachGuard {
    pub fn id(&self) -> HandlerId {
        self.id
    }
}

impl Drop for AttachGuard {
    fn drop(&mut self) {
        self.router.detach(self.id);
        tracing::debug!(id = ?self.id, "log handler detached");
    }
}

/// Hierarchical logger names: `app` covers `app`, `app::net` and `app.net`.
fn logger_covers(logger: Option<&str>, target: &str) -> bool {
    match logger {
        None => true,
        Some(name) => target
            .strip_prefix(name)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::") || rest.starts_with('.')),
    }
}

// ── Layer ─────────────────────────────────────────────────────────────

/// A [`tracing_subscriber::Layer`] that turns events into [`LogRecord`]s
/// and hands them to its [`LogRouter`].
pub struct RouterLayer {
    router: LogRouter,
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for RouterLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if self.router.handler_count() == 0 {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut message = visitor.message;
        if !visitor.fields.is_empty() {
            let extras: Vec<String> = visitor
                .fields
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            if message.is_empty() {
                message = extras.join(" ");
            } else {
                message = format!("{message} {{{}}}", extras.join(", "));
            }
        }

        let metadata = event.metadata();
        let record = LogRecord {
            time: Local::now(),
            level: LogLevel::from(*metadata.level()),
            target: metadata.target().to_string(),
            message,
            fields: visitor.fields,
        };
        self.router.dispatch(&record);
    }
}

/// Visitor that extracts the message and extra fields from a tracing event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Default)]
    struct Collect {
        lines: Mutex<Vec<String>>,
        min: Option<LogLevel>,
    }

    impl LogHandler for Collect {
        fn emit(&self, record: &LogRecord) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{}|{}|{}", record.level.name(), record.target, record.message));
        }

        fn level(&self) -> LogLevel {
            self.min.unwrap_or(LogLevel::Trace)
        }
    }

    fn lines(c: &Collect) -> Vec<String> {
        c.lines.lock().unwrap().clone()
    }

    #[test]
    fn log_level_names_and_order() {
        assert_eq!(LogLevel::Info.name(), "INFO");
        assert_eq!(LogLevel::Warn.name(), "WARNING");
        assert!(LogLevel::Warn > LogLevel::Info);
    }

    #[test]
    fn pattern_formatter() {
        let record = LogRecord::new(LogLevel::Warn, "app", "0");
        assert_eq!(Formatter::pattern("{level}|| {message}").format(&record), "WARNING|| 0");
        assert_eq!(Formatter::default().format(&record), "0");
        assert_eq!(
            Formatter::pattern("[{target}] {{x}} {nope} {message").format(&record),
            "[app] {x} {nope} {message"
        );
    }

    #[test]
    fn placeholders_in_messages_are_not_expanded() {
        let record = LogRecord::new(LogLevel::Info, "app", "{level}");
        assert_eq!(Formatter::pattern("{message}").format(&record), "{level}");
    }

    #[test]
    fn custom_formatter() {
        let f = Formatter::custom(|r| r.message.to_uppercase());
        assert_eq!(f.format(&LogRecord::new(LogLevel::Info, "", "abc")), "ABC");
    }

    #[test]
    fn logger_names_are_hierarchical() {
        assert!(logger_covers(None, "anything"));
        assert!(logger_covers(Some("app"), "app"));
        assert!(logger_covers(Some("app"), "app::net"));
        assert!(logger_covers(Some("app"), "app.net"));
        assert!(!logger_covers(Some("app"), "apple"));
        assert!(!logger_covers(Some("app::net"), "app"));
    }

    #[test]
    fn attach_and_detach_with_guard() {
        let router = LogRouter::new();
        let handler = Arc::new(Collect::default());
        let subscriber = tracing_subscriber::registry().with(router.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("before");
            let guard = router.attach(None, handler.clone());
            assert!(router.is_attached(guard.id()));
            tracing::warn!("during");
            let id = guard.id();
            drop(guard);
            assert!(!router.is_attached(id));
            tracing::warn!("after");
        });

        assert_eq!(lines(&handler).len(), 1);
        assert!(lines(&handler)[0].ends_with("|during"));
        assert_eq!(router.handler_count(), 0);
    }

    #[test]
    fn named_logger_and_level_filtering() {
        let router = LogRouter::new();
        let net = Arc::new(Collect::default());
        let errors = Arc::new(Collect {
            min: Some(LogLevel::Error),
            ..Default::default()
        });
        let subscriber = tracing_subscriber::registry().with(router.layer());

        tracing::subscriber::with_default(subscriber, || {
            let _net = router.attach(Some("app::net"), net.clone());
            let _errors = router.attach(None, errors.clone());
            tracing::info!(target: "app::net", "connected");
            tracing::info!(target: "app::db", "ready");
            tracing::error!(target: "app::db", "gone");
        });

        assert_eq!(lines(&net), vec!["INFO|app::net|connected"]);
        assert_eq!(lines(&errors), vec!["ERROR|app::db|gone"]);
    }

    #[test]
    fn extra_fields_are_appended_to_the_message() {
        let router = LogRouter::new();
        let handler = Arc::new(Collect::default());
        let subscriber = tracing_subscriber::registry().with(router.layer());

        tracing::subscriber::with_default(subscriber, || {
            let _g = router.attach(Some("t"), handler.clone());
            tracing::info!(target: "t", count = 3, "loaded");
            tracing::info!(target: "t", name = "x");
        });

        assert_eq!(lines(&handler), vec!["INFO|t|loaded {count=3}", "INFO|t|name=x"]);
    }
}
