//! Embeddable log panel: a bounded, scrollable output surface fed from
//! direct calls, redirected console output, captured tracing events and
//! captured plot `show` calls.
//!
//! The core is a bounded append/eviction buffer with multi-source routing.
//! Producers on any thread hold a cloneable [`Logger`]; the UI thread owns
//! the [`LogView`] and applies queued entries once per frame. When the
//! history limit is exceeded the single oldest entry is evicted.
//!
//! # Getting started
//!
//! ```ignore
//! use logpanel::prelude::*;
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! let console = Console::stdout();
//! let router = LogRouter::new();
//! tracing_subscriber::registry().with(router.layer()).init();
//!
//! let contexts = CaptureContexts::new(console.clone(), router).with_plotter(Plotter::new());
//! let mut panel = LogPanel::new(&PanelConfig::default().with_printing(true), contexts)?;
//!
//! console.println("captured")?;        // redirected into the panel
//! tracing::info!("also captured?");    // only once Logging is toggled on
//! panel.toggle_logging();
//!
//! let logger = panel.logger().clone(); // hand to any thread
//! std::thread::spawn(move || logger.print_rst("**bold** from a worker"));
//!
//! panel.process_pending();             // on the UI thread, once per frame
//! println!("{}", panel.value());
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`sink`] | [`Sink`]: bounded entry buffer with FIFO eviction |
//! | [`view`] | [`LogView`]: UI-thread owner of the sink, drains the producer queue |
//! | [`logger`] | [`Logger`]: producer handle, `io::Write` and [`LogHandler`](capture::LogHandler) |
//! | [`capture`] | [`Console`](capture::Console), [`LogRouter`](capture::LogRouter), [`Plotter`](capture::Plotter) and their guards |
//! | [`render`] | text, reStructuredText, table and image adapters |
//! | [`export`] | copy image / save image as |
//! | [`panel`] | [`LogPanel`]: everything above behind four toggles |
//!
//! # Design principles
//!
//! 1. **Explicit contexts.** The console, the tracing router and the plotter
//!    are objects passed in at construction, never globals. Every capture is
//!    a guard that undoes exactly what it did when dropped.
//!
//! 2. **One writer.** Only the UI thread mutates the entry buffer. Everything
//!    else enqueues and returns immediately, and arrival order is display
//!    order.
//!
//! 3. **Rendering never fails the caller.** Markup that cannot be converted
//!    is shown as plain text and reported on the `tracing` channel.

pub mod capture;
pub mod config;
pub mod entry;
pub mod error;
pub mod export;
pub mod html;
pub mod logger;
pub mod panel;
pub mod prelude;
pub mod render;
pub mod sink;
pub mod view;

pub use config::PanelConfig;
pub use entry::{LogEntry, LogImage};
pub use error::{ExportError, PanelError, PlotError, RenderError, RstError};
pub use logger::Logger;
pub use panel::{CaptureContexts, CaptureState, LogPanel};
pub use sink::{DEFAULT_MAX_HISTORY, Sink};
pub use view::LogView;
