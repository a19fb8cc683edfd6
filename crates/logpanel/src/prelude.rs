//! Convenience re-exports for common `logpanel` types.
//!
//! Meant to be glob-imported by hosts embedding a panel:
//!
//! ```ignore
//! use logpanel::prelude::*;
//! ```
//!
//! Backend traits, figure implementations and the individual guards are
//! left out; import those from [`capture`](crate::capture) when needed.

// ── Panel ───────────────────────────────────────────────────────────
pub use crate::{
    CaptureContexts, CaptureState, LogEntry, LogImage, LogPanel, LogView, Logger, PanelConfig,
};

// ── Capture contexts ────────────────────────────────────────────────
pub use crate::capture::{Console, Formatter, LogLevel, LogRouter, PlotStyle, Plotter};

// ── Render adapters ─────────────────────────────────────────────────
pub use crate::render::{Cell, Colormap, ImageData, ImageOptions, Table, TableOptions};

// ── Export ──────────────────────────────────────────────────────────
pub use crate::export::{ImageExporter, SavePrompt, SaveRequest};

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::{ExportError, PanelError, PlotError, RenderError};
