//! Capture contexts: process-wide output sources a log can temporarily
//! claim. Each claim returns a guard that releases it on drop.

pub mod logging;
pub mod plot;
pub mod stdout;

pub use logging::{
    AttachGuard, Formatter, HandlerId, LogHandler, LogLevel, LogRecord, LogRouter, RouterLayer,
};
pub use plot::{
    Figure, HeadlessBackend, InlineBackend, LineFigure, PlotBackend, PlotCaptureGuard, PlotStyle,
    Plotter, RasterFigure, ShowContext,
};
pub use stdout::{Console, ConsoleWriter, RedirectGuard, StreamId};
