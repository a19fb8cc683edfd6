//! Error types for the panel, its render adapters, and its capture contexts.

use std::path::PathBuf;

/// Failure while turning caller data into a displayable entry.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A pixel buffer's length does not match its declared dimensions.
    #[error("pixel buffer has {actual} values, expected {expected} ({width}x{height})")]
    Shape {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    /// Zero-sized images cannot be scaled or displayed.
    #[error("image has no pixels")]
    EmptyImage,
    /// Decoding an image file failed.
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The value handed to the table renderer is not table-shaped.
    #[error("not a table: {0}")]
    Table(String),
}

/// Failure in the reStructuredText converter. Never surfaced to callers of
/// [`Logger::print_rst`](crate::Logger::print_rst); it only feeds the warning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RstError {
    #[error("line {line}: inline {markup} start-string without end-string")]
    UnterminatedInline { markup: &'static str, line: usize },
    #[error("line {line}: malformed hyperlink reference")]
    MalformedLink { line: usize },
}

/// Failure in plot capture.
#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    /// `show` fired on the inline backend while no sink is the active target.
    #[error("no active plotting target; enter plot capture before calling show")]
    NoActiveTarget,
    /// Another sink already holds the active plotting target slot.
    #[error("another sink is already the active plotting target")]
    TargetBusy,
    /// A figure could not be rasterized.
    #[error("failed to rasterize figure: {0}")]
    Rasterize(String),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failure in the copy/save image actions.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no image entry at index {0}")]
    NoSuchImage(usize),
    #[error("system clipboard failed: {0}")]
    Clipboard(String),
    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Failure while toggling a capture mode on a [`LogPanel`](crate::LogPanel).
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// The panel was built without a plotting capability.
    #[error("plotting is unavailable: the panel was built without a plotter")]
    PlottingUnavailable,
    #[error(transparent)]
    Plot(#[from] PlotError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
