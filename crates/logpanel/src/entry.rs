//! Log entries: the unit of content held by the sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

use crate::html::html_to_plain;

/// Placeholder the plain-text snapshot uses for an inline image.
pub const OBJECT_REPLACEMENT: char = '\u{fffc}';

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// An RGBA bitmap shown inline in the log.
///
/// Cheap to clone: the pixel buffer is shared. Each image carries a
/// process-unique id so export actions can refer to it.
#[derive(Clone, Debug)]
pub struct LogImage {
    id: u64,
    pixels: Arc<RgbaImage>,
}

impl LogImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            pixels: Arc::new(pixels),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl PartialEq for LogImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A single entry in the log.
///
/// Entries are rendered in order. Eviction counts entries, so one image
/// weighs the same as one line of text.
#[derive(Clone, Debug, PartialEq)]
pub enum LogEntry {
    /// Plain text, shown verbatim.
    Text(String),
    /// An HTML fragment.
    Html(String),
    /// An inline bitmap.
    Image(LogImage),
}

impl LogEntry {
    /// The entry's contribution to the plain-text snapshot.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Html(html) => html_to_plain(html),
            Self::Image(_) => format!("{OBJECT_REPLACEMENT}\n\n"),
        }
    }

    pub fn as_image(&self) -> Option<&LogImage> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }
}
