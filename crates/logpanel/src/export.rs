//! Export actions for image entries: copy to the clipboard and save to a
//! file chosen through a save prompt.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::entry::LogImage;
use crate::error::ExportError;

/// Parameters of a "save as" prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveRequest {
    pub title: String,
    /// Directory the prompt starts in; the last one used, if any.
    pub directory: Option<PathBuf>,
    /// Extension added when the chosen name has none.
    pub default_suffix: String,
    pub name_filter: String,
}

/// Asks the user for a destination path. `None` means cancelled.
pub trait SavePrompt {
    fn ask(&mut self, request: &SaveRequest) -> Option<PathBuf>;
}

/// A prompt answered up front, e.g. from a text input.
impl SavePrompt for Option<PathBuf> {
    fn ask(&mut self, _request: &SaveRequest) -> Option<PathBuf> {
        self.take()
    }
}

/// Destination for "copy image".
pub trait ImageClipboard: Send {
    fn set_image(&mut self, image: &LogImage) -> Result<(), ExportError>;
}

/// The system clipboard, via `arboard`.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ImageClipboard for SystemClipboard {
    fn set_image(&mut self, image: &LogImage) -> Result<(), ExportError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ExportError::Clipboard(e.to_string()))?;
        let pixels = image.pixels();
        clipboard
            .set_image(arboard::ImageData {
                width: pixels.width() as usize,
                height: pixels.height() as usize,
                bytes: Cow::Borrowed(pixels.as_raw()),
            })
            .map_err(|e| ExportError::Clipboard(e.to_string()))
    }
}

/// Runs the export actions and remembers the last save directory.
pub struct ImageExporter {
    clipboard: Box<dyn ImageClipboard>,
    last_dir: Option<PathBuf>,
}

impl Default for ImageExporter {
    fn default() -> Self {
        Self::new(SystemClipboard)
    }
}

impl ImageExporter {
    pub fn new(clipboard: impl ImageClipboard + 'static) -> Self {
        Self {
            clipboard: Box::new(clipboard),
            last_dir: std::env::current_dir().ok(),
        }
    }

    /// Directory the next save prompt starts in. This is the current
    /// directory until an image has been saved.
    pub fn last_dir(&self) -> Option<&Path> {
        self.last_dir.as_deref()
    }

    /// Put `image` on the clipboard at full resolution.
    pub fn copy_image(&mut self, image: &LogImage) -> Result<(), ExportError> {
        self.clipboard.set_image(image)?;
        tracing::debug!(id = image.id(), "image copied to clipboard");
        Ok(())
    }

    /// The request shown by [`save_image_as`](Self::save_image_as).
    pub fn save_request(&self) -> SaveRequest {
        SaveRequest {
            title: "Save Image".into(),
            directory: self.last_dir.clone(),
            default_suffix: "png".into(),
            name_filter: "PNG file (*.png)".into(),
        }
    }

    /// Prompt for a path and write `image` there. Returns the written path,
    /// or `None` when the prompt was cancelled.
    pub fn save_image_as(
        &mut self,
        image: &LogImage,
        prompt: &mut dyn SavePrompt,
    ) -> Result<Option<PathBuf>, ExportError> {
        let request = self.save_request();
        let Some(path) = prompt.ask(&request) else {
            return Ok(None);
        };
        self.save_to(image, path, &request.default_suffix).map(Some)
    }

    fn save_to(
        &mut self,
        image: &LogImage,
        mut path: PathBuf,
        default_suffix: &str,
    ) -> Result<PathBuf, ExportError> {
        if path.extension().is_none() {
            path.set_extension(default_suffix);
        }
        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
        let result = if is_jpeg {
            image::DynamicImage::ImageRgba8(image.pixels().clone())
                .to_rgb8()
                .save(&path)
        } else {
            image.pixels().save(&path)
        };
        result.map_err(|source| ExportError::Save {
            path: path.clone(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.last_dir = Some(parent.to_path_buf());
        }
        tracing::info!(path = %path.display(), "image saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    fn sample() -> LogImage {
        LogImage::new(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])))
    }

    #[derive(Clone, Default)]
    struct FakeClipboard(Arc<Mutex<Vec<(u32, u32)>>>);

    impl ImageClipboard for FakeClipboard {
        fn set_image(&mut self, image: &LogImage) -> Result<(), ExportError> {
            self.0.lock().unwrap().push((image.width(), image.height()));
            Ok(())
        }
    }

    struct Recording {
        answer: Option<PathBuf>,
        seen: Vec<SaveRequest>,
    }

    impl SavePrompt for Recording {
        fn ask(&mut self, request: &SaveRequest) -> Option<PathBuf> {
            self.seen.push(request.clone());
            self.answer.clone()
        }
    }

    #[test]
    fn copy_goes_to_clipboard() {
        let clipboard = FakeClipboard::default();
        let mut exporter = ImageExporter::new(clipboard.clone());
        exporter.copy_image(&sample()).unwrap();
        assert_eq!(*clipboard.0.lock().unwrap(), vec![(3, 2)]);
    }

    #[test]
    fn save_adds_png_suffix_and_remembers_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ImageExporter::new(FakeClipboard::default());
        let mut prompt = Recording {
            answer: Some(dir.path().join("plot")),
            seen: Vec::new(),
        };

        let saved = exporter.save_image_as(&sample(), &mut prompt).unwrap().unwrap();
        assert_eq!(saved, dir.path().join("plot.png"));
        let reloaded = image::open(&saved).unwrap().to_rgba8();
        assert_eq!(reloaded.dimensions(), (3, 2));
        assert_eq!(reloaded.get_pixel(0, 0).0, [1, 2, 3, 255]);

        assert_eq!(prompt.seen[0].title, "Save Image");
        assert_eq!(prompt.seen[0].directory, std::env::current_dir().ok());
        assert_eq!(exporter.last_dir(), Some(dir.path()));

        exporter.save_image_as(&sample(), &mut prompt).unwrap();
        assert_eq!(prompt.seen[1].directory.as_deref(), Some(dir.path()));
    }

    #[test]
    fn cancelled_prompt_writes_nothing() {
        let mut exporter = ImageExporter::new(FakeClipboard::default());
        let mut prompt: Option<PathBuf> = None;
        assert_eq!(exporter.save_image_as(&sample(), &mut prompt).unwrap(), None);
        assert_eq!(exporter.last_dir(), std::env::current_dir().ok().as_deref());
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ImageExporter::new(FakeClipboard::default());
        let mut prompt = Some(dir.path().join("missing").join("x.png"));
        assert!(matches!(
            exporter.save_image_as(&sample(), &mut prompt),
            Err(ExportError::Save { .. })
        ));
    }
}
