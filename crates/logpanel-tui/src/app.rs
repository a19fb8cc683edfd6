//! TUI-local state (not shared with producers).

use logpanel::LogView;

/// Input mode for the TUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InputMode {
    /// Normal mode: arrow keys scroll, letters drive the toggles.
    Normal,
    /// Editing the destination of "save image as"; Enter saves, Esc cancels.
    SavePath,
}

pub(crate) struct App {
    pub(crate) input_mode: InputMode,
    pub(crate) input_buffer: String,
    /// Offset from the bottom of the log (0 = follow tail).
    pub(crate) log_scroll: usize,
    /// Id of the highlighted image entry. Survives eviction of older entries.
    pub(crate) selected_image: Option<u64>,
    /// Status messages shown at the bottom until the next action.
    pub(crate) status_message: Option<String>,
    pub(crate) should_quit: bool,
}

impl App {
    pub(crate) fn new() -> Self {
        Self {
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            log_scroll: 0,
            selected_image: None,
            status_message: None,
            should_quit: false,
        }
    }

    /// Entry index of the selected image, if it is still held.
    pub(crate) fn selected_index(&self, view: &LogView) -> Option<usize> {
        let id = self.selected_image?;
        view.image_indices()
            .into_iter()
            .find(|&i| view.image(i).is_some_and(|img| img.id() == id))
    }

    /// Move the image selection by `step` images; wraps at either end.
    pub(crate) fn step_image(&mut self, view: &LogView, step: isize) {
        let images = view.image_indices();
        if images.is_empty() {
            self.selected_image = None;
            self.status_message = Some("No images in the log.".into());
            return;
        }
        let len = images.len() as isize;
        let next = match self
            .selected_index(view)
            .and_then(|idx| images.iter().position(|&i| i == idx))
        {
            Some(pos) => (pos as isize + step).rem_euclid(len),
            // Nothing selected yet: start from the newest image.
            None => len - 1,
        };
        let index = images[next as usize];
        self.selected_image = view.image(index).map(|img| img.id());
        if let Some(img) = view.image(index) {
            self.status_message = Some(format!(
                "Image {}/{} selected ({}x{}). [c] copy  [s] save",
                next + 1,
                len,
                img.width(),
                img.height()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logpanel::{LogEntry, LogImage};

    fn view_with_images() -> LogView {
        let (mut view, logger) = LogView::new(10);
        logger.print("a");
        logger.append(LogEntry::Image(LogImage::new(image::RgbaImage::new(2, 2))));
        logger.print("b");
        logger.append(LogEntry::Image(LogImage::new(image::RgbaImage::new(3, 3))));
        view.process_pending();
        view
    }

    #[test]
    fn app_defaults() {
        let app = App::new();
        assert!(!app.should_quit);
        assert!(app.status_message.is_none());
        assert_eq!(app.log_scroll, 0);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn image_selection_starts_at_newest_and_wraps() {
        let view = view_with_images();
        let mut app = App::new();
        app.step_image(&view, -1);
        assert_eq!(app.selected_index(&view), Some(3));
        app.step_image(&view, -1);
        assert_eq!(app.selected_index(&view), Some(1));
        app.step_image(&view, -1);
        assert_eq!(app.selected_index(&view), Some(3));
        app.step_image(&view, 1);
        assert_eq!(app.selected_index(&view), Some(1));
    }

    #[test]
    fn no_images_clears_selection() {
        let (view, _logger) = LogView::new(10);
        let mut app = App::new();
        app.selected_image = Some(7);
        app.step_image(&view, 1);
        assert_eq!(app.selected_image, None);
        assert!(app.status_message.is_some());
    }
}
