//! The panel: a log view, its producer handle, and one capture toggle per
//! checkbox of the control strip.

use std::path::PathBuf;
use std::sync::Arc;

use crate::capture::{
    AttachGuard, Console, LogRouter, PlotCaptureGuard, PlotStyle, Plotter, RedirectGuard,
};
use crate::config::PanelConfig;
use crate::error::{ExportError, PanelError};
use crate::export::{ImageExporter, SavePrompt};
use crate::logger::Logger;
use crate::view::LogView;

/// The shared contexts a panel can capture from.
#[derive(Clone)]
pub struct CaptureContexts {
    pub console: Arc<Console>,
    pub router: LogRouter,
    /// `None` when plotting is not available in this process.
    pub plotter: Option<Arc<Plotter>>,
}

impl CaptureContexts {
    pub fn new(console: Arc<Console>, router: LogRouter) -> Self {
        Self {
            console,
            router,
            plotter: None,
        }
    }

    pub fn with_plotter(mut self, plotter: Arc<Plotter>) -> Self {
        self.plotter = Some(plotter);
        self
    }
}

/// State of the four toggles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureState {
    pub printing: bool,
    pub html: bool,
    pub logging: bool,
    pub plotting: bool,
}

pub struct LogPanel {
    view: LogView,
    logger: Logger,
    contexts: CaptureContexts,
    logger_name: Option<String>,
    plot_style: PlotStyle,
    redirect: Option<RedirectGuard>,
    attachment: Option<AttachGuard>,
    plot_capture: Option<PlotCaptureGuard>,
    exporter: ImageExporter,
}

impl LogPanel {
    /// Build a panel and apply the initial toggle states from `config`.
    pub fn new(config: &PanelConfig, contexts: CaptureContexts) -> Result<Self, PanelError> {
        let (view, logger) = LogView::new(config.max_history);
        logger.set_formatter(config.build_formatter());
        logger.set_level(config.log_level);

        let mut panel = Self {
            view,
            logger,
            contexts,
            logger_name: config.logger_name.clone(),
            plot_style: config.build_plot_style(),
            redirect: None,
            attachment: None,
            plot_capture: None,
            exporter: ImageExporter::default(),
        };
        panel.set_html(config.html);
        panel.set_printing(config.printing);
        panel.set_logging(config.logging);
        panel.set_plotting(config.plotting)?;
        Ok(panel)
    }

    /// Replace the exporter, e.g. with one backed by a different clipboard.
    pub fn with_exporter(mut self, exporter: ImageExporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// A producer handle for this panel's log.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn contexts(&self) -> &CaptureContexts {
        &self.contexts
    }

    pub fn view(&self) -> &LogView {
        &self.view
    }

    pub fn exporter(&self) -> &ImageExporter {
        &self.exporter
    }

    pub fn state(&self) -> CaptureState {
        CaptureState {
            printing: self.redirect.is_some(),
            html: self.logger.print_as_html(),
            logging: self.attachment.is_some(),
            plotting: self.plot_capture.is_some(),
        }
    }

    // ── Toggles ───────────────────────────────────────────────────────

    pub fn set_printing(&mut self, on: bool) {
        if on == self.redirect.is_some() {
            return;
        }
        self.redirect = on.then(|| self.logger.capture_stdout(&self.contexts.console));
        tracing::debug!(on, "printing toggled");
    }

    pub fn set_html(&mut self, on: bool) {
        self.logger.set_print_as_html(on);
        tracing::debug!(on, "html toggled");
    }

    pub fn set_logging(&mut self, on: bool) {
        if on == self.attachment.is_some() {
            return;
        }
        // Not logged here: the router logs attach and detach outside the
        // window in which the handler is registered.
        self.attachment = on.then(|| {
            self.logger
                .attach(&self.contexts.router, self.logger_name.as_deref())
        });
    }

    /// Fails when the panel has no plotter or another sink is already the
    /// plotting target; the toggle stays off in that case.
    pub fn set_plotting(&mut self, on: bool) -> Result<(), PanelError> {
        if on == self.plot_capture.is_some() {
            return Ok(());
        }
        if on {
            let plotter = self
                .contexts
                .plotter
                .as_ref()
                .ok_or(PanelError::PlottingUnavailable)?;
            self.plot_capture = Some(self.logger.capture_plots(plotter, self.plot_style.clone())?);
        } else {
            self.plot_capture = None;
        }
        tracing::debug!(on, "plotting toggled");
        Ok(())
    }

    pub fn toggle_printing(&mut self) {
        let on = self.redirect.is_none();
        self.set_printing(on);
    }

    pub fn toggle_html(&mut self) {
        let on = !self.logger.print_as_html();
        self.set_html(on);
    }

    pub fn toggle_logging(&mut self) {
        let on = self.attachment.is_none();
        self.set_logging(on);
    }

    pub fn toggle_plotting(&mut self) -> Result<(), PanelError> {
        let on = self.plot_capture.is_none();
        self.set_plotting(on)
    }

    // ── Log surface ───────────────────────────────────────────────────

    /// Apply queued appends. Call once per frame on the UI thread.
    pub fn process_pending(&mut self) -> usize {
        self.view.process_pending()
    }

    /// Remove every entry, including ones still queued.
    pub fn clear(&mut self) {
        self.view.process_pending();
        self.view.clear();
    }

    /// Plain-text snapshot after applying queued appends.
    pub fn value(&mut self) -> String {
        self.view.process_pending();
        self.view.value()
    }

    // ── Image actions ─────────────────────────────────────────────────

    /// Copy the image entry at `index` to the clipboard.
    pub fn copy_image(&mut self, index: usize) -> Result<(), PanelError> {
        let image = self
            .view
            .image(index)
            .ok_or(ExportError::NoSuchImage(index))?;
        self.exporter.copy_image(image)?;
        Ok(())
    }

    /// Save the image entry at `index` to a path chosen by `prompt`.
    pub fn save_image_as(
        &mut self,
        index: usize,
        prompt: &mut dyn SavePrompt,
    ) -> Result<Option<PathBuf>, PanelError> {
        let image = self
            .view
            .image(index)
            .ok_or(ExportError::NoSuchImage(index))?;
        Ok(self.exporter.save_image_as(image, prompt)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn contexts() -> CaptureContexts {
        CaptureContexts::new(Console::with_target(io::sink()), LogRouter::new())
    }

    #[test]
    fn toggles_are_independent() {
        let mut panel = LogPanel::new(&PanelConfig::default(), contexts()).unwrap();
        assert_eq!(panel.state(), CaptureState::default());

        panel.toggle_printing();
        panel.toggle_logging();
        assert_eq!(
            panel.state(),
            CaptureState {
                printing: true,
                logging: true,
                ..Default::default()
            }
        );
        panel.toggle_printing();
        assert!(panel.state().logging);
        assert!(!panel.state().printing);
    }

    #[test]
    fn plotting_without_plotter_is_unavailable() {
        let mut panel = LogPanel::new(&PanelConfig::default(), contexts()).unwrap();
        assert!(matches!(
            panel.set_plotting(true),
            Err(PanelError::PlottingUnavailable)
        ));
        assert!(!panel.state().plotting);

        let config = PanelConfig::default().with_plotting(true);
        assert!(LogPanel::new(&config, contexts()).is_err());
    }

    #[test]
    fn initial_toggles_come_from_config() {
        let config = PanelConfig::default().with_printing(true).with_html(true);
        let panel = LogPanel::new(&config, contexts()).unwrap();
        assert!(panel.state().printing && panel.state().html);
    }

    #[test]
    fn clear_drops_queued_entries() {
        let mut panel = LogPanel::new(&PanelConfig::default(), contexts()).unwrap();
        panel.logger().print("a");
        panel.clear();
        assert_eq!(panel.value(), "");
    }

    #[test]
    fn image_actions_need_an_image_entry() {
        let mut panel = LogPanel::new(&PanelConfig::default(), contexts()).unwrap();
        panel.logger().print("text");
        assert!(matches!(
            panel.copy_image(0),
            Err(PanelError::Export(ExportError::NoSuchImage(0)))
        ));
        let mut prompt: Option<PathBuf> = None;
        assert!(panel.save_image_as(5, &mut prompt).is_err());
    }
}
