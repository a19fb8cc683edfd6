//! Plot capture: figures shown while a log is the active plotting target
//! land in that log as images.
//!
//! A [`Plotter`] owns the open figures and a swappable [`PlotBackend`].
//! Normally the backend is [`HeadlessBackend`], which leaves figures open.
//! [`Plotter::capture`] swaps in [`InlineBackend`] and records the target
//! log; the returned guard shows anything still open, then restores the
//! previous backend and style.

use std::sync::{Arc, Mutex, MutexGuard};

use image::{Rgba, RgbaImage};

use crate::error::PlotError;
use crate::logger::Logger;

/// Colors applied to rasterized figures so they match the panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlotStyle {
    pub dark: bool,
    pub facecolor: [u8; 3],
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            dark: false,
            facecolor: [255, 255, 255],
        }
    }
}

impl PlotStyle {
    /// Style matching a panel with background `rgb`: dark when the channel
    /// sum is below half the maximum.
    pub fn for_background(rgb: [u8; 3]) -> Self {
        let sum: u32 = rgb.iter().map(|&c| u32::from(c)).sum();
        Self {
            dark: f64::from(sum) < 382.5,
            facecolor: rgb,
        }
    }

    /// `#rrggbb`
    pub fn facecolor_hex(&self) -> String {
        let [r, g, b] = self.facecolor;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Foreground color for axes and text.
    pub fn foreground(&self) -> [u8; 3] {
        if self.dark { [255, 255, 255] } else { [0, 0, 0] }
    }
}

/// Something that can be drawn to a bitmap.
pub trait Figure: Send {
    fn rasterize(&self, style: &PlotStyle) -> Result<RgbaImage, PlotError>;
}

/// A figure that is already a bitmap. Transparent pixels take the style's
/// face color.
pub struct RasterFigure {
    pixels: RgbaImage,
}

impl RasterFigure {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

impl Figure for RasterFigure {
    fn rasterize(&self, style: &PlotStyle) -> Result<RgbaImage, PlotError> {
        if self.pixels.width() == 0 || self.pixels.height() == 0 {
            return Err(PlotError::Rasterize("figure has no pixels".into()));
        }
        let [fr, fg, fb] = style.facecolor;
        let mut out = RgbaImage::from_pixel(self.pixels.width(), self.pixels.height(), Rgba([fr, fg, fb, 255]));
        for (dst, src) in out.pixels_mut().zip(self.pixels.pixels()) {
            let alpha = u32::from(src.0[3]);
            for c in 0..3 {
                let blended = (u32::from(src.0[c]) * alpha + u32::from(dst.0[c]) * (255 - alpha)) / 255;
                dst.0[c] = blended as u8;
            }
        }
        Ok(out)
    }
}

/// A line chart of `(x, y)` series, drawn with the style's colors.
pub struct LineFigure {
    width: u32,
    height: u32,
    series: Vec<Vec<(f64, f64)>>,
}

impl LineFigure {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            series: Vec::new(),
        }
    }

    pub fn with_series(mut self, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        self.series.push(points.into_iter().collect());
        self
    }
}

impl Figure for LineFigure {
    fn rasterize(&self, style: &PlotStyle) -> Result<RgbaImage, PlotError> {
        if self.width < 4 || self.height < 4 {
            return Err(PlotError::Rasterize(format!(
                "{}x{} is too small to draw",
                self.width, self.height
            )));
        }
        let [fr, fg, fb] = style.facecolor;
        let mut img = RgbaImage::from_pixel(self.width, self.height, Rgba([fr, fg, fb, 255]));
        let [ar, ag, ab] = style.foreground();
        let axis = Rgba([ar, ag, ab, 255]);

        let (w, h) = (self.width - 1, self.height - 1);
        for x in 0..=w {
            img.put_pixel(x, h, axis);
        }
        for y in 0..=h {
            img.put_pixel(0, y, axis);
        }

        let points = self.series.iter().flatten().filter(|(x, y)| x.is_finite() && y.is_finite());
        let Some((x_lo, x_hi, y_lo, y_hi)) = points.fold(None, |acc, &(x, y)| match acc {
            None => Some((x, x, y, y)),
            Some((a, b, c, d)) => Some((f64::min(a, x), f64::max(b, x), f64::min(c, y), f64::max(d, y))),
        }) else {
            return Ok(img);
        };
        let span = |lo: f64, hi: f64| if hi > lo { hi - lo } else { 1.0 };
        let to_px = |x: f64, y: f64| -> (f64, f64) {
            (
                1.0 + (x - x_lo) / span(x_lo, x_hi) * f64::from(w - 1),
                f64::from(h - 1) - (y - y_lo) / span(y_lo, y_hi) * f64::from(h - 1),
            )
        };

        const PALETTE: [[u8; 3]; 4] = [[31, 119, 180], [255, 127, 14], [44, 160, 44], [214, 39, 40]];
        for (i, series) in self.series.iter().enumerate() {
            let [r, g, b] = PALETTE[i % PALETTE.len()];
            let color = Rgba([r, g, b, 255]);
            let finite: Vec<(f64, f64)> = series
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| to_px(x, y))
                .collect();
            for pair in finite.windows(2) {
                let (x0, y0) = pair[0];
                let (x1, y1) = pair[1];
                let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as u32;
                for s in 0..=steps {
                    let t = f64::from(s) / f64::from(steps);
                    let px = (x0 + (x1 - x0) * t).round() as u32;
                    let py = (y0 + (y1 - y0) * t).round() as u32;
                    if px < self.width && py < self.height {
                        img.put_pixel(px, py, color);
                    }
                }
            }
            if let [(x, y)] = finite.as_slice() {
                img.put_pixel((x.round() as u32).min(w), (y.round() as u32).min(h), color);
            }
        }
        Ok(img)
    }
}

/// What a backend sees when `show` fires.
pub struct ShowContext<'a> {
    pub target: Option<&'a Logger>,
    pub style: &'a PlotStyle,
}

/// Decides what happens to open figures on `show`.
pub trait PlotBackend: Send {
    fn name(&self) -> &str;

    fn show(
        &mut self,
        figures: &mut Vec<Box<dyn Figure>>,
        ctx: &ShowContext<'_>,
    ) -> Result<(), PlotError>;
}

/// Leaves figures open; nothing is displayed.
#[derive(Debug, Default)]
pub struct HeadlessBackend;

impl PlotBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn show(
        &mut self,
        figures: &mut Vec<Box<dyn Figure>>,
        _ctx: &ShowContext<'_>,
    ) -> Result<(), PlotError> {
        tracing::debug!(open = figures.len(), "show ignored by headless backend");
        Ok(())
    }
}

/// Rasterizes every open figure into the active target, then closes them.
#[derive(Debug, Default)]
pub struct InlineBackend;

impl PlotBackend for InlineBackend {
    fn name(&self) -> &str {
        "inline"
    }

    fn show(
        &mut self,
        figures: &mut Vec<Box<dyn Figure>>,
        ctx: &ShowContext<'_>,
    ) -> Result<(), PlotError> {
        let Some(target) = ctx.target else {
            return Err(PlotError::NoActiveTarget);
        };
        let mut first_error = None;
        for figure in figures.drain(..) {
            if let Err(e) = target.print_figure(figure.as_ref(), ctx.style) {
                tracing::warn!(error = %e, "figure could not be shown");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

struct PlotterState {
    backend: Box<dyn PlotBackend>,
    figures: Vec<Box<dyn Figure>>,
    target: Option<Logger>,
    style: PlotStyle,
    shown: bool,
}

impl PlotterState {
    fn show(&mut self) -> Result<(), PlotError> {
        self.shown = true;
        let ctx = ShowContext {
            target: self.target.as_ref(),
            style: &self.style,
        };
        self.backend.show(&mut self.figures, &ctx)
    }
}

/// The plotting context: open figures, the backend, and at most one active
/// target log.
pub struct Plotter {
    state: Mutex<PlotterState>,
}

impl Plotter {
    /// A plotter on the headless backend.
    pub fn new() -> Arc<Self> {
        Self::with_backend(HeadlessBackend)
    }

    pub fn with_backend(backend: impl PlotBackend + 'static) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PlotterState {
                backend: Box::new(backend),
                figures: Vec::new(),
                target: None,
                style: PlotStyle::default(),
                shown: false,
            }),
        })
    }

    /// Open a figure. It stays open until a backend shows it.
    pub fn add_figure(&self, figure: impl Figure + 'static) {
        self.lock().figures.push(Box::new(figure));
    }

    pub fn open_figures(&self) -> usize {
        self.lock().figures.len()
    }

    /// Show open figures through the current backend.
    pub fn show(&self) -> Result<(), PlotError> {
        self.lock().show()
    }

    pub fn backend_name(&self) -> String {
        self.lock().backend.name().to_string()
    }

    pub fn has_target(&self) -> bool {
        self.lock().target.is_some()
    }

    pub fn style(&self) -> PlotStyle {
        self.lock().style.clone()
    }

    /// Make `target` the active plotting target, switch to the inline
    /// backend and apply `style`. Fails with [`PlotError::TargetBusy`] when
    /// another capture is active.
    pub fn capture(
        self: &Arc<Self>,
        target: Logger,
        style: PlotStyle,
    ) -> Result<PlotCaptureGuard, PlotError> {
        let mut state = self.lock();
        if state.target.is_some() {
            return Err(PlotError::TargetBusy);
        }
        let previous_backend = std::mem::replace(&mut state.backend, Box::new(InlineBackend));
        let previous_style = std::mem::replace(&mut state.style, style);
        state.target = Some(target);
        state.shown = false;
        tracing::debug!(facecolor = %state.style.facecolor_hex(), "plot capture started");
        drop(state);

        Ok(PlotCaptureGuard {
            plotter: Arc::clone(self),
            previous_backend: Some(previous_backend),
            previous_style: Some(previous_style),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PlotterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Ends plot capture on drop, showing figures left open if `show` never
/// fired during the capture.
#[must_use = "plot capture ends as soon as the guard is dropped"]
pub struct PlotCaptureGuard {
    plotter: Arc<Plotter>,
    previous_backend: Option<Box<dyn PlotBackend>>,
    previous_style: Option<PlotStyle>,
}

impl Drop for PlotCaptureGuard {
    fn drop(&mut self) {
        let mut state = self.plotter.lock();
        if !state.shown
            && !state.figures.is_empty()
            && let Err(e) = state.show()
        {
            tracing::warn!(error = %e, "showing figures at end of plot capture failed");
        }
        state.target = None;
        if let Some(backend) = self.previous_backend.take() {
            state.backend = backend;
        }
        if let Some(style) = self.previous_style.take() {
            state.style = style;
        }
        tracing::debug!("plot capture ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::LogView;

    #[test]
    fn style_follows_background() {
        assert!(PlotStyle::for_background([20, 20, 20]).dark);
        assert!(!PlotStyle::for_background([250, 250, 250]).dark);
        assert_eq!(PlotStyle::for_background([1, 2, 255]).facecolor_hex(), "#0102ff");
    }

    #[test]
    fn headless_show_keeps_figures_open() {
        let plotter = Plotter::new();
        plotter.add_figure(LineFigure::new(20, 10));
        plotter.show().unwrap();
        assert_eq!(plotter.open_figures(), 1);
        assert_eq!(plotter.backend_name(), "headless");
    }

    #[test]
    fn inline_show_without_target_fails() {
        let plotter = Plotter::with_backend(InlineBackend);
        plotter.add_figure(LineFigure::new(20, 10));
        assert!(matches!(plotter.show(), Err(PlotError::NoActiveTarget)));
    }

    #[test]
    fn capture_swaps_backend_and_restores_it() {
        let (mut view, logger) = LogView::new(10);
        let plotter = Plotter::new();
        let guard = plotter
            .capture(logger, PlotStyle::for_background([0, 0, 0]))
            .unwrap();
        assert_eq!(plotter.backend_name(), "inline");
        assert!(plotter.style().dark);

        plotter.add_figure(LineFigure::new(30, 20).with_series([(0.0, 0.0), (1.0, 1.0)]));
        plotter.show().unwrap();
        assert_eq!(plotter.open_figures(), 0);
        drop(guard);

        assert_eq!(plotter.backend_name(), "headless");
        assert!(!plotter.has_target());
        assert_eq!(plotter.style(), PlotStyle::default());
        view.process_pending();
        assert_eq!(view.image_indices(), vec![0]);
    }

    #[test]
    fn second_capture_is_rejected() {
        let (_a, first) = LogView::new(10);
        let (_b, second) = LogView::new(10);
        let plotter = Plotter::new();
        let _guard = plotter.capture(first, PlotStyle::default()).unwrap();
        assert!(matches!(
            plotter.capture(second, PlotStyle::default()),
            Err(PlotError::TargetBusy)
        ));
    }

    #[test]
    fn unshown_figures_are_flushed_when_capture_ends() {
        let (mut view, logger) = LogView::new(10);
        let plotter = Plotter::new();
        let guard = plotter.capture(logger, PlotStyle::default()).unwrap();
        plotter.add_figure(RasterFigure::new(RgbaImage::new(4, 4)));
        drop(guard);
        view.process_pending();
        assert_eq!(view.sink().len(), 1);
        assert_eq!(plotter.open_figures(), 0);
    }

    #[test]
    fn failing_figure_still_closes_the_rest() {
        let (mut view, logger) = LogView::new(10);
        let plotter = Plotter::new();
        let _guard = plotter.capture(logger, PlotStyle::default()).unwrap();
        plotter.add_figure(LineFigure::new(1, 1));
        plotter.add_figure(LineFigure::new(10, 10));
        assert!(matches!(plotter.show(), Err(PlotError::Rasterize(_))));
        assert_eq!(plotter.open_figures(), 0);
        view.process_pending();
        assert_eq!(view.sink().len(), 1);
    }

    #[test]
    fn raster_figure_blends_onto_facecolor() {
        let fig = RasterFigure::new(RgbaImage::new(2, 2));
        let out = fig.rasterize(&PlotStyle::for_background([10, 20, 30])).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }
}
