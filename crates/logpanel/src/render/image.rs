//! Pixel data to inline bitmaps: colormapping, normalization and display
//! scaling.

use std::path::PathBuf;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Target width used when a wide image is scaled automatically.
pub const AUTO_WIDTH: u32 = 360;
/// Target height used when a tall image is scaled automatically.
pub const AUTO_HEIGHT: u32 = 240;

/// A 2-D array of scalar samples in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl ScalarField {
    pub fn new(width: u32, height: u32, values: Vec<f64>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(RenderError::Shape {
                width,
                height,
                expected,
                actual: values.len(),
            });
        }
        if expected == 0 {
            return Err(RenderError::EmptyImage);
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, RenderError> {
        let width = rows.first().map_or(0, Vec::len);
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        if rows.iter().any(|r| r.len() != width) {
            return Err(RenderError::Shape {
                width: width as u32,
                height: rows.len() as u32,
                expected: width * rows.len(),
                actual: values.len(),
            });
        }
        Self::new(width as u32, rows.len() as u32, values)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn finite_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Something that can be shown as an image.
#[derive(Clone, Debug)]
pub enum ImageData {
    /// Scalar samples, colored through a colormap.
    Scalar(ScalarField),
    /// An already-colored image, shown as is.
    Color(DynamicImage),
    /// An image file. Grayscale files are treated as scalar data.
    Path(PathBuf),
}

impl From<ScalarField> for ImageData {
    fn from(field: ScalarField) -> Self {
        Self::Scalar(field)
    }
}

impl From<RgbaImage> for ImageData {
    fn from(image: RgbaImage) -> Self {
        Self::Color(DynamicImage::ImageRgba8(image))
    }
}

impl From<PathBuf> for ImageData {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// Colormaps for scalar data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Gray,
    Magma,
    Hot,
    Jet,
}

impl Colormap {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "viridis" => Some(Self::Viridis),
            "gray" | "grey" => Some(Self::Gray),
            "magma" => Some(Self::Magma),
            "hot" => Some(Self::Hot),
            "jet" => Some(Self::Jet),
            _ => None,
        }
    }

    fn stops(self) -> &'static [(f64, [u8; 3])] {
        match self {
            Self::Viridis => &[
                (0.0, [68, 1, 84]),
                (0.25, [59, 82, 139]),
                (0.5, [33, 145, 140]),
                (0.75, [94, 201, 98]),
                (1.0, [253, 231, 37]),
            ],
            Self::Gray => &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])],
            Self::Magma => &[
                (0.0, [0, 0, 4]),
                (0.25, [81, 18, 124]),
                (0.5, [183, 55, 121]),
                (0.75, [252, 137, 97]),
                (1.0, [252, 253, 191]),
            ],
            Self::Hot => &[
                (0.0, [11, 0, 0]),
                (0.365, [255, 0, 0]),
                (0.746, [255, 255, 0]),
                (1.0, [255, 255, 255]),
            ],
            Self::Jet => &[
                (0.0, [0, 0, 127]),
                (0.125, [0, 0, 255]),
                (0.375, [0, 255, 255]),
                (0.625, [255, 255, 0]),
                (0.875, [255, 0, 0]),
                (1.0, [127, 0, 0]),
            ],
        }
    }

    /// Color for a normalized sample in `[0, 1]`.
    pub fn sample(self, t: f64) -> [u8; 3] {
        let t = t.clamp(0.0, 1.0);
        let stops = self.stops();
        let upper = stops.iter().position(|(pos, _)| *pos >= t).unwrap_or(stops.len() - 1);
        if upper == 0 {
            return stops[0].1;
        }
        let (p0, c0) = stops[upper - 1];
        let (p1, c1) = stops[upper];
        let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
        let mut rgb = [0u8; 3];
        for (i, channel) in rgb.iter_mut().enumerate() {
            let v = f64::from(c0[i]) + (f64::from(c1[i]) - f64::from(c0[i])) * f;
            *channel = v.round().clamp(0.0, 255.0) as u8;
        }
        rgb
    }
}

/// How scalar samples map onto the colormap's `[0, 1]` domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    Linear,
    Log,
}

/// Options for [`prepare_image`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageOptions {
    /// Lower color limit; defaults to the data minimum.
    pub vmin: Option<f64>,
    /// Upper color limit; defaults to the data maximum.
    pub vmax: Option<f64>,
    pub cmap: Option<Colormap>,
    pub norm: Norm,
    /// Display width; wins over `height` when both are set.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageOptions {
    pub fn with_clim(mut self, vmin: f64, vmax: f64) -> Self {
        self.vmin = Some(vmin);
        self.vmax = Some(vmax);
        self
    }

    pub fn with_cmap(mut self, cmap: Colormap) -> Self {
        self.cmap = Some(cmap);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }
}

/// Display size for a `w`x`h` image, preserving aspect ratio.
///
/// With no explicit size, wide images (`w/3 > h/2`) get width
/// [`AUTO_WIDTH`] and the rest get height [`AUTO_HEIGHT`].
pub fn display_size(w: u32, h: u32, width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let scaled = |other: u32, target: u32, base: u32| -> u32 {
        let v = (f64::from(other) * f64::from(target) / f64::from(base.max(1))).round();
        (v as u32).max(1)
    };
    match (width, height) {
        (Some(tw), _) => (tw.max(1), scaled(h, tw.max(1), w)),
        (None, Some(th)) => (scaled(w, th.max(1), h), th.max(1)),
        (None, None) => {
            if f64::from(w) / 3.0 > f64::from(h) / 2.0 {
                (AUTO_WIDTH, scaled(h, AUTO_WIDTH, w))
            } else {
                (scaled(w, AUTO_HEIGHT, h), AUTO_HEIGHT)
            }
        }
    }
}

/// Color `data` without resizing it.
pub fn render_image(data: ImageData, opts: &ImageOptions) -> Result<RgbaImage, RenderError> {
    let image = match data {
        ImageData::Scalar(field) => colorize(&field, opts),
        ImageData::Color(image) => image.to_rgba8(),
        ImageData::Path(path) => {
            let image = image::open(&path).map_err(|source| RenderError::Load {
                path: path.clone(),
                source,
            })?;
            match image {
                DynamicImage::ImageLuma8(_)
                | DynamicImage::ImageLuma16(_)
                | DynamicImage::ImageLumaA8(_)
                | DynamicImage::ImageLumaA16(_) => {
                    let luma = image.to_luma32f();
                    let values = luma.pixels().map(|p| f64::from(p.0[0])).collect();
                    colorize(&ScalarField::new(luma.width(), luma.height(), values)?, opts)
                }
                other => other.to_rgba8(),
            }
        }
    };
    if image.width() == 0 || image.height() == 0 {
        return Err(RenderError::EmptyImage);
    }
    Ok(image)
}

/// Color `data` and scale it for display with smooth interpolation.
pub fn prepare_image(data: ImageData, opts: &ImageOptions) -> Result<RgbaImage, RenderError> {
    let image = render_image(data, opts)?;
    let (w, h) = display_size(image.width(), image.height(), opts.width, opts.height);
    if (w, h) == image.dimensions() {
        return Ok(image);
    }
    Ok(image::imageops::resize(&image, w, h, FilterType::Triangle))
}

fn colorize(field: &ScalarField, opts: &ImageOptions) -> RgbaImage {
    let cmap = opts.cmap.unwrap_or_default();
    let (data_lo, data_hi) = match opts.norm {
        Norm::Linear => field.finite_range().unwrap_or((0.0, 1.0)),
        Norm::Log => field
            .values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((1.0, 10.0)),
    };
    let lo = opts.vmin.unwrap_or(data_lo);
    let hi = opts.vmax.unwrap_or(data_hi);

    let normalize = |v: f64| -> Option<f64> {
        if !v.is_finite() {
            return None;
        }
        match opts.norm {
            Norm::Linear => Some(if hi > lo { (v - lo) / (hi - lo) } else { 0.0 }),
            Norm::Log => {
                if v <= 0.0 || lo <= 0.0 {
                    return None;
                }
                let (l0, l1) = (lo.ln(), hi.ln());
                Some(if l1 > l0 { (v.ln() - l0) / (l1 - l0) } else { 0.0 })
            }
        }
    };

    RgbaImage::from_fn(field.width, field.height, |x, y| {
        let v = field.values[(y * field.width + x) as usize];
        match normalize(v) {
            Some(t) => {
                let [r, g, b] = cmap.sample(t);
                image::Rgba([r, g, b, 255])
            }
            None => image::Rgba([0, 0, 0, 0]),
        }
    })
}
