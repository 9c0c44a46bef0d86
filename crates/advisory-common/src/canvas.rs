/// Page display list produced by the composer and consumed by the PDF writer.
///
/// Coordinates are PDF points with the origin at the bottom-left corner of the page.
use std::path::Path;
use std::sync::Arc;

use crate::error::CommonError;

/// Landscape A4.
pub const PAGE_WIDTH: f32 = 841.89;
pub const PAGE_HEIGHT: f32 = 595.28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const LIGHT_GREY: Color = Color { r: 0.827_451, g: 0.827_451, b: 0.827_451 };
    /// `#E96C25`, used for selected values and chart bars.
    pub const ACCENT: Color = Color { r: 0.913_725, g: 0.423_529, b: 0.145_098 };

    pub fn to_rgb8(self) -> [u8; 3] {
        [
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
        ]
    }
}

/// Decoded raster image: 8-bit RGB samples plus an optional alpha plane.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

impl RasterImage {
    pub fn load(path: &Path) -> Result<Self, CommonError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Decode PNG/any supported format. The alpha plane is kept only when the
    /// image actually uses transparency.
    pub fn decode(bytes: &[u8]) -> Result<Self, CommonError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for px in rgba.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }
        let alpha = alpha.iter().any(|&a| a != u8::MAX).then_some(alpha);
        Ok(Self {
            width,
            height,
            rgb,
            alpha,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        color: Color,
        text: String,
        /// Rotated 90° counter-clockwise around (x, y).
        vertical: bool,
    },
    Image {
        image: Arc<RasterImage>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Color,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Color, text: impl Into<String>) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            font,
            size,
            color,
            text: text.into(),
            vertical: false,
        });
    }

    pub fn vertical_text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Color, text: impl Into<String>) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            font,
            size,
            color,
            text: text.into(),
            vertical: true,
        });
    }

    pub fn image(&mut self, image: &Arc<RasterImage>, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Image {
            image: Arc::clone(image),
            x,
            y,
            width,
            height,
        });
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Color) {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
        });
    }

    /// Text runs on this page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn landscape_a4() -> Self {
        Self {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            pages: Vec::new(),
        }
    }

    /// Start a new page and return it for drawing.
    pub fn new_page(&mut self) -> &mut Page {
        self.pages.push(Page::default());
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}

/// Branding images shared by every report. Missing images are simply not drawn.
#[derive(Debug, Clone, Default)]
pub struct Assets {
    pub banner: Option<Arc<RasterImage>>,
    pub logo: Option<Arc<RasterImage>>,
}

impl Assets {
    pub fn load(banner: Option<&Path>, logo: Option<&Path>) -> Result<Self, CommonError> {
        Ok(Self {
            banner: banner.map(RasterImage::load).transpose()?.map(Arc::new),
            logo: logo.map(RasterImage::load).transpose()?.map(Arc::new),
        })
    }
}
