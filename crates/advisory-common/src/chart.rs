/// Per-topic bar chart: one bar per question, fixed integer y range.
///
/// Bars, axes and tick marks are rasterized into a PNG; text is returned as positioned
/// labels that the composer draws on top of the embedded image. Identical input always
/// produces identical PNG bytes (no timestamps or other metadata are written).
use std::io::{Cursor, Write};

use image::{DynamicImage, Rgb, RgbImage};

use crate::canvas::{Color, RasterImage};
use crate::error::CommonError;

/// Raster size in pixels (a 4 in square at 100 dpi).
pub const CHART_PIXELS: u32 = 400;
/// Nominal size of the chart in points; label sizes are relative to it.
pub const CHART_NOMINAL_PT: f32 = 288.0;

const PLOT_LEFT: u32 = 80;
const PLOT_RIGHT: u32 = 320;
const PLOT_TOP: u32 = 80;
const PLOT_BOTTOM: u32 = 280;
const TICK_LEN: u32 = 5;
const BAR_FILL_RATIO: f32 = 0.8;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    /// (x label, level) per bar, left to right.
    pub bars: Vec<(String, u8)>,
    /// Inclusive y-axis range; a tick is drawn at every integer.
    pub y_range: (u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// Text placed relative to the chart image: `x`, `y` are fractions of the image width
/// and height measured from the bottom-left corner; `size` is in points at
/// `CHART_NOMINAL_PT`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub anchor: Anchor,
    pub vertical: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub labels: Vec<ChartLabel>,
}

pub fn render_chart(spec: &ChartSpec) -> Result<ChartImage, CommonError> {
    let (lo, hi) = spec.y_range;
    if lo >= hi {
        return Err(CommonError::Validation(format!(
            "invalid chart y range [{lo}, {hi}]"
        )));
    }

    let mut img = RgbImage::from_pixel(CHART_PIXELS, CHART_PIXELS, WHITE);
    let mut labels = Vec::new();
    let bar_color = Rgb(Color::ACCENT.to_rgb8());

    let row_for = |level: u8| -> u32 {
        let clamped = level.clamp(lo, hi);
        let frac = f32::from(clamped - lo) / f32::from(hi - lo);
        PLOT_BOTTOM - (frac * (PLOT_BOTTOM - PLOT_TOP) as f32).round() as u32
    };

    let n = spec.bars.len() as u32;
    if n > 0 {
        let slot = (PLOT_RIGHT - PLOT_LEFT) as f32 / n as f32;
        let bar_width = slot * BAR_FILL_RATIO;
        for (i, (label, level)) in spec.bars.iter().enumerate() {
            let center = PLOT_LEFT as f32 + slot * (i as f32 + 0.5);
            let x0 = (center - bar_width / 2.0).round() as u32;
            let x1 = (center + bar_width / 2.0).round() as u32;
            let top = row_for(*level);
            fill_rect(&mut img, x0, top, x1, PLOT_BOTTOM, bar_color);

            let cx = center.round() as u32;
            fill_rect(&mut img, cx, PLOT_BOTTOM, cx + 1, PLOT_BOTTOM + TICK_LEN, BLACK);
            labels.push(ChartLabel {
                text: label.clone(),
                x: center / CHART_PIXELS as f32,
                y: from_top(PLOT_BOTTOM + 18),
                size: 8.0,
                anchor: Anchor::Middle,
                vertical: false,
            });
        }
    }

    for level in lo..=hi {
        let row = row_for(level);
        fill_rect(&mut img, PLOT_LEFT - TICK_LEN, row, PLOT_LEFT, row + 1, BLACK);
        labels.push(ChartLabel {
            text: level.to_string(),
            x: (PLOT_LEFT - TICK_LEN - 3) as f32 / CHART_PIXELS as f32,
            y: from_top(row + 3),
            size: 8.0,
            anchor: Anchor::End,
            vertical: false,
        });
    }

    // Frame drawn last so bars never cover it.
    fill_rect(&mut img, PLOT_LEFT, PLOT_TOP, PLOT_RIGHT + 1, PLOT_TOP + 1, BLACK);
    fill_rect(&mut img, PLOT_LEFT, PLOT_BOTTOM, PLOT_RIGHT + 1, PLOT_BOTTOM + 1, BLACK);
    fill_rect(&mut img, PLOT_LEFT, PLOT_TOP, PLOT_LEFT + 1, PLOT_BOTTOM + 1, BLACK);
    fill_rect(&mut img, PLOT_RIGHT, PLOT_TOP, PLOT_RIGHT + 1, PLOT_BOTTOM + 1, BLACK);

    let plot_center_x = (PLOT_LEFT + PLOT_RIGHT) as f32 / 2.0 / CHART_PIXELS as f32;
    labels.push(ChartLabel {
        text: "Question Number".to_string(),
        x: plot_center_x,
        y: from_top(PLOT_BOTTOM + 40),
        size: 10.0,
        anchor: Anchor::Middle,
        vertical: false,
    });
    labels.push(ChartLabel {
        text: "Maturity Level".to_string(),
        x: (PLOT_LEFT - 35) as f32 / CHART_PIXELS as f32,
        y: from_top((PLOT_TOP + PLOT_BOTTOM) / 2),
        size: 10.0,
        anchor: Anchor::Middle,
        vertical: true,
    });
    labels.push(ChartLabel {
        text: spec.title.clone(),
        x: plot_center_x,
        y: from_top(PLOT_TOP - 20),
        size: 10.0,
        anchor: Anchor::Middle,
        vertical: false,
    });

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)?;
    Ok(ChartImage { png, labels })
}

/// Round-trip the chart through a scratch file and decode it for embedding.
///
/// The scratch file is removed when this function returns, whether decoding
/// succeeded or not.
pub fn embed_chart(chart: &ChartImage) -> Result<RasterImage, CommonError> {
    let mut scratch = tempfile::Builder::new()
        .prefix("chart-")
        .suffix(".png")
        .tempfile()?;
    scratch.write_all(&chart.png)?;
    scratch.flush()?;
    let bytes = std::fs::read(scratch.path())?;
    RasterImage::decode(&bytes)
}

fn from_top(row: u32) -> f32 {
    1.0 - row as f32 / CHART_PIXELS as f32
}

/// Fill pixels in [x0, x1) × [y0, y1), clipped to the image.
fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1.min(img.height()) {
        for x in x0..x1.min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}
