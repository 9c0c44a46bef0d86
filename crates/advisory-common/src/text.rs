/// Text measurement and line layout for the standard Helvetica faces.
///
/// Widths are the Adobe AFM advance widths (1/1000 em) for printable ASCII; any other
/// character is measured as a digit-wide glyph.
use crate::canvas::Font;

const FIRST_CHAR: u32 = 32;
const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn glyph_width(font: Font, c: char) -> u16 {
    let table = match font {
        Font::Helvetica => &HELVETICA_WIDTHS,
        Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
    };
    (c as u32)
        .checked_sub(FIRST_CHAR)
        .and_then(|i| table.get(i as usize))
        .copied()
        .unwrap_or(FALLBACK_WIDTH)
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(font, c))).sum();
    units as f32 * size / 1000.0
}

/// A run of text with a flag for accent coloring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub emphasis: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: false,
        }
    }

    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: true,
        }
    }
}

/// A segment (or a piece of one) placed on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRun {
    pub line: usize,
    pub x: f32,
    pub text: String,
    pub emphasis: bool,
}

/// Greedy left-to-right layout at segment granularity.
///
/// A segment that would cross `right` moves to a new line starting at `left`. A segment
/// too wide for a whole line is laid out word by word. A line is never broken before its
/// first run.
pub fn flow_segments(segments: &[Segment], font: Font, size: f32, left: f32, right: f32) -> Vec<PlacedRun> {
    let mut runs = Vec::new();
    let mut line = 0;
    let mut x = left;
    let mut line_start = true;

    for segment in segments {
        let width = text_width(&segment.text, font, size);
        if x + width > right && !line_start {
            line += 1;
            x = left;
            line_start = true;
        }
        if x + width <= right {
            runs.push(PlacedRun {
                line,
                x,
                text: segment.text.clone(),
                emphasis: segment.emphasis,
            });
            x += width;
            line_start = false;
            continue;
        }

        for word in segment.text.split_inclusive(' ') {
            let visible = word.trim_end();
            if x + text_width(visible, font, size) > right && !line_start {
                line += 1;
                x = left;
            }
            if !visible.is_empty() {
                runs.push(PlacedRun {
                    line,
                    x,
                    text: visible.to_string(),
                    emphasis: segment.emphasis,
                });
            }
            x += text_width(word, font, size);
            line_start = false;
        }
    }
    runs
}

/// Break plain text into lines no wider than `max_width`, splitting on spaces.
pub fn wrap_words(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font, size) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
