//! Chart rendering to image files.
//!
//! Charts are described by plain data structs and drawn through a small
//! [`Figure`] trait so the same drawing code targets both the SVG and the bitmap
//! backend. The backend is picked from the output file extension.

mod calibration;
mod lines;

pub use calibration::CalibrationChart;
pub use lines::{LineChart, LineSpec};

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::AppError;

/// Output image size in pixels.
pub const FIGURE_SIZE: (u32, u32) = (800, 600);

/// Matplotlib's `tab10` palette, used when a plot does not name its colors.
pub const TAB10: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Something that can draw itself onto any plotters drawing area.
pub trait Figure {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), String>;
}

/// Render `figure` to `path`: `.svg` goes to the SVG backend, anything else to a bitmap.
pub fn render<F: Figure>(path: &Path, figure: &F) -> Result<(), AppError> {
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    let result = if is_svg {
        let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
        figure.draw(&root).and_then(|()| root.present().map_err(draw_err))
    } else {
        let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
        figure.draw(&root).and_then(|()| root.present().map_err(draw_err))
    };

    result.map_err(|message| AppError::Plot {
        file: path.display().to_string(),
        message,
    })
}

pub(crate) fn draw_err<E: std::fmt::Display>(e: E) -> String {
    e.to_string()
}

/// Parse a color given as `#rrggbb`, a `tab:` palette name or a basic color name.
pub fn parse_color(text: &str) -> Option<RGBColor> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some(RGBColor(channel(0)?, channel(2)?, channel(4)?));
    }

    let lower = text.to_ascii_lowercase();
    let tab = |i: usize| Some(TAB10[i]);
    match lower.as_str() {
        "tab:blue" => tab(0),
        "tab:orange" => tab(1),
        "tab:green" => tab(2),
        "tab:red" => tab(3),
        "tab:purple" => tab(4),
        "tab:brown" => tab(5),
        "tab:pink" => tab(6),
        "tab:gray" | "tab:grey" => tab(7),
        "tab:olive" => tab(8),
        "tab:cyan" => tab(9),
        "black" | "k" => Some(BLACK),
        "white" | "w" => Some(WHITE),
        "red" | "r" => Some(RED),
        "green" | "g" => Some(RGBColor(0, 128, 0)),
        "blue" | "b" => Some(BLUE),
        "cyan" | "c" => Some(CYAN),
        "magenta" | "m" => Some(MAGENTA),
        "yellow" | "y" => Some(YELLOW),
        "orange" => Some(RGBColor(255, 165, 0)),
        "purple" => Some(RGBColor(128, 0, 128)),
        "brown" => Some(RGBColor(165, 42, 42)),
        "pink" => Some(RGBColor(255, 192, 203)),
        "gray" | "grey" => Some(RGBColor(128, 128, 128)),
        _ => None,
    }
}

/// Padded axis range over finite values; a flat or empty range still gets a span.
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi <= lo {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        return (lo - pad, hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_parse_from_hex_and_names() {
        assert_eq!(parse_color("#1f77b4"), Some(TAB10[0]));
        assert_eq!(parse_color("#FF0000"), Some(RGBColor(255, 0, 0)));
        assert_eq!(parse_color("tab:orange"), Some(TAB10[1]));
        assert_eq!(parse_color(" Black "), Some(BLACK));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#gg0000"), None);
        assert_eq!(parse_color("chartreuse-ish"), None);
    }

    #[test]
    fn padded_range_handles_flat_and_empty_input() {
        assert_eq!(padded_range(Vec::<f64>::new()), (0.0, 1.0));
        assert_eq!(padded_range([0.0, 0.0]), (-1.0, 1.0));
        let (lo, hi) = padded_range([0.0, 10.0, f64::NAN]);
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }
}
