//! Chart Style Module
//! All styling constants for the DID chart as one explicit value. Nothing
//! here mutates global plotting state; the renderer receives the `Style` and
//! converts point sizes to pixels through the configured DPI.

use std::path::PathBuf;

use plotters::style::RGBColor;

pub const NAVY: RGBColor = RGBColor(0, 0, 128);
pub const PURPLE: RGBColor = RGBColor(128, 0, 128);
pub const RULE_GRAY: RGBColor = RGBColor(128, 128, 128);
pub const INK: RGBColor = RGBColor(0, 0, 0);

/// Font file the chart text is set in. One fixed path, no fallback face;
/// a missing file aborts the render before any output exists.
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// One stroke: color, opacity, width in points, optional dash pattern
/// (dash length, gap length) in points. `dash: None` draws solid.
#[derive(Clone, Copy, Debug)]
pub struct Stroke {
    pub color: RGBColor,
    pub alpha: f64,
    pub width_pt: f64,
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    pub const fn solid(color: RGBColor, width_pt: f64) -> Self {
        Self {
            color,
            alpha: 1.0,
            width_pt,
            dash: None,
        }
    }

    pub const fn dashed(color: RGBColor, width_pt: f64, dash_pt: f64, gap_pt: f64) -> Self {
        Self {
            color,
            alpha: 1.0,
            width_pt,
            dash: Some((dash_pt, gap_pt)),
        }
    }
}

/// Font resource configuration.
#[derive(Clone, Debug)]
pub struct FontConfig {
    pub path: PathBuf,
}

/// Plot-frame margins as fractions of the figure width (left/right) and
/// height (top/bottom).
#[derive(Clone, Copy, Debug)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// The bracket annotation marking the treatment effect. The bracket anchor
/// and label center are in data coordinates; the vertical span is in data
/// units, the bracket arms in points.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub base: String,
    pub subscript: String,
    pub at: (f64, f64),
    pub text_at: (f64, f64),
    pub span: f64,
    pub arm_pt: f64,
    pub stroke: Stroke,
}

/// Complete styling for one chart render.
#[derive(Clone, Debug)]
pub struct Style {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub font: FontConfig,
    pub margins: Margins,
    /// Fraction of the data range added on each side of both axes.
    pub range_pad: f64,
    /// Paired with dataset series by index, cycling when shorter.
    pub series: Vec<Stroke>,
    /// Vertical rules at the labeled time positions.
    pub rule: Stroke,
    /// Left and bottom plot-frame lines; top and right are not drawn.
    pub spine: Stroke,
    pub tick_len_pt: f64,
    pub label_size_pt: f64,
    pub axis_label_size_pt: f64,
    pub x_label: String,
    pub y_label: String,
    pub annotation: Annotation,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width_in: 8.0,
            height_in: 6.0,
            dpi: 300,
            font: FontConfig {
                path: PathBuf::from(DEFAULT_FONT_PATH),
            },
            margins: Margins {
                left: 0.125,
                right: 0.10,
                top: 0.12,
                bottom: 0.11,
            },
            range_pad: 0.05,
            series: vec![
                Stroke::solid(NAVY, 2.0),
                Stroke::solid(PURPLE, 2.0),
                Stroke::dashed(PURPLE, 2.0, 6.0, 4.0),
            ],
            rule: Stroke {
                color: RULE_GRAY,
                alpha: 0.6,
                width_pt: 1.0,
                dash: Some((1.2, 3.0)),
            },
            spine: Stroke::solid(INK, 0.8),
            tick_len_pt: 3.5,
            label_size_pt: 12.0,
            axis_label_size_pt: 14.0,
            x_label: "Time".to_string(),
            y_label: "Outcome".to_string(),
            annotation: Annotation {
                base: "τ".to_string(),
                subscript: "DID".to_string(),
                at: (1.1, 10.5),
                text_at: (1.4, 10.5),
                span: 2.6,
                arm_pt: 10.0,
                stroke: Stroke::solid(INK, 1.5),
            },
        }
    }
}

impl Style {
    /// Figure size in pixels: physical size times DPI.
    pub fn pixel_dims(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi as f64).round() as u32,
            (self.height_in * self.dpi as f64).round() as u32,
        )
    }

    /// Convert a length in points to pixels at the configured DPI.
    pub fn px(&self, pt: f64) -> f64 {
        pt * self.dpi as f64 / 72.0
    }
}
