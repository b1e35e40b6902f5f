//! Static Chart Renderer
//! Draws the DID illustration into an in-memory RGB surface and encodes it
//! as PNG. Rendering completes entirely in memory before the output file is
//! opened, so a font or drawing failure never leaves partial output behind.
//!
//! Layout:
//! 1. Three outcome series over the time axis, gaps at no-value positions
//! 2. Dotted vertical rules at the labeled period boundaries
//! 3. Square-bracket annotation marking the treatment effect
//! 4. Open frame: left/bottom spines, period ticks, unlabeled outcome ticks

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::RgbImage;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontDesc, FontFamily, FontStyle, FontTransform};
use thiserror::Error;
use tracing::debug;

use crate::charts::style::{FontConfig, Stroke, Style, INK};
use crate::data::Dataset;

/// Family name the configured font file is registered under.
const FONT_FAMILY: &str = "did-graph";

const SUBSCRIPT_RATIO: f64 = 0.7;
const SUBSCRIPT_DROP: f64 = 0.28;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to read font file {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font file {path} is not a usable TTF/OTF face")]
    FontRegister { path: PathBuf },
    #[error("style defines no series strokes")]
    NoSeriesStroke,
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error("rendered buffer had unexpected size")]
    Buffer,
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write chart image: {0}")]
    Encode(#[from] image::ImageError),
}

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Data-to-pixel mapping for the plot frame.
struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Frame {
    fn new(dataset: &Dataset, style: &Style) -> Self {
        let (w, h) = style.pixel_dims();
        let (w, h) = (w as f64, h as f64);
        let (x_lo, x_hi) = expand_degenerate(dataset.axis().range());
        let (y_lo, y_hi) = expand_degenerate(dataset.value_range());
        let x_pad = (x_hi - x_lo) * style.range_pad;
        let y_pad = (y_hi - y_lo) * style.range_pad;
        Self {
            x_min: x_lo - x_pad,
            x_max: x_hi + x_pad,
            y_min: y_lo - y_pad,
            y_max: y_hi + y_pad,
            left: w * style.margins.left,
            right: w * (1.0 - style.margins.right),
            top: h * style.margins.top,
            bottom: h * (1.0 - style.margins.bottom),
        }
    }

    fn x_px(&self, x: f64) -> f64 {
        let ratio = (x - self.x_min) / (self.x_max - self.x_min);
        self.left + ratio * (self.right - self.left)
    }

    fn y_px(&self, y: f64) -> f64 {
        let ratio = (y - self.y_min) / (self.y_max - self.y_min);
        self.bottom - ratio * (self.bottom - self.top)
    }

    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        (self.x_px(x), self.y_px(y))
    }
}

/// Renders the chart described by a `Dataset` and a `Style`.
pub struct ChartRenderer;

impl ChartRenderer {
    /// Render the chart into an RGB image of `inches x dpi` pixels.
    pub fn render(dataset: &Dataset, style: &Style) -> Result<RgbImage, RenderError> {
        Self::load_font(&style.font)?;
        if style.series.is_empty() {
            return Err(RenderError::NoSeriesStroke);
        }

        let (width, height) = style.pixel_dims();
        debug!(width, height, "rendering chart");
        let mut buf = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let frame = Frame::new(dataset, style);
            Self::draw_series(&root, &frame, dataset, style)?;
            Self::draw_period_rules(&root, &frame, dataset, style)?;
            Self::draw_annotation(&root, &frame, style)?;
            Self::draw_axes(&root, &frame, dataset, style)?;

            root.present().map_err(draw_err)?;
        }
        RgbImage::from_raw(width, height, buf).ok_or(RenderError::Buffer)
    }

    /// Render and persist as PNG, creating the output directory if missing
    /// and overwriting any existing file at `path`.
    pub fn render_to_file(
        dataset: &Dataset,
        style: &Style,
        path: &Path,
    ) -> Result<(), RenderError> {
        let image = Self::render(dataset, style)?;
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|source| RenderError::OutputDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        image.save(path)?;
        debug!(path = %path.display(), "chart image written");
        Ok(())
    }

    /// Read the configured font file and register it with the backend. The
    /// registry keeps the bytes for the rest of the process, so registration
    /// happens once; later renders reuse the face already installed.
    fn load_font(font: &FontConfig) -> Result<(), RenderError> {
        static REGISTERED: OnceLock<PathBuf> = OnceLock::new();
        if REGISTERED.get() == Some(&font.path) {
            return Ok(());
        }
        let bytes = fs::read(&font.path).map_err(|source| RenderError::FontRead {
            path: font.path.clone(),
            source,
        })?;
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        register_font(FONT_FAMILY, FontStyle::Normal, bytes).map_err(|_| {
            RenderError::FontRegister {
                path: font.path.clone(),
            }
        })?;
        let _ = REGISTERED.set(font.path.clone());
        Ok(())
    }

    fn draw_series(
        root: &Canvas,
        frame: &Frame,
        dataset: &Dataset,
        style: &Style,
    ) -> Result<(), RenderError> {
        let positions = dataset.axis().positions();
        for (i, series) in dataset.series().iter().enumerate() {
            let stroke = &style.series[i % style.series.len()];
            for run in series.segments() {
                let points: Vec<(f64, f64)> = run
                    .iter()
                    .map(|&(idx, v)| frame.map(positions[idx], v))
                    .collect();
                Self::stroke_polyline(root, &points, stroke, style)?;
            }
        }
        Ok(())
    }

    fn draw_period_rules(
        root: &Canvas,
        frame: &Frame,
        dataset: &Dataset,
        style: &Style,
    ) -> Result<(), RenderError> {
        for tick in dataset.axis().ticks() {
            let x = frame.x_px(tick.position);
            let points = [(x, frame.top), (x, frame.bottom)];
            Self::stroke_polyline(root, &points, &style.rule, style)?;
        }
        Ok(())
    }

    fn draw_annotation(root: &Canvas, frame: &Frame, style: &Style) -> Result<(), RenderError> {
        let ann = &style.annotation;
        let shape = shape_style(&ann.stroke, style);

        let bx = frame.x_px(ann.at.0);
        let by = frame.y_px(ann.at.1);
        let y_hi = frame.y_px(ann.at.1 + ann.span / 2.0);
        let y_lo = frame.y_px(ann.at.1 - ann.span / 2.0);
        let arm = style.px(ann.arm_pt);

        // Square bracket opening toward the label.
        let bracket: Vec<(i32, i32)> = [(bx + arm, y_hi), (bx, y_hi), (bx, y_lo), (bx + arm, y_lo)]
            .iter()
            .map(|&(x, y)| (x.round() as i32, y.round() as i32))
            .collect();
        root.draw(&PathElement::new(bracket, shape))
            .map_err(draw_err)?;

        let cx = frame.x_px(ann.text_at.0).round() as i32;
        let cy = frame.y_px(ann.text_at.1).round() as i32;
        let label_w = Self::draw_sub_text(
            root,
            cx,
            cy,
            &ann.base,
            &ann.subscript,
            style.px(style.label_size_pt),
        )?;

        // Connector from the label edge back to the bracket bar.
        let gap = style.px(2.0);
        let end_x = cx as f64 - label_w / 2.0 - gap;
        if end_x > bx {
            let connector = vec![
                (bx.round() as i32, by.round() as i32),
                (end_x.round() as i32, by.round() as i32),
            ];
            root.draw(&PathElement::new(connector, shape))
                .map_err(draw_err)?;
        }
        Ok(())
    }

    fn draw_axes(
        root: &Canvas,
        frame: &Frame,
        dataset: &Dataset,
        style: &Style,
    ) -> Result<(), RenderError> {
        let spine = shape_style(&style.spine, style);
        let left = frame.left.round() as i32;
        let right = frame.right.round() as i32;
        let top = frame.top.round() as i32;
        let bottom = frame.bottom.round() as i32;

        // Left and bottom spines only; the top and right frame lines are
        // deliberately absent.
        root.draw(&PathElement::new(vec![(left, top), (left, bottom)], spine))
            .map_err(draw_err)?;
        root.draw(&PathElement::new(
            vec![(left, bottom), (right, bottom)],
            spine,
        ))
        .map_err(draw_err)?;

        let tick_len = style.px(style.tick_len_pt);
        let label_px = style.px(style.label_size_pt);

        // Period ticks with composed subscript labels.
        for tick in dataset.axis().ticks() {
            let x = frame.x_px(tick.position).round() as i32;
            root.draw(&PathElement::new(
                vec![(x, bottom), (x, (frame.bottom + tick_len).round() as i32)],
                spine,
            ))
            .map_err(draw_err)?;
            let cy = (frame.bottom + tick_len + label_px * 0.7).round() as i32;
            Self::draw_sub_text(root, x, cy, &tick.base, &tick.subscript, label_px)?;
        }

        // Outcome ticks keep their marks but carry no labels; the vertical
        // axis is illustrative, not quantitative.
        let step = nice_step(frame.y_max - frame.y_min, 8);
        let mut v = (frame.y_min / step).ceil() * step;
        while v <= frame.y_max {
            let y = frame.y_px(v).round() as i32;
            root.draw(&PathElement::new(
                vec![((frame.left - tick_len).round() as i32, y), (left, y)],
                spine,
            ))
            .map_err(draw_err)?;
            v += step;
        }

        // Axis titles.
        let axis_px = style.px(style.axis_label_size_pt);
        let title_style = text_style(axis_px).pos(Pos::new(HPos::Center, VPos::Top));
        let cx = ((frame.left + frame.right) / 2.0).round() as i32;
        let ty = (frame.bottom + tick_len + label_px * 2.2).round() as i32;
        root.draw(&Text::new(style.x_label.clone(), (cx, ty), title_style))
            .map_err(draw_err)?;

        // The vertical title reads bottom to top along the left margin.
        let (tw, _) = root
            .estimate_text_size(&style.y_label, &text_style(axis_px))
            .map_err(draw_err)?;
        let rotated = TextStyle::from(
            FontDesc::new(FontFamily::Name(FONT_FAMILY), axis_px, FontStyle::Normal)
                .transform(FontTransform::Rotate270),
        )
        .color(&INK);
        let ly = ((frame.top + frame.bottom) / 2.0 + tw as f64 / 2.0).round() as i32;
        let lx = (frame.left - tick_len - axis_px * 2.2).round() as i32;
        root.draw(&Text::new(style.y_label.clone(), (lx, ly), rotated))
            .map_err(draw_err)?;
        Ok(())
    }

    /// Draw `base` with a smaller, lowered `subscript` run, the pair centered
    /// horizontally on `cx` and vertically on `cy`. Returns the total width.
    fn draw_sub_text(
        root: &Canvas,
        cx: i32,
        cy: i32,
        base: &str,
        subscript: &str,
        size_px: f64,
    ) -> Result<f64, RenderError> {
        let main_style = text_style(size_px).pos(Pos::new(HPos::Left, VPos::Center));
        let sub_style =
            text_style(size_px * SUBSCRIPT_RATIO).pos(Pos::new(HPos::Left, VPos::Center));

        let (mw, mh) = root
            .estimate_text_size(base, &main_style)
            .map_err(draw_err)?;
        let (sw, _) = if subscript.is_empty() {
            (0, 0)
        } else {
            root.estimate_text_size(subscript, &sub_style)
                .map_err(draw_err)?
        };

        let total = (mw + sw) as f64;
        let x0 = cx - (total / 2.0).round() as i32;
        root.draw(&Text::new(base.to_string(), (x0, cy), main_style))
            .map_err(draw_err)?;
        if !subscript.is_empty() {
            let drop = (mh as f64 * SUBSCRIPT_DROP).round() as i32;
            root.draw(&Text::new(
                subscript.to_string(),
                (x0 + mw as i32, cy + drop),
                sub_style,
            ))
            .map_err(draw_err)?;
        }
        Ok(total)
    }

    fn stroke_polyline(
        root: &Canvas,
        points: &[(f64, f64)],
        stroke: &Stroke,
        style: &Style,
    ) -> Result<(), RenderError> {
        if points.len() < 2 {
            return Ok(());
        }
        let shape = shape_style(stroke, style);
        let runs = match stroke.dash {
            Some((dash_pt, gap_pt)) => dash_polyline(points, style.px(dash_pt), style.px(gap_pt)),
            None => vec![points.to_vec()],
        };
        for run in runs {
            let px: Vec<(i32, i32)> = run
                .iter()
                .map(|&(x, y)| (x.round() as i32, y.round() as i32))
                .collect();
            root.draw(&PathElement::new(px, shape)).map_err(draw_err)?;
        }
        Ok(())
    }
}

fn text_style(size_px: f64) -> TextStyle<'static> {
    TextStyle::from(FontDesc::new(
        FontFamily::Name(FONT_FAMILY),
        size_px,
        FontStyle::Normal,
    ))
    .color(&INK)
}

fn shape_style(stroke: &Stroke, style: &Style) -> ShapeStyle {
    let width = style.px(stroke.width_pt).round().max(1.0) as u32;
    ShapeStyle::from(&stroke.color.mix(stroke.alpha)).stroke_width(width)
}

fn draw_err<E>(err: DrawingAreaErrorKind<E>) -> RenderError
where
    E: std::error::Error + Send + Sync,
{
    RenderError::Draw(err.to_string())
}

fn expand_degenerate((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// Split a pixel-space polyline into dash runs of `dash` px separated by
/// `gap` px. A dash may continue across a vertex.
fn dash_polyline(points: &[(f64, f64)], dash: f64, gap: f64) -> Vec<Vec<(f64, f64)>> {
    if points.len() < 2 || dash <= 0.0 || gap <= 0.0 {
        return vec![points.to_vec()];
    }

    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = vec![points[0]];
    let mut pen_down = true;
    let mut remaining = dash;

    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        let mut len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        if len <= 0.0 {
            continue;
        }
        let (ux, uy) = ((x1 - x0) / len, (y1 - y0) / len);
        let (mut cx, mut cy) = (x0, y0);
        while len > 0.0 {
            let step = remaining.min(len);
            cx += ux * step;
            cy += uy * step;
            len -= step;
            remaining -= step;
            if pen_down {
                current.push((cx, cy));
            }
            if remaining <= 0.0 {
                if pen_down {
                    runs.push(std::mem::take(&mut current));
                    remaining = gap;
                } else {
                    current = vec![(cx, cy)];
                    remaining = dash;
                }
                pen_down = !pen_down;
            }
        }
    }
    if pen_down && current.len() > 1 {
        runs.push(current);
    }
    runs
}

/// Round a raw tick interval up to the nearest 1/2/5 multiple of a power
/// of ten.
fn nice_step(range: f64, target_steps: usize) -> f64 {
    const LADDER: [f64; 4] = [1.0, 2.0, 5.0, 10.0];
    let raw_step = range / target_steps as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;
    let nice = LADDER
        .into_iter()
        .find(|&rung| normalized <= rung)
        .unwrap_or(10.0);

    nice * magnitude
}
