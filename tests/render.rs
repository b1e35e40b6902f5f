//! End-to-end render tests for the DID chart.
//!
//! Tests that rasterize text need a real TTF face on the host; they probe a
//! few common locations and skip (with a note) when none is present. The
//! failure-path tests run everywhere.

use std::path::{Path, PathBuf};

use did_graph::charts::{ChartRenderer, RenderError, Style};
use did_graph::data::Dataset;
use image::RgbImage;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

fn usable_font() -> Option<PathBuf> {
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn test_style(font: PathBuf) -> Style {
    let mut style = Style::default();
    style.font.path = font;
    style
}

fn render_default() -> Option<RgbImage> {
    let font = usable_font()?;
    let dataset = Dataset::did_illustration();
    let style = test_style(font);
    Some(ChartRenderer::render(&dataset, &style).expect("render succeeds"))
}

/// A pixel that can only come from the solid navy treated series.
fn is_navy(px: &image::Rgb<u8>) -> bool {
    px[2] >= 100 && px[0] <= 60 && px[1] <= 60
}

/// A pixel that can only come from a purple series.
fn is_purple(px: &image::Rgb<u8>) -> bool {
    px[0] >= 100 && px[2] >= 100 && px[1] <= 60
}

#[test]
fn output_has_configured_pixel_dimensions() {
    let Some(img) = render_default() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    assert_eq!((img.width(), img.height()), (2400, 1800));
    assert!((img.width() as f64 / img.height() as f64 - 4.0 / 3.0).abs() < 1e-9);
}

#[test]
fn dpi_scales_the_raster() {
    let Some(font) = usable_font() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    let dataset = Dataset::did_illustration();
    let mut style = test_style(font);
    style.dpi = 100;
    let img = ChartRenderer::render(&dataset, &style).expect("render succeeds");
    assert_eq!((img.width(), img.height()), (800, 600));
}

#[test]
fn padding_region_has_no_series_pixels() {
    let Some(img) = render_default() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    // Columns strictly between the left spine and the first labeled period
    // (x = -1 maps near column 702): the sentinel endpoints must leave this
    // region free of any series line.
    for x in 320..680 {
        for y in 0..img.height() {
            let px = img.get_pixel(x, y);
            assert!(
                !is_navy(px) && !is_purple(px),
                "series pixel at ({x}, {y}): {px:?}"
            );
        }
    }
}

#[test]
fn series_are_drawn_between_the_labeled_periods() {
    let Some(img) = render_default() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    // Around the treatment period (x = 0 maps near column 1230) both the
    // navy treated line and a purple line must be present.
    let mut navy = false;
    let mut purple = false;
    for x in 1200..1260 {
        for y in 0..img.height() {
            let px = img.get_pixel(x, y);
            navy |= is_navy(px);
            purple |= is_purple(px);
        }
    }
    assert!(navy, "treated series missing at the treatment period");
    assert!(purple, "control series missing at the treatment period");
}

#[test]
fn period_boundaries_carry_dotted_rules() {
    let Some(img) = render_default() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    // The 0.6-alpha gray rule over white blends to roughly (179,179,179).
    for center in [702u32, 1230, 1758] {
        let mut found = false;
        for x in center.saturating_sub(4)..center + 4 {
            for y in 0..img.height() {
                let px = img.get_pixel(x, y);
                let gray = px[0].abs_diff(px[1]) <= 8 && px[1].abs_diff(px[2]) <= 8;
                if gray && px[0] >= 140 && px[0] <= 220 {
                    found = true;
                }
            }
        }
        assert!(found, "no rule near column {center}");
    }
}

#[test]
fn top_and_right_borders_stay_blank() {
    let Some(img) = render_default() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    for y in 0..190 {
        for x in 0..img.width() {
            assert_eq!(img.get_pixel(x, y), &image::Rgb([255, 255, 255]));
        }
    }
    for x in 2200..img.width() {
        for y in 0..img.height() {
            assert_eq!(img.get_pixel(x, y), &image::Rgb([255, 255, 255]));
        }
    }
}

#[test]
fn rerendering_overwrites_deterministically() {
    let Some(font) = usable_font() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("plots").join("did_graph.png");
    let dataset = Dataset::did_illustration();
    let style = test_style(font);

    ChartRenderer::render_to_file(&dataset, &style, &out).expect("first render");
    assert!(out.exists());
    let first = std::fs::read(&out).expect("read first");

    ChartRenderer::render_to_file(&dataset, &style, &out).expect("second render");
    let second = std::fs::read(&out).expect("read second");
    assert_eq!(first, second, "re-render must be byte-identical");
}

#[test]
fn missing_font_fails_before_any_output_exists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("did_graph.png");
    let dataset = Dataset::did_illustration();
    let mut style = Style::default();
    style.font.path = dir.path().join("no-such-face.ttf");

    let err = ChartRenderer::render_to_file(&dataset, &style, &out).unwrap_err();
    assert!(matches!(err, RenderError::FontRead { .. }), "{err}");
    assert!(!out.exists(), "no partial output may be left behind");
}

#[test]
fn bad_font_path_still_fails_after_a_successful_render() {
    // The face registry is filled on the first successful render; a later
    // call pointing at a missing file must still hit the read error instead
    // of silently reusing the registered face.
    let Some(font) = usable_font() else {
        eprintln!("no usable TTF face found; skipping");
        return;
    };
    let dir = tempfile::tempdir().expect("tempdir");
    let dataset = Dataset::did_illustration();

    let good = dir.path().join("good.png");
    ChartRenderer::render_to_file(&dataset, &test_style(font.clone()), &good).expect("render");

    let bad = dir.path().join("bad.png");
    let mut style = test_style(font);
    style.font.path = dir.path().join("no-such-face.ttf");
    let err = ChartRenderer::render_to_file(&dataset, &style, &bad).unwrap_err();
    assert!(matches!(err, RenderError::FontRead { .. }), "{err}");
    assert!(!bad.exists(), "no partial output may be left behind");
}

#[test]
fn font_probe_paths_are_absolute() {
    // Guard against a relative candidate sneaking in and the probe passing
    // or failing depending on the working directory.
    for candidate in FONT_CANDIDATES {
        assert!(Path::new(candidate).is_absolute());
    }
}
