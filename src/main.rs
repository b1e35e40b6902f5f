//! did_graph - renders the difference-in-differences illustration chart.
//!
//! One-shot authoring tool: builds the literal DID dataset, renders it with
//! the default style, writes the PNG, then hands the file to the system
//! image viewer.

use anyhow::{Context, Result};
use did_graph::charts::{ChartRenderer, Style};
use did_graph::data::Dataset;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Fixed output location; overwritten on every run.
const OUTPUT_PATH: &str = "target/plots/did_graph.png";

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dataset = Dataset::did_illustration();
    let style = Style::default();

    let out = Path::new(OUTPUT_PATH);
    ChartRenderer::render_to_file(&dataset, &style, out)
        .with_context(|| format!("rendering chart to {}", out.display()))?;
    info!(path = %out.display(), "chart written");

    // Hand the finished chart to the default image viewer. On a headless
    // box there is nothing to talk to; the artifact is already on disk, so
    // this stays a warning.
    if let Err(err) = open::that(out) {
        warn!(%err, "could not open image viewer");
    }

    Ok(())
}
