//! did_graph - difference-in-differences illustration chart renderer.
//!
//! Renders one deterministic diagnostic chart: an observed treated trend,
//! the control trend, and the counterfactual it implies, across a
//! pre/treatment/post timeline, written to a PNG file.

pub mod charts;
pub mod data;
