//! Charts module - styling and static chart rendering

mod renderer;
mod style;

pub use renderer::{ChartRenderer, RenderError};
pub use style::{Annotation, FontConfig, Margins, Stroke, Style, DEFAULT_FONT_PATH};
