//! Map rendering: layer styling, palettes, compositing and resampling of the
//! rendered previews.
pub mod colorize;
pub mod map;
pub mod palette;
pub mod resize;

pub use map::{EvaluatedLayer, LayerSource, LayerStats, MapLayer, MapView, VisParams};
