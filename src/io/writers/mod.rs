//! Output writers: float GeoTIFF, JPEG, world files, the layer manifest and
//! the computation graph.
pub mod graph;
pub mod jpeg;
pub mod metadata;
pub mod tiff;
pub mod worldfile;
