//! I/O layer: on-disk asset catalogs for the local backend, layer export and
//! the `writers` for GeoTIFF/JPEG outputs, world files and sidecars.
pub mod catalog;
pub use catalog::{load_catalog, read_tiff_f32, save_catalog};

pub mod export;
pub use export::{ExportOptions, ExportReport, export_layers};

pub mod writers;
