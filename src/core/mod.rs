//! Core building blocks: flood mapping parameters, the deferred computation
//! graph, in-memory rasters and the pipeline stages built on them. These are
//! consumed by the high-level `api` module.
pub mod expr;
pub mod params;
pub mod processing;
pub mod raster;
