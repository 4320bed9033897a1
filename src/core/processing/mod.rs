//! Pipeline stages over the computation graph. Each stage only derives new
//! expressions; evaluation happens in the backend.
pub mod classify;
pub mod collection;
pub mod despeckle;
pub mod hazard;
pub mod periods;
pub mod pipeline;
pub mod region;

pub use pipeline::{FloodMap, run_pipeline};
