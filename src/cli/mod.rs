//! Command Line Interface (CLI) layer for floodmap.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`): resolve parameters from a config
//! file and flags, open a session, build and render the flood map, then
//! print a layer summary and optionally export layers and the graph.
//!
//! If you are embedding floodmap into another application, prefer using
//! the high-level `floodmap::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
