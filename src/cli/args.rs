use clap::Parser;
use std::path::PathBuf;

use floodmap::types::OutputFormat;
use floodmap::{DespeckleMode, Region};

#[derive(Parser)]
#[command(
    name = "floodmap",
    version,
    about = "Flood extent and flood hazard mapping from Sentinel-1 SAR data"
)]
pub struct CliArgs {
    /// Parameters JSON (as saved by the GUI); flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Region to map
    #[arg(short, long, value_enum)]
    pub region: Option<Region>,

    /// Start of the dry-season baseline window (YYYY-MM-DD)
    #[arg(long)]
    pub good_date: Option<String>,

    /// End of the baseline window, exclusive (YYYY-MM-DD)
    #[arg(long)]
    pub flood_date: Option<String>,

    /// Start of the flood window (YYYY-MM-DD)
    #[arg(long)]
    pub flood_start: Option<String>,

    /// End of the flood window, exclusive (YYYY-MM-DD)
    #[arg(long)]
    pub flood_end: Option<String>,

    /// Water threshold in dB
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Despeckle filter applied to both composites
    #[arg(long, value_enum)]
    pub despeckle: Option<DespeckleMode>,

    /// Catalog directory with catalog.json and GeoTIFF rasters
    #[arg(long, conflicts_with = "demo")]
    pub catalog: Option<PathBuf>,

    /// Use the built-in synthetic dataset (default when no catalog is given)
    #[arg(long, default_value_t = false)]
    pub demo: bool,

    /// Write the synthetic dataset as a catalog directory and exit
    #[arg(long, conflicts_with = "catalog")]
    pub save_catalog: Option<PathBuf>,

    /// Project id used to authenticate and to resolve project assets
    #[arg(short, long, default_value = floodmap::backend::DEFAULT_PROJECT)]
    pub project: String,

    /// Output directory for the exported layers
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format (tiff or jpeg)
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::TIFF)]
    pub format: OutputFormat,

    /// Long side of JPEG outputs. Options:
    /// - Custom: any positive integer (e.g., 1024)
    /// - Original: "original" (no scaling)
    #[arg(long, default_value = "original")]
    pub size: String,

    /// Skip layers that are hidden by default when exporting
    #[arg(long, default_value_t = false)]
    pub visible_only: bool,

    /// Write the computation graph of every layer as JSON
    #[arg(long)]
    pub graph: Option<PathBuf>,

    /// Enable logging (RUST_LOG overrides the default `debug` level)
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
