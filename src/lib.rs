#![doc = r#"
floodmap: flood extent and flood hazard mapping from Sentinel-1 SAR backscatter.

The crate compares a dry-season baseline composite of Sentinel-1 VH backscatter
against a composite acquired during a flood, classifies newly flooded land and
permanent water with a dB threshold, and derives hazard overlays (distance from
flood, elevation, hazard score). It powers both the floodmap CLI and GUI, and can
be embedded in your own Rust applications.

All processing is expressed as a deferred computation graph ([`core::expr`]): the
pipeline only builds expressions, and a [`Backend`] evaluates them when a layer is
rendered. The bundled [`LocalBackend`] evaluates the graph in process over
`ndarray` rasters, either on the built-in synthetic dataset or on a catalog
directory of GeoTIFFs.

Stability
---------
The public library API is experimental in initial releases and may evolve.
Breaking changes can occur.

Add dependency
--------------
```toml
[dependencies]
floodmap = { version = "0.1", default-features = false }
```

Quick start: build and render the flood map
-------------------------------------------
```rust,no_run
use floodmap::{build_flood_map, demo_session, render_flood_map, FloodParams};

fn main() -> floodmap::Result<()> {
    let session = demo_session("flood-hazard-demo")?;
    let map = build_flood_map(&session, &FloodParams::default())?;
    let rendered = render_flood_map(&session, &map)?;
    for layer in &rendered.layers {
        println!("{}: {} valid pixels", layer.name, layer.stats.valid_pixels);
    }
    session.close();
    Ok(())
}
```

Export layers to GeoTIFF
------------------------
```rust,no_run
use std::path::Path;
use floodmap::{
    build_flood_map, catalog_session, export_flood_map, render_flood_map,
    ExportOptions, FloodParams, OutputFormat, Region,
};

fn main() -> floodmap::Result<()> {
    let session = catalog_session(Path::new("/data/assam_catalog"), "my-project")?;
    let params = FloodParams {
        region: Region::Assam,
        threshold_db: -19.0,
        ..FloodParams::default()
    };
    let map = build_flood_map(&session, &params)?;
    let rendered = render_flood_map(&session, &map)?;
    let report = export_flood_map(
        &map,
        &rendered,
        Path::new("/out/assam"),
        &ExportOptions { format: OutputFormat::TIFF, ..ExportOptions::default() },
    )?;
    println!("written={} skipped={}", report.written.len(), report.skipped);
    Ok(())
}
```

Working with the graph directly
-------------------------------
```rust
use floodmap::core::expr::{Collection, Filter};

let vh = Collection::load("COPERNICUS/S1_GRD")
    .filter(Filter::list_contains("transmitterReceiverPolarisation", "VH"))
    .select("VH")
    .mosaic();
// Nothing has been computed yet; the expression serialises to JSON.
assert!(vh.to_json().is_ok());
```

Error handling
--------------
All public functions return `floodmap::Result<T>`; match on `floodmap::Error` to
handle specific cases, e.g. authentication or missing assets.

```rust,no_run
use floodmap::{demo_session, Error};

match demo_session("") {
    Ok(session) => session.close(),
    Err(Error::Authentication { project, reason }) => eprintln!("{project}: {reason}"),
    Err(other) => eprintln!("Other error: {other}"),
}
```

Feature flags
-------------
- `gui`: builds the GUI module and the `floodmapUI` binary.
- `full`: enables a complete feature set for typical end-to-end workflows.

Useful modules
--------------
- [`api`]: high-level, ergonomic entry points.
- [`core`]: parameters, the computation graph and the pipeline stages.
- [`backend`]: the `Backend` trait, sessions and the local evaluator.
- [`render`]: palettes, layer styling and compositing.
- [`io`]: catalog loading and layer export.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod backend;
pub mod core;
pub mod error;
pub mod io;
pub mod render;
pub mod types;

// GUI module (only available with gui feature)
#[cfg(feature = "gui")]
pub mod gui;

// Curated public API surface
// Types
pub use crate::core::params::{DateRange, FloodParams};
pub use error::{Error, Result};
pub use types::{DespeckleMode, InstrumentMode, OrbitPass, OutputFormat, Polarization, Region};

// Backends
pub use backend::{AssetCatalog, Backend, LocalBackend, Scene, Session, SessionConfig};

// Pipeline output and rendering
pub use crate::core::processing::FloodMap;
pub use render::{EvaluatedLayer, LayerStats, MapLayer, MapView, VisParams};

// Catalog and export helpers
pub use io::{ExportOptions, ExportReport, load_catalog, save_catalog};

// High-level API re-exports
pub use api::{
    RenderedMap, build_flood_map, catalog_session, demo_session, evaluate_layer,
    export_flood_map, render_flood_map,
};
