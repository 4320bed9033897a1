use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::params::FloodParams;
use crate::core::raster::GridSpec;
use crate::render::map::{LayerStats, MapView, VisParams};

use crate::error::Result;

pub const MANIFEST_FILE: &str = "layers.json";

/// One exported layer as listed in the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub name: String,
    /// File name relative to the manifest, when the layer was written
    pub file: Option<String>,
    pub shown: bool,
    pub vis: VisParams,
    pub stats: LayerStats,
}

/// Sidecar describing an exported layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapManifest {
    pub generator: String,
    pub generated_at: DateTime<Utc>,
    pub crs: String,
    pub geotransform: [f64; 6],
    pub grid: GridSpec,
    pub params: FloodParams,
    pub view: MapView,
    pub baseline_scenes: usize,
    pub flood_scenes: usize,
    pub layers: Vec<LayerEntry>,
}

impl MapManifest {
    pub fn new(params: &FloodParams, grid: GridSpec, view: MapView) -> Self {
        Self {
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            generated_at: Utc::now(),
            crs: "EPSG:4326".to_string(),
            geotransform: grid.geotransform(),
            grid,
            params: params.clone(),
            view,
            baseline_scenes: 0,
            flood_scenes: 0,
            layers: Vec::new(),
        }
    }
}

pub fn write_manifest(dir: &Path, manifest: &MapManifest) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
    info!("Created layer manifest: {:?}", path);
    Ok(())
}

pub fn read_manifest(dir: &Path) -> Result<MapManifest> {
    let content = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_survives_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let grid = GridSpec {
            west: 89.7,
            north: 28.2,
            pixel_size: 0.05,
            cols: 10,
            rows: 8,
        };
        let mut m = MapManifest::new(&FloodParams::default(), grid, MapView::default());
        m.layers.push(LayerEntry {
            name: "Flood Water".to_string(),
            file: Some("flood_water.tiff".to_string()),
            shown: true,
            vis: VisParams::palette(&["red"]),
            stats: LayerStats {
                valid_pixels: 3,
                min: Some(1.0),
                max: Some(1.0),
                mean: Some(1.0),
            },
        });
        write_manifest(dir.path(), &m).unwrap();
        let back = read_manifest(dir.path()).unwrap();
        assert_eq!(back, m);
        assert!(back.generator.starts_with("floodmap "));
    }
}
