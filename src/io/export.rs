//! Writes an evaluated layer stack to a directory: one raster per layer with
//! world and projection files, the layer manifest and, for JPEG exports, a
//! composite preview of the visible layers.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::io::writers::jpeg::write_rgb_jpeg;
use crate::io::writers::metadata::{LayerEntry, MANIFEST_FILE, MapManifest, write_manifest};
use crate::io::writers::tiff::write_tiff_f32;
use crate::io::writers::worldfile::{WGS84_WKT, write_prj_file, write_world_file};
use crate::render::colorize::RgbaImage;
use crate::render::map::{EvaluatedLayer, composite};
use crate::render::palette::Rgb;
use crate::render::resize::{resize_rgb, scale_geotransform};
use crate::types::OutputFormat;

pub const COMPOSITE_FILE: &str = "map.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub format: OutputFormat,
    /// Long side of JPEG outputs; float rasters are always written at
    /// native resolution
    pub size: Option<usize>,
    pub include_hidden: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::TIFF,
            size: None,
            include_hidden: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
    pub composite: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

fn write_jpeg_with_world(
    path: &Path,
    image: &RgbaImage,
    background: Rgb,
    geotransform: [f64; 6],
    size: Option<usize>,
) -> Result<()> {
    let rgb = image.to_rgb(background);
    let out = resize_rgb(&rgb, image.width, image.height, size)?;
    write_rgb_jpeg(path, out.cols, out.rows, &out.data)?;
    let (sx, sy) = out.scale_from(image.width, image.height);
    write_world_file(path, scale_geotransform(geotransform, sx, sy))?;
    write_prj_file(path, WGS84_WKT)?;
    Ok(())
}

/// Exports `layers` into `dir`; `manifest` receives one entry per layer.
pub fn export_layers(
    dir: &Path,
    layers: &[EvaluatedLayer],
    mut manifest: MapManifest,
    options: &ExportOptions,
) -> Result<ExportReport> {
    if options.size == Some(0) {
        return Err(Error::ZeroSize { size: 0 });
    }
    std::fs::create_dir_all(dir)?;
    let mut report = ExportReport::default();
    let geotransform = manifest.geotransform;

    for layer in layers {
        let mut entry = LayerEntry {
            name: layer.name.clone(),
            file: None,
            shown: layer.shown,
            vis: layer.vis.clone(),
            stats: layer.stats,
        };
        if !layer.shown && !options.include_hidden {
            report.skipped += 1;
            manifest.layers.push(entry);
            continue;
        }
        if layer.stats.valid_pixels == 0 {
            warn!("Layer `{}` has no valid pixels, not written", layer.name);
            report.skipped += 1;
            manifest.layers.push(entry);
            continue;
        }

        let file = format!("{}.{}", layer.slug(), options.format.extension());
        let path = dir.join(&file);
        match options.format {
            OutputFormat::TIFF => {
                write_tiff_f32(&path, &layer.raster)?;
                write_world_file(&path, geotransform)?;
                write_prj_file(&path, WGS84_WKT)?;
            }
            OutputFormat::JPEG => {
                write_jpeg_with_world(
                    &path,
                    &layer.to_rgba()?,
                    Rgb::WHITE,
                    geotransform,
                    options.size,
                )?;
            }
        }
        info!("Wrote layer `{}` to {:?}", layer.name, path);
        entry.file = Some(file);
        manifest.layers.push(entry);
        report.written.push(path);
    }

    let preview = match options.format {
        OutputFormat::JPEG => composite(layers, None)?,
        OutputFormat::TIFF => None,
    };
    if let Some(canvas) = preview {
        let path = dir.join(COMPOSITE_FILE);
        write_jpeg_with_world(&path, &canvas, Rgb::WHITE, geotransform, options.size)?;
        info!("Wrote composite preview to {:?}", path);
        report.composite = Some(path);
    }

    write_manifest(dir, &manifest)?;
    report.manifest = Some(dir.join(MANIFEST_FILE));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expr::Image;
    use crate::core::params::FloodParams;
    use crate::core::raster::{GridSpec, Raster};
    use crate::io::writers::metadata::read_manifest;
    use crate::render::map::{MapLayer, MapView, VisParams};

    fn grid() -> GridSpec {
        GridSpec {
            west: 90.0,
            north: 27.0,
            pixel_size: 0.1,
            cols: 8,
            rows: 4,
        }
    }

    fn layers() -> Vec<EvaluatedLayer> {
        let red = VisParams::palette(&["red"]);
        let yellow = VisParams::palette(&["yellow"]);
        let water = MapLayer::image("Flood Water", Image::constant(1.0), red);
        let dem = MapLayer::image("DEM", Image::constant(0.0), VisParams::range(0.0, 100.0))
            .hidden();
        let empty = MapLayer::image("Water Body", Image::constant(1.0), yellow);
        vec![
            EvaluatedLayer::new(&water, Raster::filled(grid(), 1.0)),
            EvaluatedLayer::new(&dem, Raster::filled(grid(), 40.0)),
            EvaluatedLayer::new(&empty, Raster::masked(grid())),
        ]
    }

    fn manifest() -> MapManifest {
        MapManifest::new(&FloodParams::default(), grid(), MapView::default())
    }

    #[test]
    fn tiff_export_writes_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let report =
            export_layers(dir.path(), &layers(), manifest(), &ExportOptions::default()).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.skipped, 1);
        assert!(dir.path().join("flood_water.tiff").exists());
        assert!(dir.path().join("flood_water.tfw").exists());
        assert!(dir.path().join("dem.prj").exists());
        assert!(report.composite.is_none());

        let m = read_manifest(dir.path()).unwrap();
        assert_eq!(m.layers.len(), 3);
        assert_eq!(m.layers[2].file, None);
        assert_eq!(m.layers[0].file.as_deref(), Some("flood_water.tiff"));
    }

    #[test]
    fn jpeg_export_can_skip_hidden_layers() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ExportOptions {
            format: OutputFormat::JPEG,
            size: Some(4),
            include_hidden: false,
        };
        let report = export_layers(dir.path(), &layers(), manifest(), &opts).unwrap();
        assert_eq!(report.written, vec![dir.path().join("flood_water.jpg")]);
        assert_eq!(report.skipped, 2);
        assert!(dir.path().join("flood_water.jgw").exists());
        assert_eq!(report.composite, Some(dir.path().join(COMPOSITE_FILE)));

        let world: Vec<f64> = std::fs::read_to_string(dir.path().join("flood_water.jgw"))
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();
        approx::assert_abs_diff_eq!(world[0], 0.2, epsilon = 1e-9);
    }
}
