//! High-level, ergonomic library API: open a session on the demo dataset or a
//! catalog directory, build the flood map, evaluate and composite its layers,
//! and export them. Prefer these entrypoints over the low-level processing
//! modules when integrating floodmap.
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::backend::{Session, SessionConfig, synthetic};
use crate::core::expr::Image;
use crate::core::params::FloodParams;
use crate::core::processing::{FloodMap, run_pipeline};
use crate::error::{Error, Result};
use crate::io::catalog::load_catalog;
use crate::io::export::{ExportOptions, ExportReport, export_layers};
use crate::io::writers::metadata::MapManifest;
use crate::render::colorize::{RgbaImage, outline};
use crate::render::map::{EvaluatedLayer, LayerSource, MapLayer, MapView, composite};

/// Session on the built-in synthetic dataset.
pub fn demo_session(project: &str) -> Result<Session> {
    let config = SessionConfig::for_project(project);
    let backend = synthetic::demo_backend_for(&config.assets);
    Session::initialize(Arc::new(backend), config)
}

/// Session on a catalog directory written by [`crate::io::save_catalog`] or
/// by hand.
pub fn catalog_session(dir: &Path, project: &str) -> Result<Session> {
    let backend = load_catalog(dir)?;
    Session::initialize(Arc::new(backend), SessionConfig::for_project(project))
}

pub fn build_flood_map(session: &Session, params: &FloodParams) -> Result<FloodMap> {
    run_pipeline(session, params)
}

/// Computes the pixels of one layer. Feature layers render as the outline of
/// their geometry.
pub fn evaluate_layer(session: &Session, layer: &MapLayer) -> Result<EvaluatedLayer> {
    let start = Instant::now();
    let raster = match &layer.source {
        LayerSource::Image(image) => session.backend().compute_pixels(image)?,
        LayerSource::Features(features) => {
            let fill = Image::constant(1.0).clip(features);
            outline(&session.backend().compute_pixels(&fill)?)
        }
    };
    debug!(
        "Evaluated layer `{}` ({} valid pixels) in {:.2?}",
        layer.name,
        raster.valid_count(),
        start.elapsed()
    );
    Ok(EvaluatedLayer::new(layer, raster))
}

/// Evaluated layer stack with the viewport it should be shown in.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub layers: Vec<EvaluatedLayer>,
    pub view: MapView,
}

impl RenderedMap {
    pub fn layer(&self, name: &str) -> Option<&EvaluatedLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Composite of the layers selected by `visible`, or of the default
    /// visible layers.
    pub fn composite(&self, visible: Option<&[bool]>) -> Result<Option<RgbaImage>> {
        composite(&self.layers, visible)
    }
}

/// Evaluates every layer of `map`; layers are computed in parallel.
pub fn render_flood_map(session: &Session, map: &FloodMap) -> Result<RenderedMap> {
    let start = Instant::now();
    let layers = map
        .layers
        .par_iter()
        .map(|layer| evaluate_layer(session, layer))
        .collect::<Result<Vec<_>>>()?;
    info!("Rendered {} layers in {:.2?}", layers.len(), start.elapsed());
    Ok(RenderedMap {
        layers,
        view: map.view,
    })
}

pub fn export_flood_map(
    map: &FloodMap,
    rendered: &RenderedMap,
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<ExportReport> {
    let grid = rendered
        .layers
        .first()
        .map(|l| l.raster.grid)
        .ok_or_else(|| Error::Processing("no layers to export".to_string()))?;
    let mut manifest = MapManifest::new(&map.params, grid, rendered.view);
    manifest.baseline_scenes = map.baseline_scene_count;
    manifest.flood_scenes = map.flood_scene_count;
    let report = export_layers(output_dir, &rendered.layers, manifest, options)?;
    info!(
        "Exported {} layers to {:?} ({} skipped)",
        report.written.len(),
        output_dir,
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DEFAULT_PROJECT;
    use crate::core::processing::pipeline::{BOUNDARY_LAYER, FLOOD_WATER_LAYER};

    #[test]
    fn boundary_renders_as_outline() {
        let session = demo_session(DEFAULT_PROJECT).unwrap();
        let map = build_flood_map(&session, &FloodParams::default()).unwrap();
        let layer = evaluate_layer(&session, map.layer(BOUNDARY_LAYER).unwrap()).unwrap();
        let fill = session
            .backend()
            .compute_pixels(&Image::constant(1.0).clip(&map.boundary.features))
            .unwrap();
        assert!(layer.stats.valid_pixels > 0);
        assert!(layer.stats.valid_pixels < fill.valid_count());
        assert_eq!(layer.stats.max, Some(1.0));
    }

    #[test]
    fn rendered_stack_keeps_layer_order() {
        let session = demo_session(DEFAULT_PROJECT).unwrap();
        let map = build_flood_map(&session, &FloodParams::default()).unwrap();
        let rendered = render_flood_map(&session, &map).unwrap();
        let names: Vec<&str> = rendered.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, map.layer_names());
        assert!(rendered.layer(FLOOD_WATER_LAYER).unwrap().stats.valid_pixels > 0);

        let only_first: Vec<bool> = (0..rendered.layers.len()).map(|i| i == 0).collect();
        let img = rendered.composite(Some(&only_first)).unwrap().unwrap();
        assert_eq!((img.width, img.height), (128, 84));
    }

    #[test]
    fn unknown_project_is_rejected_for_catalogs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = synthetic::demo_backend().allow_project("flood-hazard-demo");
        crate::io::save_catalog(dir.path(), &backend).unwrap();
        assert!(catalog_session(dir.path(), DEFAULT_PROJECT).is_ok());
        assert!(matches!(
            catalog_session(dir.path(), "someone-else"),
            Err(Error::Authentication { .. })
        ));
    }
}
