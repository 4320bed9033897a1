//! End-to-end flood mapping pipeline: region, scene query, period
//! composites, despeckle, classification, hazard overlays and the layer
//! stack. Building the pipeline only issues the metadata requests it needs
//! for diagnostics (region lookup, scene counts); pixels are computed when a
//! layer is evaluated.
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::backend::Session;
use crate::core::expr::Image;
use crate::core::params::FloodParams;
use crate::core::processing::classify::{WaterMasks, classify};
use crate::core::processing::collection::{SceneQuery, filtered_scenes};
use crate::core::processing::despeckle::despeckle;
use crate::core::processing::hazard::{distance_to_flood, elevation, hazard_score};
use crate::core::processing::periods::{PeriodComposite, composite, count_scenes};
use crate::core::processing::region::{Boundary, resolve_region};
use crate::error::Result;
use crate::render::map::{MapLayer, MapView, VisParams};

pub const BOUNDARY_LAYER: &str = "Affected Region Boundary";
pub const GOOD_FILTER_LAYER: &str = "Good Filter";
pub const FLOOD_FILTER_LAYER: &str = "Flood Filter";
pub const FLOOD_WATER_LAYER: &str = "Flood Water";
pub const WATER_BODY_LAYER: &str = "Water Body";
pub const DISTANCE_LAYER: &str = "Distance from Flood";
pub const DEM_LAYER: &str = "DEM";
pub const HAZARD_LAYER: &str = "Flood Hazard Score";

const HEATMAP: [&str; 5] = ["red", "orange", "yellow", "lightgreen", "green"];
const DEM_PALETTE: [&str; 4] = ["green", "yellow", "red", "white"];

/// Everything the pipeline derived, with the ordered layer stack.
#[derive(Debug, Clone)]
pub struct FloodMap {
    pub params: FloodParams,
    pub boundary: Boundary,
    pub baseline: PeriodComposite,
    pub flood: PeriodComposite,
    pub baseline_scene_count: usize,
    pub flood_scene_count: usize,
    /// Despeckled baseline composite (dB)
    pub good_filter: Image,
    /// Despeckled flood composite (dB)
    pub flood_filter: Image,
    pub masks: WaterMasks,
    pub distance: Image,
    pub elevation: Image,
    pub hazard: Image,
    pub layers: Vec<MapLayer>,
    pub view: MapView,
}

impl FloodMap {
    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }
}

/// Runs every stage for `params` against `session`.
pub fn run_pipeline(session: &Session, params: &FloodParams) -> Result<FloodMap> {
    let start = Instant::now();
    params.validate()?;
    info!(
        "Flood mapping for {}: baseline {}, flood {}, threshold {} dB, despeckle {}",
        params.region, params.baseline, params.flood, params.threshold_db, params.despeckle
    );

    let boundary = resolve_region(session, params.region)?;
    let query = SceneQuery::default();
    let scenes = filtered_scenes(session.assets(), &boundary.features, &query);
    trace!("Scene query: {:?}", scenes);

    let baseline = composite(
        "baseline",
        &scenes,
        params.baseline,
        query.polarisation,
        &boundary.features,
    );
    let flood = composite(
        "flood",
        &scenes,
        params.flood,
        query.polarisation,
        &boundary.features,
    );
    let baseline_scene_count = count_scenes(session, &baseline)?;
    let flood_scene_count = count_scenes(session, &flood)?;

    let good_filter = despeckle(&baseline.image, params.despeckle);
    let flood_filter = despeckle(&flood.image, params.despeckle);
    let masks = classify(&good_filter, &flood_filter, params.threshold_db);

    let distance = distance_to_flood(
        &masks.flood,
        params.distance_neighborhood,
        &boundary.features,
    );
    let elevation = elevation(session.assets(), &boundary.features);
    let hazard = hazard_score(&masks.flood, &elevation);

    let layers = vec![
        MapLayer::features(
            BOUNDARY_LAYER,
            boundary.features.clone(),
            VisParams::palette(&["black"]),
        ),
        MapLayer::image(GOOD_FILTER_LAYER, good_filter.clone(), VisParams::range(-25.0, 0.0)),
        MapLayer::image(FLOOD_FILTER_LAYER, flood_filter.clone(), VisParams::range(-25.0, 0.0)),
        MapLayer::image(FLOOD_WATER_LAYER, masks.flood.clone(), VisParams::palette(&["red"])),
        MapLayer::image(WATER_BODY_LAYER, masks.water.clone(), VisParams::palette(&["yellow"])),
        MapLayer::image(
            DISTANCE_LAYER,
            distance.clone(),
            VisParams::range(0.0, 5000.0).with_palette(&HEATMAP),
        ),
        MapLayer::image(
            DEM_LAYER,
            elevation.clone(),
            VisParams::range(0.0, 100.0).with_palette(&DEM_PALETTE),
        )
        .hidden(),
        MapLayer::image(
            HAZARD_LAYER,
            hazard.clone(),
            VisParams::range(1.0, 15.0).with_palette(&HEATMAP),
        ),
    ];
    let view = MapView::fit(boundary.bounds());
    debug!(
        "Map view centre ({:.4}, {:.4}) zoom {}",
        view.center.0, view.center.1, view.zoom
    );
    info!(
        "Pipeline built {} layers in {:.2?}",
        layers.len(),
        start.elapsed()
    );

    Ok(FloodMap {
        params: params.clone(),
        boundary,
        baseline,
        flood,
        baseline_scene_count,
        flood_scene_count,
        good_filter,
        flood_filter,
        masks,
        distance,
        elevation,
        hazard,
        layers,
        view,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SessionConfig, synthetic};
    use crate::error::Error;
    use crate::types::{DespeckleMode, Region};
    use std::sync::Arc;

    fn session() -> Session {
        Session::initialize(Arc::new(synthetic::demo_backend()), SessionConfig::default()).unwrap()
    }

    #[test]
    fn layer_stack_order_and_visibility() {
        let map = run_pipeline(&session(), &FloodParams::default()).unwrap();
        assert_eq!(
            map.layer_names(),
            vec![
                BOUNDARY_LAYER,
                GOOD_FILTER_LAYER,
                FLOOD_FILTER_LAYER,
                FLOOD_WATER_LAYER,
                WATER_BODY_LAYER,
                DISTANCE_LAYER,
                DEM_LAYER,
                HAZARD_LAYER
            ]
        );
        assert!(!map.layer(DEM_LAYER).unwrap().shown);
        assert!(map.layers.iter().filter(|l| l.name != DEM_LAYER).all(|l| l.shown));
        assert_eq!(map.view.zoom, 5);
    }

    #[test]
    fn default_windows_find_scenes() {
        let map = run_pipeline(&session(), &FloodParams::default()).unwrap();
        // two ascending and one descending IW pass per window
        assert_eq!(map.baseline_scene_count, 3);
        assert_eq!(map.flood_scene_count, 3);
    }

    #[test]
    fn pass_through_uses_the_composites_directly() {
        let params = FloodParams {
            despeckle: DespeckleMode::PassThrough,
            ..FloodParams::default()
        };
        let map = run_pipeline(&session(), &params).unwrap();
        assert!(map.good_filter.same_node(&map.baseline.image));
        assert!(map.flood_filter.same_node(&map.flood.image));
    }

    #[test]
    fn invalid_params_are_rejected_before_any_request() {
        let mut params = FloodParams::default();
        params.baseline.end = params.baseline.start;
        assert!(matches!(
            run_pipeline(&session(), &params),
            Err(Error::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn unknown_region_builds_an_empty_map() {
        let params = FloodParams {
            region: Region::OtherLocation,
            ..FloodParams::default()
        };
        let map = run_pipeline(&session(), &params).unwrap();
        assert!(map.boundary.is_empty());
        assert_eq!(map.baseline_scene_count, 0);
        assert_eq!(map.view, MapView::default());
    }
}
