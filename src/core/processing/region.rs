use geo::{BoundingRect, MultiPolygon, Rect};
use tracing::{debug, info, warn};

use crate::backend::{AssetCatalog, Session, union_geometry};
use crate::core::expr::Features;
use crate::error::Result;
use crate::types::Region;

/// The selected region: the feature expression every layer is clipped to,
/// plus its resolved geometry.
#[derive(Debug, Clone)]
pub struct Boundary {
    pub region: Region,
    pub features: Features,
    pub geometry: MultiPolygon<f64>,
    pub feature_count: usize,
}

impl Boundary {
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

/// Boundary features whose name property equals the region's name.
pub fn region_features(assets: &AssetCatalog, region: Region) -> Features {
    Features::load(&assets.boundaries)
        .filter_metadata(&assets.boundary_name_property, region.shape_name())
}

/// Looks the region up in the boundary dataset. Zero matches is not an
/// error: the boundary comes back empty and every clipped layer is blank.
pub fn resolve_region(session: &Session, region: Region) -> Result<Boundary> {
    let features = region_features(session.assets(), region);
    let matches = session.backend().fetch_features(&features)?;
    let geometry = union_geometry(&matches);

    if matches.is_empty() {
        warn!(
            "No feature named `{}` in {}; all layers will be empty",
            region.shape_name(),
            session.assets().boundaries
        );
    } else {
        info!(
            "Resolved region {} to {} feature(s), {} polygon(s)",
            region,
            matches.len(),
            geometry.0.len()
        );
    }
    debug!("Region bounds: {:?}", geometry.bounding_rect());

    Ok(Boundary {
        region,
        features,
        geometry,
        feature_count: matches.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SessionConfig, synthetic};
    use std::sync::Arc;

    fn session() -> Session {
        Session::initialize(Arc::new(synthetic::demo_backend()), SessionConfig::default()).unwrap()
    }

    #[test]
    fn assam_resolves_to_a_polygon() {
        let b = resolve_region(&session(), Region::Assam).unwrap();
        assert!(!b.is_empty());
        assert_eq!(b.feature_count, 1);
        let r = b.bounds().unwrap();
        assert!(r.min().x > 89.0 && r.max().x < 96.5);
    }

    #[test]
    fn unmatched_region_is_empty_not_an_error() {
        let b = resolve_region(&session(), Region::OtherLocation).unwrap();
        assert!(b.is_empty());
        assert!(b.bounds().is_none());
    }
}
