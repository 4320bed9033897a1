use crate::backend::AssetCatalog;
use crate::core::expr::{Features, Image};

/// Squared pixel distance to the nearest flooded pixel within
/// `neighborhood` pixels, clipped to the boundary.
pub fn distance_to_flood(flood_mask: &Image, neighborhood: u32, boundary: &Features) -> Image {
    flood_mask.fast_distance_transform(neighborhood).clip(boundary)
}

/// Elevation model clipped to the boundary.
pub fn elevation(assets: &AssetCatalog, boundary: &Features) -> Image {
    Image::load(&assets.elevation).clip(boundary)
}

/// Flood mask plus elevation. Defined only where the flood mask is.
pub fn hazard_score(flood_mask: &Image, elevation: &Image) -> Image {
    flood_mask.add(elevation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, Feature, LocalBackend};
    use crate::core::expr::PropertyValue;
    use crate::core::raster::{GridSpec, Raster};
    use geo::{LineString, MultiPolygon, Polygon};

    fn setup() -> (LocalBackend, AssetCatalog, Features) {
        let grid = GridSpec {
            west: 0.0,
            north: 3.0,
            pixel_size: 1.0,
            cols: 5,
            rows: 3,
        };
        let assets = AssetCatalog::for_project("t");
        let everything = Feature {
            properties: [("shapeName".to_string(), PropertyValue::from("All"))].into(),
            geometry: MultiPolygon::new(vec![Polygon::new(
                LineString::from(vec![(0.0, 0.0), (5.0, 0.0), (5.0, 3.0), (0.0, 3.0), (0.0, 0.0)]),
                vec![],
            )]),
        };
        let mut mask = Raster::masked(grid);
        mask.data[[1, 0]] = 1.0;
        let b = LocalBackend::new(grid)
            .with_features(&assets.boundaries, vec![everything])
            .with_image("flood", mask)
            .with_image(&assets.elevation, Raster::filled(grid, 7.0));
        let boundary = Features::load(&assets.boundaries);
        (b, assets, boundary)
    }

    #[test]
    fn distance_is_limited_to_the_neighborhood() {
        let (b, _, boundary) = setup();
        let d = b
            .compute_pixels(&distance_to_flood(&Image::load("flood"), 2, &boundary))
            .unwrap();
        assert_eq!(d.get(1, 0), 0.0);
        assert_eq!(d.get(1, 1), 1.0);
        assert_eq!(d.get(0, 1), 2.0);
        assert_eq!(d.get(1, 2), 4.0);
        assert!(d.get(1, 3).is_nan());
    }

    #[test]
    fn hazard_exists_only_on_flooded_pixels() {
        let (b, assets, boundary) = setup();
        let dem = elevation(&assets, &boundary);
        let h = b
            .compute_pixels(&hazard_score(&Image::load("flood"), &dem))
            .unwrap();
        assert_eq!(h.valid_count(), 1);
        assert_eq!(h.get(1, 0), 8.0);
    }
}
