use crate::core::expr::Image;

/// Self-masked change and persistence masks.
#[derive(Debug, Clone)]
pub struct WaterMasks {
    /// Dry in the baseline, water-like during the flood
    pub flood: Image,
    /// Water-like in both windows
    pub water: Image,
}

fn self_mask(img: &Image) -> Image {
    img.update_mask(&img.eq(1.0))
}

/// `baseline > t AND flood < t`, masked where false.
pub fn flood_mask(baseline: &Image, flood: &Image, threshold_db: f64) -> Image {
    self_mask(&baseline.gt(threshold_db).and(flood.lt(threshold_db)))
}

/// `baseline < t AND flood < t`, masked where false.
pub fn water_mask(baseline: &Image, flood: &Image, threshold_db: f64) -> Image {
    self_mask(&baseline.lt(threshold_db).and(flood.lt(threshold_db)))
}

pub fn classify(baseline: &Image, flood: &Image, threshold_db: f64) -> WaterMasks {
    WaterMasks {
        flood: flood_mask(baseline, flood, threshold_db),
        water: water_mask(baseline, flood, threshold_db),
    }
}
