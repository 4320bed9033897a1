//! Deterministic demo dataset for the local backend.
//!
//! Builds a small lon/lat grid over the Brahmaputra valley with a handful of
//! first-level boundaries, a VV/VH Sentinel-1-like scene stack for the 2024
//! monsoon and an elevation model. Backscatter carries multiplicative gamma
//! speckle from a seeded ChaCha generator, so every run produces the same
//! pixels. Some scenes are deliberately off-spec (wrong mode, wrong
//! polarisation, outside the region) and must be dropped by the collection
//! filters.
use chrono::NaiveDate;
use geo::{LineString, MultiPolygon, Polygon};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::{AssetCatalog, DEFAULT_PROJECT, Feature, LocalBackend, Scene};
use crate::core::expr::PropertyValue;
use crate::core::raster::{GridSpec, Raster};
use crate::types::{InstrumentMode, OrbitPass, Polarization};

const LAND_VH_DB: f32 = -12.0;
const WATER_VH_DB: f32 = -24.0;
const FLOODED_VH_DB: f32 = -23.0;
/// VV sits this many dB above VH over every surface
const VV_OFFSET_DB: f32 = 6.0;
const RIVER_HALF_WIDTH: f64 = 0.12;
/// Half-width (degrees) of the floodplain around the river
const VALLEY_HALF_WIDTH: f64 = 0.6;
const SPECKLE_LOOKS: usize = 4;

/// Brahmaputra centreline (lon, lat).
const RIVER: [(f64, f64); 6] = [
    (89.7, 26.05),
    (90.8, 26.2),
    (91.8, 26.15),
    (92.9, 26.6),
    (94.2, 26.95),
    (96.0, 27.75),
];

const ASSAM: [(f64, f64); 17] = [
    (89.75, 26.0),
    (90.5, 26.5),
    (92.0, 26.9),
    (93.5, 27.0),
    (95.2, 27.8),
    (95.95, 27.9),
    (95.95, 27.2),
    (95.4, 26.9),
    (94.5, 26.2),
    (93.8, 25.6),
    (93.0, 25.0),
    (92.6, 24.3),
    (92.2, 24.3),
    (92.0, 25.1),
    (91.0, 25.7),
    (90.1, 25.8),
    (89.75, 26.0),
];

const KAMRUP: [(f64, f64); 5] = [
    (91.0, 26.0),
    (92.0, 26.0),
    (92.0, 26.6),
    (91.0, 26.6),
    (91.0, 26.0),
];

const DIBRUGARH: [(f64, f64); 5] = [
    (94.5, 27.0),
    (95.5, 27.0),
    (95.5, 27.6),
    (94.5, 27.6),
    (94.5, 27.0),
];

const MEGHALAYA: [(f64, f64); 6] = [
    (89.8, 25.75),
    (90.1, 25.15),
    (92.3, 25.05),
    (92.0, 25.7),
    (91.0, 25.75),
    (89.8, 25.75),
];

const ARUNACHAL: [(f64, f64); 6] = [
    (91.6, 26.95),
    (93.5, 27.1),
    (95.9, 28.15),
    (92.0, 28.15),
    (91.6, 27.6),
    (91.6, 26.95),
];

/// Grid covering the Assam bounding box.
pub fn demo_grid() -> GridSpec {
    GridSpec {
        west: 89.7,
        north: 28.2,
        pixel_size: 6.3 / 128.0,
        cols: 128,
        rows: 84,
    }
}

/// Demo backend registered under the default project.
pub fn demo_backend() -> LocalBackend {
    demo_backend_for(&AssetCatalog::for_project(DEFAULT_PROJECT))
}

/// Demo backend whose datasets live at the paths of `assets`.
pub fn demo_backend_for(assets: &AssetCatalog) -> LocalBackend {
    let grid = demo_grid();
    let terrain = Terrain::new(grid);
    let states = vec![
        state(&assets.boundary_name_property, "Assam", &ASSAM),
        state(&assets.boundary_name_property, "Meghalaya", &MEGHALAYA),
        state(&assets.boundary_name_property, "Arunachal Pradesh", &ARUNACHAL),
    ];
    let districts = vec![
        state("shapeName", "Kamrup", &KAMRUP),
        state("shapeName", "Dibrugarh", &DIBRUGARH),
    ];

    let scenes = demo_scenes()
        .iter()
        .map(|spec| spec.render(&terrain))
        .collect::<Vec<_>>();
    debug!("Demo dataset: {} scenes on {}", scenes.len(), grid.describe());

    LocalBackend::new(grid)
        .with_features(&assets.boundaries, states.clone())
        .with_features(&assets.provinces, states)
        .with_features(&assets.districts, districts)
        .with_scenes(&assets.scenes, scenes)
        .with_image(&assets.elevation, terrain.elevation())
}

fn ring(points: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(points.to_vec()), vec![])
}

fn state(property: &str, name: &str, points: &[(f64, f64)]) -> Feature {
    Feature {
        properties: [(property.to_string(), PropertyValue::from(name))].into(),
        geometry: MultiPolygon::new(vec![ring(points)]),
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Distance in degrees from a point to a polyline.
fn polyline_distance(x: f64, y: f64, line: &[(f64, f64)]) -> f64 {
    line.windows(2)
        .map(|seg| {
            let ((x0, y0), (x1, y1)) = (seg[0], seg[1]);
            let (dx, dy) = (x1 - x0, y1 - y0);
            let len2 = dx * dx + dy * dy;
            let t = if len2 > 0.0 {
                (((x - x0) * dx + (y - y0) * dy) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (px, py) = (x0 + t * dx, y0 + t * dy);
            ((x - px).powi(2) + (y - py).powi(2)).sqrt()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Static surface: distance to the river for every pixel.
struct Terrain {
    grid: GridSpec,
    river_distance: Vec<f64>,
}

impl Terrain {
    fn new(grid: GridSpec) -> Self {
        let mut river_distance = Vec::with_capacity(grid.len());
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let (lon, lat) = grid.pixel_center(row, col);
                river_distance.push(polyline_distance(lon, lat, &RIVER));
            }
        }
        Self {
            grid,
            river_distance,
        }
    }

    fn distance(&self, row: usize, col: usize) -> f64 {
        self.river_distance[row * self.grid.cols + col]
    }

    /// Metres above the river: a shallow floodplain out to `VALLEY_HALF_WIDTH`
    /// degrees, then valley sides rising steeply, with the Shillong plateau to
    /// the south. Flood-prone ground stays below 15 m.
    fn elevation(&self) -> Raster {
        let mut values = Vec::with_capacity(self.grid.len());
        for row in 0..self.grid.rows {
            for col in 0..self.grid.cols {
                let (lon, lat) = self.grid.pixel_center(row, col);
                let d = self.distance(row, col);
                let mut h = 1.0 + 16.0 * d.min(VALLEY_HALF_WIDTH) + 0.4 * (lon - 89.7);
                if d > VALLEY_HALF_WIDTH {
                    h += 120.0 * (d - VALLEY_HALF_WIDTH);
                }
                if lat < 25.6 {
                    h += (25.6 - lat) * 900.0;
                }
                values.push(h as f32);
            }
        }
        Raster::from_vec(self.grid, values).unwrap_or_else(|_| Raster::masked(self.grid))
    }
}

struct SceneSpec {
    id: &'static str,
    date: NaiveDate,
    pass: OrbitPass,
    mode: InstrumentMode,
    polarisations: [Polarization; 2],
    /// Column range covered by the swath
    swath: (usize, usize),
    /// Half-width (degrees) of the inundated strip along the river, 0 when dry
    flood_extent: f64,
    /// Longitude span of the flooding
    flood_lon: (f64, f64),
    seed: u64,
    /// Footprint far from the grid; pixels are still filled so that a missing
    /// bounds filter shows up as flooding everywhere
    detached: bool,
}

impl SceneSpec {
    fn render(&self, terrain: &Terrain) -> Scene {
        let grid = terrain.grid;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut vh = Vec::with_capacity(grid.len());
        let mut vv = Vec::with_capacity(grid.len());

        for row in 0..grid.rows {
            for col in 0..grid.cols {
                if col < self.swath.0 || col >= self.swath.1 {
                    vh.push(f32::NAN);
                    vv.push(f32::NAN);
                    continue;
                }
                let (lon, _) = grid.pixel_center(row, col);
                let d = terrain.distance(row, col);
                let base = if self.detached {
                    -30.0
                } else if d <= RIVER_HALF_WIDTH {
                    WATER_VH_DB
                } else if d <= self.flood_extent
                    && lon >= self.flood_lon.0
                    && lon < self.flood_lon.1
                {
                    FLOODED_VH_DB
                } else {
                    LAND_VH_DB
                };
                let speckle_vh = gamma_speckle(&mut rng);
                let speckle_vv = gamma_speckle(&mut rng);
                vh.push(base + 10.0 * speckle_vh.log10());
                vv.push(base + VV_OFFSET_DB + 10.0 * speckle_vv.log10());
            }
        }

        let pol_names = self
            .polarisations
            .iter()
            .map(|p| p.band().to_string())
            .collect::<Vec<_>>();
        let mut scene = Scene::new(self.id, self.date)
            .with_property("instrumentMode", self.mode.as_str())
            .with_property("orbitProperties_pass", self.pass.as_str())
            .with_property("transmitterReceiverPolarisation", pol_names.clone())
            .with_property("resolution_meters", PropertyValue::Number(10.0));
        for (name, values) in pol_names.iter().zip([vv, vh]) {
            let raster = Raster::from_vec(grid, values).unwrap_or_else(|_| Raster::masked(grid));
            scene = scene.with_band(name, raster);
        }
        if self.detached {
            scene = scene.with_footprint(MultiPolygon::new(vec![ring(&[
                (70.0, 25.0),
                (75.0, 25.0),
                (75.0, 28.0),
                (70.0, 25.0),
            ])]));
        }
        scene
    }
}

/// Unit-mean gamma variate with `SPECKLE_LOOKS` looks.
fn gamma_speckle(rng: &mut ChaCha8Rng) -> f32 {
    let sum: f32 = (0..SPECKLE_LOOKS)
        .map(|_| -rng.gen_range(f32::EPSILON..1.0f32).ln())
        .sum();
    sum / SPECKLE_LOOKS as f32
}

fn demo_scenes() -> Vec<SceneSpec> {
    let dual = [Polarization::Vv, Polarization::Vh];
    let west = (0, 92);
    let all = (0, 128);
    let east = (48, 128);
    let spec = |id: &'static str,
                date: NaiveDate,
                pass: OrbitPass,
                swath: (usize, usize),
                flood_extent: f64,
                seed: u64| SceneSpec {
        id,
        date,
        pass,
        mode: InstrumentMode::Iw,
        polarisations: dual,
        swath,
        flood_extent,
        flood_lon: (90.6, 94.6),
        seed,
        detached: false,
    };
    vec![
        // dry season
        spec("S1A_IW_20240406_ASC", date(2024, 4, 6), OrbitPass::Ascending, west, 0.0, 11),
        spec("S1A_IW_20240418_DSC", date(2024, 4, 18), OrbitPass::Descending, east, 0.0, 12),
        spec("S1A_IW_20240512_ASC", date(2024, 5, 12), OrbitPass::Ascending, west, 0.0, 13),
        SceneSpec {
            mode: InstrumentMode::Ew,
            ..spec("S1A_EW_20240520_DSC", date(2024, 5, 20), OrbitPass::Descending, all, 0.0, 14)
        },
        // monsoon
        spec("S1A_IW_20240617_ASC", date(2024, 6, 17), OrbitPass::Ascending, west, 0.3, 21),
        SceneSpec {
            detached: true,
            ..spec("S1A_IW_20240620_ASC", date(2024, 6, 20), OrbitPass::Ascending, all, 0.0, 22)
        },
        spec("S1A_IW_20240629_DSC", date(2024, 6, 29), OrbitPass::Descending, east, 0.45, 23),
        spec("S1A_IW_20240711_ASC", date(2024, 7, 11), OrbitPass::Ascending, west, 0.45, 24),
        SceneSpec {
            polarisations: [Polarization::Hh, Polarization::Hv],
            ..spec("S1A_IW_20240715_DSC", date(2024, 7, 15), OrbitPass::Descending, all, 0.9, 25)
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::core::expr::{Collection, Features, Filter};

    #[test]
    fn demo_is_deterministic() {
        let a = demo_backend();
        let b = demo_backend();
        let img = Collection::load("COPERNICUS/S1_GRD")
            .filter(Filter::list_contains("transmitterReceiverPolarisation", "VH"))
            .select("VH")
            .mosaic();
        let ra = a.compute_pixels(&img).unwrap();
        let rb = b.compute_pixels(&img).unwrap();
        assert_eq!(ra.valid_count(), rb.valid_count());
        assert!(
            ra.data
                .iter()
                .zip(rb.data.iter())
                .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
        );
    }

    #[test]
    fn demo_registers_every_asset() {
        let assets = AssetCatalog::for_project(DEFAULT_PROJECT);
        let b = demo_backend();
        for asset in [
            &assets.boundaries,
            &assets.provinces,
            &assets.districts,
            &assets.scenes,
            &assets.elevation,
        ] {
            assert!(b.asset_exists(asset), "{}", asset);
        }
        assert_eq!(b.scene_count(&assets.scenes), 9);
    }

    #[test]
    fn assam_resolves_and_other_location_does_not() {
        let assets = AssetCatalog::for_project(DEFAULT_PROJECT);
        let b = demo_backend();
        let states = Features::load(&assets.boundaries);
        let assam = b.fetch_features(&states.filter_metadata("shapeName", "Assam")).unwrap();
        assert_eq!(assam.len(), 1);
        let other = b
            .fetch_features(&states.filter_metadata("shapeName", "Other Location"))
            .unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn off_spec_scenes_are_filterable() {
        let b = demo_backend();
        let all = Collection::load("COPERNICUS/S1_GRD");
        let iw = all.filter(Filter::eq("instrumentMode", "IW"));
        let vh = iw.filter(Filter::list_contains("transmitterReceiverPolarisation", "VH"));
        assert_eq!(b.count(&iw).unwrap(), 8);
        assert_eq!(b.count(&vh).unwrap(), 7);
    }

    #[test]
    fn speckle_has_unit_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 20_000;
        let mean = (0..n).map(|_| gamma_speckle(&mut rng) as f64).sum::<f64>() / n as f64;
        assert!((mean - 1.0).abs() < 0.03, "mean {}", mean);
    }

    #[test]
    fn floodplain_stays_low() {
        let terrain = Terrain::new(demo_grid());
        let dem = terrain.elevation();
        for row in 0..dem.rows() {
            for col in 0..dem.cols() {
                let (_, lat) = dem.grid.pixel_center(row, col);
                if terrain.distance(row, col) <= VALLEY_HALF_WIDTH && lat >= 25.6 {
                    let h = dem.get(row, col);
                    assert!((0.0..14.0).contains(&h), "{} m at {},{}", h, row, col);
                }
            }
        }
        let (_, max) = dem.min_max().unwrap();
        assert!(max > 100.0);
    }

    #[test]
    fn river_distance_is_zero_on_the_centreline() {
        assert!(polyline_distance(90.8, 26.2, &RIVER) < 1e-9);
        assert!(polyline_distance(90.8, 27.2, &RIVER) > 0.9);
    }
}
