//! Ordered map layers, their styling and the map viewport.
use geo::Rect;
use serde::{Deserialize, Serialize};

use crate::core::expr::{Features, Image};
use crate::core::raster::Raster;
use crate::error::Result;
use crate::render::colorize::{RgbaImage, raster_to_rgba};

/// Basemap colour under the overlays
pub const BASEMAP_RGBA: [u8; 4] = [236, 234, 228, 255];

/// Visualisation parameters of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_max() -> f64 {
    1.0
}

fn default_opacity() -> f32 {
    1.0
}

impl Default for VisParams {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: default_max(),
            palette: Vec::new(),
            opacity: default_opacity(),
        }
    }
}

impl VisParams {
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    pub fn palette(colors: &[&str]) -> Self {
        Self::default().with_palette(colors)
    }

    pub fn with_palette(mut self, colors: &[&str]) -> Self {
        self.palette = colors.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn alpha(&self) -> u8 {
        (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

#[derive(Debug, Clone)]
pub enum LayerSource {
    Image(Image),
    /// Drawn as the outline of the features
    Features(Features),
}

/// One overlay of the map, still unevaluated.
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub name: String,
    pub source: LayerSource,
    pub vis: VisParams,
    /// Visible by default
    pub shown: bool,
}

impl MapLayer {
    pub fn image(name: &str, image: Image, vis: VisParams) -> Self {
        Self {
            name: name.to_string(),
            source: LayerSource::Image(image),
            vis,
            shown: true,
        }
    }

    pub fn features(name: &str, features: Features, vis: VisParams) -> Self {
        Self {
            name: name.to_string(),
            source: LayerSource::Features(features),
            vis,
            shown: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.shown = false;
        self
    }

    pub fn as_image(&self) -> Option<&Image> {
        match &self.source {
            LayerSource::Image(img) => Some(img),
            LayerSource::Features(_) => None,
        }
    }

    /// File-name friendly form of the layer name.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

const MAX_ZOOM: u8 = 18;

/// Viewport centred on the region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// (lon, lat)
    pub center: (f64, f64),
    pub zoom: u8,
    /// west, south, east, north
    pub bounds: Option<[f64; 4]>,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            zoom: 1,
            bounds: None,
        }
    }
}

impl MapView {
    /// Largest web-map zoom level at which `bounds` still fits one tile width.
    pub fn fit(bounds: Option<Rect<f64>>) -> Self {
        let Some(rect) = bounds else {
            return Self::default();
        };
        let extent = rect.width().max(rect.height());
        let zoom = if extent > 0.0 {
            (360.0 / extent).log2().floor().clamp(1.0, MAX_ZOOM as f64) as u8
        } else {
            MAX_ZOOM
        };
        let c = rect.center();
        Self {
            center: (c.x, c.y),
            zoom,
            bounds: Some([rect.min().x, rect.min().y, rect.max().x, rect.max().y]),
        }
    }
}

/// Pixel statistics of an evaluated layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerStats {
    pub valid_pixels: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
}

impl LayerStats {
    pub fn of(raster: &Raster) -> Self {
        let range = raster.min_max();
        Self {
            valid_pixels: raster.valid_count(),
            min: range.map(|r| r.0),
            max: range.map(|r| r.1),
            mean: raster.mean(),
        }
    }
}

/// A map layer with its pixels.
#[derive(Debug, Clone)]
pub struct EvaluatedLayer {
    pub name: String,
    pub shown: bool,
    pub vis: VisParams,
    pub raster: Raster,
    pub stats: LayerStats,
}

impl EvaluatedLayer {
    pub fn new(layer: &MapLayer, raster: Raster) -> Self {
        Self {
            name: layer.name.clone(),
            shown: layer.shown,
            vis: layer.vis.clone(),
            stats: LayerStats::of(&raster),
            raster,
        }
    }

    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    pub fn to_rgba(&self) -> Result<RgbaImage> {
        raster_to_rgba(&self.raster, &self.vis)
    }
}

/// Draws the layers in order over the basemap. `visible` selects layers by
/// index; `None` uses each layer's default visibility.
pub fn composite(layers: &[EvaluatedLayer], visible: Option<&[bool]>) -> Result<Option<RgbaImage>> {
    let Some(first) = layers.first() else {
        return Ok(None);
    };
    let mut canvas = RgbaImage::filled(first.raster.cols(), first.raster.rows(), BASEMAP_RGBA);
    for (i, layer) in layers.iter().enumerate() {
        let shown = visible.and_then(|v| v.get(i).copied()).unwrap_or(layer.shown);
        if !shown {
            continue;
        }
        first.raster.ensure_same_grid(&layer.raster)?;
        canvas.blend_over(&layer.to_rgba()?);
    }
    Ok(Some(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::GridSpec;
    use geo::Coord;

    #[test]
    fn slugs_are_file_names() {
        assert_eq!(slugify("Distance from Flood"), "distance_from_flood");
        assert_eq!(slugify("DEM"), "dem");
        assert_eq!(slugify("Affected Region Boundary"), "affected_region_boundary");
    }

    #[test]
    fn view_fits_region_extent() {
        let rect = Rect::new(Coord { x: 89.7, y: 24.1 }, Coord { x: 96.0, y: 28.2 });
        let v = MapView::fit(Some(rect));
        assert_eq!(v.zoom, 5);
        assert!((v.center.0 - 92.85).abs() < 1e-9);
        assert!((v.center.1 - 26.15).abs() < 1e-9);
        assert_eq!(MapView::fit(None), MapView::default());
    }

    #[test]
    fn vis_params_fill_defaults_from_json() {
        let v: VisParams = serde_json::from_str(r#"{"palette": ["red"]}"#).unwrap();
        assert_eq!(v.min, 0.0);
        assert_eq!(v.max, 1.0);
        assert_eq!(v.alpha(), 255);
    }

    #[test]
    fn composite_skips_hidden_layers() {
        let grid = GridSpec {
            west: 0.0,
            north: 1.0,
            pixel_size: 1.0,
            cols: 1,
            rows: 1,
        };
        let red = MapLayer::image("a", Image::constant(1.0), VisParams::palette(&["red"]));
        let blue =
            MapLayer::image("b", Image::constant(1.0), VisParams::palette(&["blue"])).hidden();
        let layers = vec![
            EvaluatedLayer::new(&red, Raster::filled(grid, 1.0)),
            EvaluatedLayer::new(&blue, Raster::filled(grid, 1.0)),
        ];
        let img = composite(&layers, None).unwrap().unwrap();
        assert_eq!(img.pixel(0, 0), [255, 0, 0, 255]);
        let img = composite(&layers, Some(&[true, true])).unwrap().unwrap();
        assert_eq!(img.pixel(0, 0), [0, 0, 255, 255]);
        assert!(composite(&[], None).unwrap().is_none());
    }
}
