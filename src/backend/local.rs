use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use geo::{Intersects, MultiPolygon, Polygon};
use tracing::{debug, info};

use super::{Backend, Feature, kernels, union_geometry};
use crate::core::expr::{
    Collection, CollectionNode, FeatureNode, Features, Filter, Image, ImageNode, Properties,
    PropertyValue, UnaryOp,
};
use crate::core::raster::{GridSpec, Raster};
use crate::error::{Error, Result};

/// One acquisition of an image collection.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub date: NaiveDate,
    pub properties: Properties,
    pub bands: BTreeMap<String, Raster>,
    /// Explicit footprint; falls back to the extent of the valid pixels
    pub footprint: Option<MultiPolygon<f64>>,
}

impl Scene {
    pub fn new(id: &str, date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            date,
            properties: Properties::new(),
            bands: BTreeMap::new(),
            footprint: None,
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_band(mut self, name: &str, raster: Raster) -> Self {
        self.bands.insert(name.to_string(), raster);
        self
    }

    pub fn with_footprint(mut self, footprint: MultiPolygon<f64>) -> Self {
        self.footprint = Some(footprint);
        self
    }

    pub fn footprint(&self) -> MultiPolygon<f64> {
        if let Some(fp) = &self.footprint {
            return fp.clone();
        }
        let rects = self
            .bands
            .values()
            .filter_map(|b| b.valid_bounds())
            .map(|r| r.to_polygon())
            .collect::<Vec<Polygon<f64>>>();
        MultiPolygon::new(rects)
    }
}

/// In-process backend evaluating graphs over registered rasters and features.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    grid: GridSpec,
    feature_collections: HashMap<String, Vec<Feature>>,
    image_collections: HashMap<String, Vec<Scene>>,
    images: HashMap<String, Raster>,
    /// Projects accepted by `authenticate`; empty accepts any non-empty id
    projects: HashSet<String>,
}

impl LocalBackend {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            feature_collections: HashMap::new(),
            image_collections: HashMap::new(),
            images: HashMap::new(),
            projects: HashSet::new(),
        }
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn allow_project(mut self, project: &str) -> Self {
        self.projects.insert(project.to_string());
        self
    }

    pub fn with_features(mut self, asset: &str, features: Vec<Feature>) -> Self {
        self.feature_collections.insert(asset.to_string(), features);
        self
    }

    /// Scenes are kept in acquisition order.
    pub fn with_scenes(mut self, asset: &str, mut scenes: Vec<Scene>) -> Self {
        scenes.sort_by_key(|s| s.date);
        self.image_collections.insert(asset.to_string(), scenes);
        self
    }

    pub fn with_image(mut self, asset: &str, raster: Raster) -> Self {
        self.images.insert(asset.to_string(), raster);
        self
    }

    pub fn scene_count(&self, asset: &str) -> usize {
        self.image_collections.get(asset).map_or(0, Vec::len)
    }

    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(String::as_str)
    }

    pub fn feature_collections(&self) -> &HashMap<String, Vec<Feature>> {
        &self.feature_collections
    }

    pub fn image_collections(&self) -> &HashMap<String, Vec<Scene>> {
        &self.image_collections
    }

    pub fn images(&self) -> &HashMap<String, Raster> {
        &self.images
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn authenticate(&self, project: &str) -> Result<()> {
        if project.trim().is_empty() {
            return Err(Error::Authentication {
                project: project.to_string(),
                reason: "no project id given".to_string(),
            });
        }
        if !self.projects.is_empty() && !self.projects.contains(project) {
            return Err(Error::Authentication {
                project: project.to_string(),
                reason: "project is not registered with this backend".to_string(),
            });
        }
        debug!("Authenticated project `{}`", project);
        Ok(())
    }

    fn asset_exists(&self, asset: &str) -> bool {
        self.feature_collections.contains_key(asset)
            || self.image_collections.contains_key(asset)
            || self.images.contains_key(asset)
    }

    fn fetch_features(&self, features: &Features) -> Result<Vec<Feature>> {
        Evaluator::new(self).features(features)
    }

    fn count(&self, collection: &Collection) -> Result<usize> {
        Ok(Evaluator::new(self).collection(collection)?.len())
    }

    fn compute_pixels(&self, image: &Image) -> Result<Raster> {
        let start = Instant::now();
        let mut eval = Evaluator::new(self);
        let raster = eval.image(image)?;
        info!(
            "Computed `{}` graph ({} nodes) in {:.2?}, {} valid pixels",
            image.op_name(),
            image.node_count(),
            start.elapsed(),
            raster.valid_count()
        );
        Ok(Arc::unwrap_or_clone(raster))
    }
}

/// A scene that survived collection filtering, with its selected band.
struct SceneRef<'a> {
    scene: &'a Scene,
    band: Option<String>,
}

impl SceneRef<'_> {
    fn raster(&self) -> Result<&Raster> {
        match &self.band {
            Some(band) => self.scene.bands.get(band).ok_or_else(|| {
                Error::Evaluation(format!("scene {} has no band {}", self.scene.id, band))
            }),
            None if self.scene.bands.len() == 1 => self
                .scene
                .bands
                .values()
                .next()
                .ok_or_else(|| Error::Evaluation(format!("scene {} has no bands", self.scene.id))),
            None => Err(Error::Evaluation(format!(
                "scene {} has {} bands; select one before mosaicking",
                self.scene.id,
                self.scene.bands.len()
            ))),
        }
    }
}

/// Single-request evaluator. Nodes shared within one graph are computed once.
struct Evaluator<'a> {
    backend: &'a LocalBackend,
    images: HashMap<usize, Arc<Raster>>,
    geometries: HashMap<usize, Arc<MultiPolygon<f64>>>,
}

impl<'a> Evaluator<'a> {
    fn new(backend: &'a LocalBackend) -> Self {
        Self {
            backend,
            images: HashMap::new(),
            geometries: HashMap::new(),
        }
    }

    fn features(&self, features: &Features) -> Result<Vec<Feature>> {
        match features.node() {
            FeatureNode::FeatureCollection { asset } => self
                .backend
                .feature_collections
                .get(asset)
                .cloned()
                .ok_or_else(|| Error::AssetNotFound(asset.clone())),
            FeatureNode::FilterMetadata {
                input,
                property,
                value,
            } => {
                let all = self.features(input)?;
                let filter = Filter::eq(property, value);
                Ok(all
                    .into_iter()
                    .filter(|f| filter.matches(&f.properties))
                    .collect())
            }
        }
    }

    fn geometry(&mut self, features: &Features) -> Result<Arc<MultiPolygon<f64>>> {
        let key = features.node_id();
        if let Some(g) = self.geometries.get(&key) {
            return Ok(g.clone());
        }
        let g = Arc::new(union_geometry(&self.features(features)?));
        self.geometries.insert(key, g.clone());
        Ok(g)
    }

    fn collection(&mut self, collection: &Collection) -> Result<Vec<SceneRef<'a>>> {
        match collection.node() {
            CollectionNode::ImageCollection { asset } => {
                let backend = self.backend;
                let scenes = backend
                    .image_collections
                    .get(asset)
                    .ok_or_else(|| Error::AssetNotFound(asset.clone()))?;
                Ok(scenes
                    .iter()
                    .map(|scene| SceneRef { scene, band: None })
                    .collect())
            }
            CollectionNode::FilterBounds { input, bounds } => {
                let geometry = self.geometry(bounds)?;
                let scenes = self.collection(input)?;
                Ok(scenes
                    .into_iter()
                    .filter(|s| s.scene.footprint().intersects(geometry.as_ref()))
                    .collect())
            }
            CollectionNode::Filter { input, filter } => Ok(self
                .collection(input)?
                .into_iter()
                .filter(|s| filter.matches(&s.scene.properties))
                .collect()),
            CollectionNode::FilterDate { input, start, end } => Ok(self
                .collection(input)?
                .into_iter()
                .filter(|s| s.scene.date >= *start && s.scene.date < *end)
                .collect()),
            CollectionNode::Select { input, band } => Ok(self
                .collection(input)?
                .into_iter()
                .map(|s| SceneRef {
                    scene: s.scene,
                    band: Some(band.clone()),
                })
                .collect()),
        }
    }

    fn image(&mut self, image: &Image) -> Result<Arc<Raster>> {
        let key = image.node_id();
        if let Some(r) = self.images.get(&key) {
            return Ok(r.clone());
        }
        let raster = Arc::new(self.compute(image)?);
        self.images.insert(key, raster.clone());
        Ok(raster)
    }

    fn compute(&mut self, image: &Image) -> Result<Raster> {
        let grid = self.backend.grid;
        let raster = match image.node() {
            ImageNode::Asset { asset } => self
                .backend
                .images
                .get(asset)
                .cloned()
                .ok_or_else(|| Error::AssetNotFound(asset.clone()))?,
            ImageNode::Constant { value } => Raster::filled(grid, *value as f32),
            ImageNode::Mosaic { input } => {
                let scenes = self.collection(input)?;
                let mut layers = Vec::with_capacity(scenes.len());
                for s in &scenes {
                    let band = s.raster()?;
                    if band.grid != grid {
                        return Err(Error::GridMismatch {
                            left: grid.describe(),
                            right: format!("scene {}: {}", s.scene.id, band.grid.describe()),
                        });
                    }
                    layers.push(band);
                }
                debug!("Mosaicking {} scenes", layers.len());
                kernels::mosaic(grid, layers)
            }
            ImageNode::Clip { input, geometry } => {
                let geometry = self.geometry(geometry)?;
                self.image(input)?.clip(&geometry)
            }
            ImageNode::Unary { func, input } => {
                let input = self.image(input)?;
                let f: fn(f32) -> f32 = match func {
                    UnaryOp::Log10 => f32::log10,
                    UnaryOp::Abs => f32::abs,
                    UnaryOp::Sqrt => f32::sqrt,
                };
                input.map(move |v| finite_or_masked(f(v)))
            }
            ImageNode::Binary { func, left, right } => {
                let left = self.image(left)?;
                let right = self.image(right)?;
                let func = *func;
                left.zip_with(&right, move |a, b| finite_or_masked(func.apply(a, b)))?
            }
            ImageNode::UpdateMask { input, mask } => {
                let input = self.image(input)?;
                let mask = self.image(mask)?;
                input.zip_with(&mask, |v, m| if m != 0.0 { v } else { f32::NAN })?
            }
            ImageNode::ReduceNeighborhood {
                input,
                reducer,
                kernel,
            } => kernels::reduce_neighborhood(&*self.image(input)?, *reducer, kernel),
            ImageNode::FastDistanceTransform {
                input,
                neighborhood,
            } => kernels::squared_distance_transform(&*self.image(input)?, *neighborhood),
        };
        Ok(raster)
    }
}

fn finite_or_masked(v: f32) -> f32 {
    if v.is_finite() { v } else { f32::NAN }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    fn grid() -> GridSpec {
        GridSpec {
            west: 0.0,
            north: 4.0,
            pixel_size: 1.0,
            cols: 4,
            rows: 4,
        }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn backend() -> LocalBackend {
        let region = Feature {
            properties: [("shapeName".to_string(), PropertyValue::from("West"))].into(),
            geometry: square(0.0, 0.0, 2.0, 4.0),
        };
        let early = Scene::new("early", date(4, 10))
            .with_property("instrumentMode", "IW")
            .with_band("VH", Raster::filled(grid(), -25.0))
            .with_band("VV", Raster::filled(grid(), -15.0));
        let late = Scene::new("late", date(6, 20))
            .with_property("instrumentMode", "IW")
            .with_band("VH", Raster::filled(grid(), -10.0));
        let elsewhere = Scene::new("elsewhere", date(6, 21))
            .with_property("instrumentMode", "IW")
            .with_band("VH", Raster::filled(grid(), 0.0))
            .with_footprint(square(10.0, 10.0, 11.0, 11.0));
        LocalBackend::new(grid())
            .with_features("states", vec![region])
            .with_scenes("s1", vec![elsewhere, late, early])
            .with_image("dem", Raster::filled(grid(), 50.0))
    }

    #[test]
    fn authentication_rules() {
        let b = backend();
        assert!(b.authenticate("any").is_ok());
        assert!(b.authenticate(" ").is_err());
        let b = b.allow_project("mine");
        assert!(b.authenticate("mine").is_ok());
        assert!(matches!(
            b.authenticate("theirs"),
            Err(Error::Authentication { .. })
        ));
    }

    #[test]
    fn collection_filters_compose() {
        let b = backend();
        let states = Features::load("states").filter_metadata("shapeName", "West");
        let all = Collection::load("s1");
        assert_eq!(b.count(&all).unwrap(), 3);
        assert_eq!(b.count(&all.filter_bounds(&states)).unwrap(), 2);
        assert_eq!(b.count(&all.filter_date(date(6, 1), date(6, 21))).unwrap(), 1);
        assert_eq!(
            b.count(&all.filter(Filter::eq("instrumentMode", "EW"))).unwrap(),
            0
        );
    }

    #[test]
    fn mosaic_requires_a_single_band() {
        let b = backend();
        let all = Collection::load("s1").filter_date(date(4, 1), date(5, 1));
        assert!(matches!(
            b.compute_pixels(&all.mosaic()),
            Err(Error::Evaluation(_))
        ));
        let vh = b.compute_pixels(&all.select("VH").mosaic()).unwrap();
        assert_eq!(vh.get(0, 0), -25.0);
    }

    #[test]
    fn mosaic_prefers_latest_scene() {
        let b = backend();
        let img = Collection::load("s1")
            .filter_date(date(4, 1), date(6, 21))
            .select("VH")
            .mosaic();
        assert_eq!(b.compute_pixels(&img).unwrap().get(2, 2), -10.0);
    }

    #[test]
    fn empty_collection_mosaic_is_blank() {
        let b = backend();
        let img = Collection::load("s1")
            .filter_date(date(1, 1), date(2, 1))
            .select("VH")
            .mosaic();
        assert_eq!(b.compute_pixels(&img).unwrap().valid_count(), 0);
    }

    #[test]
    fn clip_and_threshold() {
        let b = backend();
        let states = Features::load("states").filter_metadata("shapeName", "West");
        let img = Image::load("dem").clip(&states).gt(10.0);
        let r = b.compute_pixels(&img).unwrap();
        assert_eq!(r.valid_count(), 8);
        assert_eq!(r.get(0, 0), 1.0);
        assert!(r.get(0, 3).is_nan());
    }

    #[test]
    fn unknown_region_clips_to_nothing() {
        let b = backend();
        let nowhere = Features::load("states").filter_metadata("shapeName", "Nowhere");
        assert!(b.fetch_features(&nowhere).unwrap().is_empty());
        let r = b.compute_pixels(&Image::load("dem").clip(&nowhere)).unwrap();
        assert_eq!(r.valid_count(), 0);
    }

    #[test]
    fn update_mask_drops_zero_pixels() {
        let b = backend();
        let dem = Image::load("dem");
        let masked = dem.update_mask(&dem.lt(0.0));
        assert_eq!(b.compute_pixels(&masked).unwrap().valid_count(), 0);
        let kept = dem.update_mask(&dem.gt(0.0));
        assert_eq!(b.compute_pixels(&kept).unwrap().valid_count(), 16);
    }

    #[test]
    fn non_finite_results_are_masked() {
        let b = backend();
        let r = b
            .compute_pixels(&Image::load("dem").multiply(0.0).log10())
            .unwrap();
        assert_eq!(r.valid_count(), 0);
    }

    #[test]
    fn missing_assets_are_reported() {
        let b = backend();
        assert!(matches!(
            b.compute_pixels(&Image::load("nope")),
            Err(Error::AssetNotFound(_))
        ));
        assert!(!b.asset_exists("nope"));
        assert!(b.asset_exists("dem"));
    }
}
