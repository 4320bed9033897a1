//! On-disk asset catalogs for the local backend.
//!
//! A catalog directory holds a `catalog.json` index plus one single-band
//! GeoTIFF per raster:
//!
//! ```text
//! catalog.json
//! rasters/<asset>.tiff
//! rasters/<collection>/<index>_<scene>_<band>.tiff
//! ```
//!
//! Vector features live inline in the index as polygon rings of
//! `[lon, lat]` pairs; the first ring of each polygon is the exterior.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use geo::{LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, info, warn};

use crate::backend::{Feature, LocalBackend, Scene};
use crate::core::expr::Properties;
use crate::core::raster::{GridSpec, Raster};
use crate::error::{Error, Result};
use crate::io::writers::tiff::{GDAL_NODATA, write_tiff_f32};

pub const CATALOG_FILE: &str = "catalog.json";
const RASTER_DIR: &str = "rasters";

type Rings = Vec<Vec<[f64; 2]>>;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogIndex {
    grid: GridSpec,
    #[serde(default)]
    projects: Vec<String>,
    #[serde(default)]
    feature_collections: BTreeMap<String, Vec<FeatureRecord>>,
    #[serde(default)]
    image_collections: BTreeMap<String, Vec<SceneRecord>>,
    /// Asset id to raster path relative to the catalog directory
    #[serde(default)]
    images: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FeatureRecord {
    #[serde(default)]
    properties: Properties,
    polygons: Vec<Rings>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneRecord {
    id: String,
    date: NaiveDate,
    #[serde(default)]
    properties: Properties,
    bands: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    footprint: Option<Vec<Rings>>,
}

fn to_rings(geometry: &MultiPolygon<f64>) -> Vec<Rings> {
    geometry
        .iter()
        .map(|poly| {
            std::iter::once(poly.exterior())
                .chain(poly.interiors())
                .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
                .collect()
        })
        .collect()
}

fn from_rings(polygons: &[Rings]) -> MultiPolygon<f64> {
    MultiPolygon::new(
        polygons
            .iter()
            .filter_map(|rings| {
                let (exterior, interiors) = rings.split_first()?;
                Some(Polygon::new(
                    LineString::from(exterior.clone()),
                    interiors.iter().cloned().map(LineString::from).collect(),
                ))
            })
            .collect(),
    )
}

fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    stem.trim_matches('_').to_string()
}

/// Reads a single-band GeoTIFF onto `grid`. Integer and float samples are
/// accepted; the declared nodata value and non-finite samples become masked.
pub fn read_tiff_f32(path: &Path, grid: GridSpec) -> Result<Raster> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    if (width as usize, height as usize) != (grid.cols, grid.rows) {
        return Err(Error::GridMismatch {
            left: grid.describe(),
            right: format!("{:?} is {}x{}", path, width, height),
        });
    }
    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(Error::InvalidArgument {
                arg: "raster color type",
                value: format!("{:?} in {:?}", other, path),
            });
        }
    }

    let nodata = decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_end_matches('\0').trim().parse::<f32>().ok())
        .filter(|v| v.is_finite());

    let values: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(Error::InvalidArgument {
                arg: "raster sample format",
                value: format!("{:?}", path),
            });
        }
    };

    let values = values
        .into_iter()
        .map(|v| {
            if !v.is_finite() || nodata == Some(v) {
                f32::NAN
            } else {
                v
            }
        })
        .collect();
    Raster::from_vec(grid, values)
}

pub fn load_catalog(dir: &Path) -> Result<LocalBackend> {
    let index_path = dir.join(CATALOG_FILE);
    info!("Loading asset catalog from {:?}", index_path);
    let index: CatalogIndex = serde_json::from_str(&std::fs::read_to_string(&index_path)?)?;
    let grid = index.grid;
    if grid.is_empty() {
        return Err(Error::ZeroSize { size: grid.len() });
    }

    if index.feature_collections.is_empty() {
        warn!("Catalog {:?} defines no feature collections", dir);
    }

    let mut backend = LocalBackend::new(grid);
    for project in &index.projects {
        backend = backend.allow_project(project);
    }

    for (asset, records) in index.feature_collections {
        let features = records
            .into_iter()
            .map(|r| Feature {
                geometry: from_rings(&r.polygons),
                properties: r.properties,
            })
            .collect::<Vec<_>>();
        debug!("{}: {} features", asset, features.len());
        backend = backend.with_features(&asset, features);
    }

    for (asset, records) in index.image_collections {
        let mut scenes = Vec::with_capacity(records.len());
        for record in records {
            let mut scene = Scene::new(&record.id, record.date);
            scene.properties = record.properties;
            for (band, file) in &record.bands {
                scene = scene.with_band(band, read_tiff_f32(&dir.join(file), grid)?);
            }
            if let Some(fp) = &record.footprint {
                scene = scene.with_footprint(from_rings(fp));
            }
            scenes.push(scene);
        }
        debug!("{}: {} scenes", asset, scenes.len());
        backend = backend.with_scenes(&asset, scenes);
    }

    for (asset, file) in index.images {
        backend = backend.with_image(&asset, read_tiff_f32(&dir.join(&file), grid)?);
    }

    Ok(backend)
}

/// Writes every asset of `backend` as a catalog directory readable by
/// [`load_catalog`].
pub fn save_catalog(dir: &Path, backend: &LocalBackend) -> Result<()> {
    let grid = backend.grid();
    std::fs::create_dir_all(dir.join(RASTER_DIR))?;

    let mut projects: Vec<String> = backend.projects().map(str::to_string).collect();
    projects.sort();

    let feature_collections = backend
        .feature_collections()
        .iter()
        .map(|(asset, features)| {
            let records = features
                .iter()
                .map(|f| FeatureRecord {
                    properties: f.properties.clone(),
                    polygons: to_rings(&f.geometry),
                })
                .collect();
            (asset.clone(), records)
        })
        .collect();

    let mut image_collections = BTreeMap::new();
    for (asset, scenes) in backend.image_collections() {
        let coll_dir = format!("{}/{}", RASTER_DIR, file_stem(asset));
        std::fs::create_dir_all(dir.join(&coll_dir))?;
        let mut records = Vec::with_capacity(scenes.len());
        for (i, scene) in scenes.iter().enumerate() {
            let mut bands = BTreeMap::new();
            for (band, raster) in &scene.bands {
                let file = format!("{}/{:03}_{}_{}.tiff", coll_dir, i, file_stem(&scene.id), band);
                write_tiff_f32(&dir.join(&file), raster)?;
                bands.insert(band.clone(), file);
            }
            records.push(SceneRecord {
                id: scene.id.clone(),
                date: scene.date,
                properties: scene.properties.clone(),
                bands,
                footprint: scene.footprint.as_ref().map(to_rings),
            });
        }
        image_collections.insert(asset.clone(), records);
    }

    let mut images = BTreeMap::new();
    for (asset, raster) in backend.images() {
        let file = format!("{}/{}.tiff", RASTER_DIR, file_stem(asset));
        write_tiff_f32(&dir.join(&file), raster)?;
        images.insert(asset.clone(), file);
    }

    let index = CatalogIndex {
        grid,
        projects,
        feature_collections,
        image_collections,
        images,
    };
    let index_path = dir.join(CATALOG_FILE);
    std::fs::write(&index_path, serde_json::to_string_pretty(&index)?)?;
    info!("Saved asset catalog to {:?}", index_path);
    Ok(())
}
