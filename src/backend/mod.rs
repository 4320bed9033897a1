//! Execution backends for the computation graph and the session object that
//! owns one.
//!
//! A [`Session`] is constructed explicitly with [`Session::initialize`] and
//! torn down with [`Session::close`]; every pipeline call takes it as an
//! argument instead of relying on process-wide state. The [`Backend`] trait is
//! the seam between graph construction and graph execution: the bundled
//! [`local::LocalBackend`] evaluates graphs in process over `ndarray` rasters.
use std::sync::Arc;
use std::time::Instant;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::expr::{Collection, Features, Image, Properties};
use crate::core::raster::Raster;
use crate::error::{Error, Result};

pub mod kernels;
pub mod local;
pub mod synthetic;

pub use local::{LocalBackend, Scene};

/// A resolved vector feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub properties: Properties,
    pub geometry: MultiPolygon<f64>,
}

impl Feature {
    pub fn name(&self, property: &str) -> Option<&str> {
        self.properties.get(property).and_then(|v| v.as_text())
    }
}

/// Union of the polygons of a feature list.
pub fn union_geometry(features: &[Feature]) -> MultiPolygon<f64> {
    MultiPolygon::new(
        features
            .iter()
            .flat_map(|f| f.geometry.0.iter().cloned())
            .collect(),
    )
}

pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    fn authenticate(&self, project: &str) -> Result<()>;

    fn asset_exists(&self, asset: &str) -> bool;

    fn fetch_features(&self, features: &Features) -> Result<Vec<Feature>>;

    /// Number of scenes a collection expression resolves to.
    fn count(&self, collection: &Collection) -> Result<usize>;

    fn compute_pixels(&self, image: &Image) -> Result<Raster>;
}

/// Fixed dataset identifiers the pipeline reads from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCatalog {
    /// First-level administrative boundaries, looked up by name
    pub boundaries: String,
    pub provinces: String,
    pub districts: String,
    /// Property holding the region name
    pub boundary_name_property: String,
    pub scenes: String,
    pub elevation: String,
}

impl AssetCatalog {
    pub fn for_project(project: &str) -> Self {
        Self {
            boundaries: format!("projects/{}/assets/geoBoundaries-IND-ADM1", project),
            provinces: format!("projects/{}/assets/Provincial_Boundary", project),
            districts: format!(
                "projects/{}/assets/geoBoundaries-IND-ADM2_simplified",
                project
            ),
            boundary_name_property: "shapeName".to_string(),
            scenes: "COPERNICUS/S1_GRD".to_string(),
            elevation: "USGS/SRTMGL1_003".to_string(),
        }
    }
}

pub const DEFAULT_PROJECT: &str = "flood-hazard-demo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub project: String,
    pub assets: AssetCatalog,
}

impl SessionConfig {
    pub fn for_project(project: &str) -> Self {
        Self {
            project: project.to_string(),
            assets: AssetCatalog::for_project(project),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_project(DEFAULT_PROJECT)
    }
}

/// Authenticated handle to a backend.
#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn Backend>,
    config: SessionConfig,
    opened_at: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend.name())
            .field("project", &self.config.project)
            .finish()
    }
}

impl Session {
    /// Authenticates against `config.project` and checks the boundary assets.
    pub fn initialize(backend: Arc<dyn Backend>, config: SessionConfig) -> Result<Self> {
        info!(
            "Initializing session on backend `{}` for project `{}`",
            backend.name(),
            config.project
        );
        backend.authenticate(&config.project)?;

        if !backend.asset_exists(&config.assets.boundaries) {
            return Err(Error::AssetNotFound(config.assets.boundaries.clone()));
        }
        for aux in [&config.assets.provinces, &config.assets.districts] {
            if !backend.asset_exists(aux) {
                warn!("Auxiliary boundary asset not available: {}", aux);
            }
        }
        debug!("Asset catalog: {:?}", config.assets);

        Ok(Self {
            backend,
            config,
            opened_at: Instant::now(),
        })
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn assets(&self) -> &AssetCatalog {
        &self.config.assets
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    pub fn close(self) {
        info!(
            "Closing session for project `{}` after {:.2?}",
            self.config.project,
            self.opened_at.elapsed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_paths_embed_the_project() {
        let c = AssetCatalog::for_project("demo");
        assert_eq!(c.boundaries, "projects/demo/assets/geoBoundaries-IND-ADM1");
        assert_eq!(c.scenes, "COPERNICUS/S1_GRD");
        assert_eq!(c.elevation, "USGS/SRTMGL1_003");
        assert_eq!(c.boundary_name_property, "shapeName");
    }

    #[test]
    fn session_requires_authentication() {
        let backend = Arc::new(synthetic::demo_backend());
        let err = Session::initialize(backend, SessionConfig::for_project("")).unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn session_requires_boundary_asset() {
        let backend = Arc::new(synthetic::demo_backend());
        let mut config = SessionConfig::default();
        config.assets.boundaries = "projects/nowhere/assets/none".to_string();
        let err = Session::initialize(backend, config).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound(_)));
    }

    #[test]
    fn demo_session_opens_and_closes() {
        let backend = Arc::new(synthetic::demo_backend());
        let session = Session::initialize(backend, SessionConfig::default()).unwrap();
        assert_eq!(session.project(), DEFAULT_PROJECT);
        assert_eq!(session.backend().name(), "local");
        session.close();
    }
}
