use std::path::Path;

use serde_json::{Value, json};
use tracing::info;

use crate::core::processing::FloodMap;
use crate::error::Result;
use crate::render::map::LayerSource;

/// The layer stack as the JSON request a remote platform would receive.
pub fn graph_document(map: &FloodMap) -> Result<Value> {
    let mut layers = Vec::with_capacity(map.layers.len());
    for layer in &map.layers {
        let expression = match &layer.source {
            LayerSource::Image(img) => img.to_json()?,
            LayerSource::Features(features) => serde_json::to_value(features)?,
        };
        layers.push(json!({
            "name": layer.name,
            "shown": layer.shown,
            "vis": layer.vis,
            "expression": expression,
        }));
    }
    Ok(json!({
        "region": map.params.region,
        "baseline": map.params.baseline,
        "flood": map.params.flood,
        "center": [map.view.center.0, map.view.center.1],
        "zoom": map.view.zoom,
        "layers": layers,
    }))
}

pub fn write_graph_json(path: &Path, map: &FloodMap) -> Result<()> {
    let doc = graph_document(map)?;
    std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    info!("Wrote computation graph to {:?}", path);
    Ok(())
}
