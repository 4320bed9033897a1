use crate::backend::AssetCatalog;
use crate::core::expr::{Collection, Features, Filter};
use crate::types::{InstrumentMode, OrbitPass, Polarization};

pub const POLARISATION_PROPERTY: &str = "transmitterReceiverPolarisation";
pub const MODE_PROPERTY: &str = "instrumentMode";
pub const PASS_PROPERTY: &str = "orbitProperties_pass";

/// Fixed acquisition parameters of the scene query.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub polarisation: Polarization,
    pub mode: InstrumentMode,
    pub passes: Vec<OrbitPass>,
}

impl Default for SceneQuery {
    fn default() -> Self {
        Self {
            polarisation: Polarization::Vh,
            mode: InstrumentMode::Iw,
            passes: vec![OrbitPass::Descending, OrbitPass::Ascending],
        }
    }
}

impl SceneQuery {
    pub fn filters(&self) -> Vec<Filter> {
        vec![
            Filter::list_contains(POLARISATION_PROPERTY, self.polarisation.band()),
            Filter::eq(MODE_PROPERTY, self.mode.as_str()),
            Filter::or(
                self.passes
                    .iter()
                    .map(|p| Filter::eq(PASS_PROPERTY, p.as_str()))
                    .collect(),
            ),
        ]
    }
}

/// Scenes intersecting `boundary` that carry the queried polarisation in the
/// queried mode, either orbit direction. Nothing is checked for emptiness.
pub fn filtered_scenes(
    assets: &AssetCatalog,
    boundary: &Features,
    query: &SceneQuery,
) -> Collection {
    query
        .filters()
        .into_iter()
        .fold(Collection::load(&assets.scenes).filter_bounds(boundary), |c, f| c.filter(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expr::CollectionNode;

    #[test]
    fn query_chain_is_bounds_then_metadata() {
        let assets = AssetCatalog::for_project("demo");
        let boundary = Features::load(&assets.boundaries);
        let c = filtered_scenes(&assets, &boundary, &SceneQuery::default());
        let mut ops = Vec::new();
        let mut cur = c.clone();
        loop {
            ops.push(cur.op_name());
            let next = match cur.node() {
                CollectionNode::ImageCollection { .. } => break,
                CollectionNode::FilterBounds { input, .. }
                | CollectionNode::Filter { input, .. }
                | CollectionNode::FilterDate { input, .. }
                | CollectionNode::Select { input, .. } => input.clone(),
            };
            cur = next;
        }
        assert_eq!(
            ops,
            vec!["filter", "filter", "filter", "filter_bounds", "image_collection"]
        );
    }

    #[test]
    fn default_query_accepts_both_passes() {
        let filters = SceneQuery::default().filters();
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(json[0]["type"], "list_contains");
        assert_eq!(json[0]["value"], "VH");
        assert_eq!(json[1]["value"], "IW");
        assert_eq!(json[2]["filters"][0]["value"], "DESCENDING");
        assert_eq!(json[2]["filters"][1]["value"], "ASCENDING");
    }
}
