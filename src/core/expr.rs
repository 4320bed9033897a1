//! Deferred raster computation graph.
//!
//! Every handle (`Features`, `Collection`, `Image`) describes a computation, it
//! never holds pixels. Deriving a value allocates a new node that points at its
//! inputs; existing nodes are never mutated, so handles are cheap to clone and
//! safe to share between threads. A [`crate::backend::Backend`] evaluates the
//! graph, and the whole graph serialises to JSON as the request a remote
//! platform would receive.
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Metadata value attached to a feature or a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
    Number(f64),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        PropertyValue::List(items)
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

/// Metadata predicate applied to the scenes of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    Eq { property: String, value: String },
    ListContains { property: String, value: String },
    Or { filters: Vec<Filter> },
    And { filters: Vec<Filter> },
}

impl Filter {
    pub fn eq(property: &str, value: &str) -> Self {
        Filter::Eq {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn list_contains(property: &str, value: &str) -> Self {
        Filter::ListContains {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Missing properties never match.
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            Filter::Eq { property, value } => match properties.get(property) {
                Some(PropertyValue::Text(v)) => v == value,
                Some(PropertyValue::Number(n)) => value.parse::<f64>().is_ok_and(|x| x == *n),
                _ => false,
            },
            Filter::ListContains { property, value } => match properties.get(property) {
                Some(PropertyValue::List(items)) => items.iter().any(|v| v == value),
                _ => false,
            },
            Filter::Or { filters } => filters.iter().any(|f| f.matches(properties)),
            Filter::And { filters } => filters.iter().all(|f| f.matches(properties)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Mean,
    /// Population variance of the unmasked neighbours
    Variance,
}

/// Rectangular weighted neighborhood centred on the output pixel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kernel {
    pub width: usize,
    pub height: usize,
    pub weights: Vec<f32>,
}

impl Kernel {
    /// Unit weights over a `(2r+1) x (2r+1)` square.
    pub fn square(radius: usize) -> Self {
        let side = 2 * radius + 1;
        Self {
            width: side,
            height: side,
            weights: vec![1.0; side * side],
        }
    }

    pub fn fixed(width: usize, height: usize, weights: Vec<f32>) -> Result<Self> {
        if width % 2 == 0 || height % 2 == 0 {
            return Err(Error::InvalidArgument {
                arg: "kernel",
                value: format!("{}x{} (sides must be odd)", width, height),
            });
        }
        if weights.len() != width * height {
            return Err(Error::InvalidArgument {
                arg: "kernel weights",
                value: format!("{} weights for a {}x{} kernel", weights.len(), width, height),
            });
        }
        Ok(Self {
            width,
            height,
            weights,
        })
    }

    pub fn weight(&self, dy: usize, dx: usize) -> f32 {
        self.weights[dy * self.width + dx]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Log10,
    Abs,
    Sqrt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Pow,
    Max,
    Min,
    Gt,
    Lt,
    Eq,
    And,
    Or,
}

impl BinaryOp {
    pub fn apply(&self, a: f32, b: f32) -> f32 {
        let truth = |c: bool| if c { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Gt => truth(a > b),
            BinaryOp::Lt => truth(a < b),
            BinaryOp::Eq => truth(a == b),
            BinaryOp::And => truth(a != 0.0 && b != 0.0),
            BinaryOp::Or => truth(a != 0.0 || b != 0.0),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FeatureNode {
    FeatureCollection {
        asset: String,
    },
    FilterMetadata {
        input: Features,
        property: String,
        value: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CollectionNode {
    ImageCollection {
        asset: String,
    },
    FilterBounds {
        input: Collection,
        bounds: Features,
    },
    Filter {
        input: Collection,
        filter: Filter,
    },
    FilterDate {
        input: Collection,
        start: NaiveDate,
        end: NaiveDate,
    },
    Select {
        input: Collection,
        band: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageNode {
    Asset {
        asset: String,
    },
    Constant {
        value: f64,
    },
    Mosaic {
        input: Collection,
    },
    Clip {
        input: Image,
        geometry: Features,
    },
    Unary {
        func: UnaryOp,
        input: Image,
    },
    Binary {
        func: BinaryOp,
        left: Image,
        right: Image,
    },
    UpdateMask {
        input: Image,
        mask: Image,
    },
    ReduceNeighborhood {
        input: Image,
        reducer: Reducer,
        kernel: Kernel,
    },
    FastDistanceTransform {
        input: Image,
        neighborhood: u32,
    },
}

/// Handle to a feature collection expression.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Features(Arc<FeatureNode>);

/// Handle to an image collection expression.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Collection(Arc<CollectionNode>);

/// Handle to a single-band image expression.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Image(Arc<ImageNode>);

impl Features {
    pub fn load(asset: &str) -> Self {
        Features(Arc::new(FeatureNode::FeatureCollection {
            asset: asset.to_string(),
        }))
    }

    /// Keep features whose `property` equals `value`.
    pub fn filter_metadata(&self, property: &str, value: &str) -> Self {
        Features(Arc::new(FeatureNode::FilterMetadata {
            input: self.clone(),
            property: property.to_string(),
            value: value.to_string(),
        }))
    }

    pub fn node(&self) -> &FeatureNode {
        &self.0
    }

    pub fn same_node(&self, other: &Features) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Collection {
    pub fn load(asset: &str) -> Self {
        Collection(Arc::new(CollectionNode::ImageCollection {
            asset: asset.to_string(),
        }))
    }

    pub fn filter_bounds(&self, bounds: &Features) -> Self {
        Collection(Arc::new(CollectionNode::FilterBounds {
            input: self.clone(),
            bounds: bounds.clone(),
        }))
    }

    pub fn filter(&self, filter: Filter) -> Self {
        Collection(Arc::new(CollectionNode::Filter {
            input: self.clone(),
            filter,
        }))
    }

    /// Scenes acquired in `[start, end)`.
    pub fn filter_date(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Collection(Arc::new(CollectionNode::FilterDate {
            input: self.clone(),
            start,
            end,
        }))
    }

    pub fn select(&self, band: &str) -> Self {
        Collection(Arc::new(CollectionNode::Select {
            input: self.clone(),
            band: band.to_string(),
        }))
    }

    /// Per pixel, the last unmasked scene in collection order.
    pub fn mosaic(&self) -> Image {
        Image(Arc::new(ImageNode::Mosaic {
            input: self.clone(),
        }))
    }

    pub fn node(&self) -> &CollectionNode {
        &self.0
    }

    pub fn same_node(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Short operator name, for logs.
    pub fn op_name(&self) -> &'static str {
        match self.node() {
            CollectionNode::ImageCollection { .. } => "image_collection",
            CollectionNode::FilterBounds { .. } => "filter_bounds",
            CollectionNode::Filter { .. } => "filter",
            CollectionNode::FilterDate { .. } => "filter_date",
            CollectionNode::Select { .. } => "select",
        }
    }
}

impl From<f64> for Image {
    fn from(value: f64) -> Self {
        Image::constant(value)
    }
}

impl From<&Image> for Image {
    fn from(image: &Image) -> Self {
        image.clone()
    }
}

impl Image {
    pub fn load(asset: &str) -> Self {
        Image(Arc::new(ImageNode::Asset {
            asset: asset.to_string(),
        }))
    }

    pub fn constant(value: f64) -> Self {
        Image(Arc::new(ImageNode::Constant { value }))
    }

    pub fn clip(&self, geometry: &Features) -> Self {
        Image(Arc::new(ImageNode::Clip {
            input: self.clone(),
            geometry: geometry.clone(),
        }))
    }

    fn unary(&self, func: UnaryOp) -> Self {
        Image(Arc::new(ImageNode::Unary {
            func,
            input: self.clone(),
        }))
    }

    fn binary(&self, func: BinaryOp, right: impl Into<Image>) -> Self {
        Image(Arc::new(ImageNode::Binary {
            func,
            left: self.clone(),
            right: right.into(),
        }))
    }

    pub fn log10(&self) -> Self {
        self.unary(UnaryOp::Log10)
    }

    pub fn abs(&self) -> Self {
        self.unary(UnaryOp::Abs)
    }

    pub fn sqrt(&self) -> Self {
        self.unary(UnaryOp::Sqrt)
    }

    pub fn add(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    pub fn subtract(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Subtract, other)
    }

    pub fn multiply(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Multiply, other)
    }

    pub fn divide(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Divide, other)
    }

    pub fn pow(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Pow, other)
    }

    pub fn max(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Max, other)
    }

    pub fn min(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Min, other)
    }

    pub fn gt(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn lt(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn eq(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn and(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(&self, other: impl Into<Image>) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// Masks every pixel where `mask` is zero or masked.
    pub fn update_mask(&self, mask: &Image) -> Self {
        Image(Arc::new(ImageNode::UpdateMask {
            input: self.clone(),
            mask: mask.clone(),
        }))
    }

    pub fn reduce_neighborhood(&self, reducer: Reducer, kernel: Kernel) -> Self {
        Image(Arc::new(ImageNode::ReduceNeighborhood {
            input: self.clone(),
            reducer,
            kernel,
        }))
    }

    /// Squared Euclidean distance (pixels) to the nearest non-zero pixel,
    /// valid within `neighborhood` pixels.
    pub fn fast_distance_transform(&self, neighborhood: u32) -> Self {
        Image(Arc::new(ImageNode::FastDistanceTransform {
            input: self.clone(),
            neighborhood,
        }))
    }

    pub fn node(&self) -> &ImageNode {
        &self.0
    }

    pub fn same_node(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Short operator name, for logs.
    pub fn op_name(&self) -> &'static str {
        match self.node() {
            ImageNode::Asset { .. } => "asset",
            ImageNode::Constant { .. } => "constant",
            ImageNode::Mosaic { .. } => "mosaic",
            ImageNode::Clip { .. } => "clip",
            ImageNode::Unary { .. } => "unary",
            ImageNode::Binary { .. } => "binary",
            ImageNode::UpdateMask { .. } => "update_mask",
            ImageNode::ReduceNeighborhood { .. } => "reduce_neighborhood",
            ImageNode::FastDistanceTransform { .. } => "fast_distance_transform",
        }
    }

    /// Direct image inputs of this node.
    fn image_inputs(&self) -> Vec<&Image> {
        match self.node() {
            ImageNode::Asset { .. } | ImageNode::Constant { .. } | ImageNode::Mosaic { .. } => {
                vec![]
            }
            ImageNode::Clip { input, .. }
            | ImageNode::Unary { input, .. }
            | ImageNode::ReduceNeighborhood { input, .. }
            | ImageNode::FastDistanceTransform { input, .. } => vec![input],
            ImageNode::Binary { left, right, .. } => vec![left, right],
            ImageNode::UpdateMask { input, mask } => vec![input, mask],
        }
    }

    /// Distinct image nodes reachable from this one, itself included.
    pub fn node_count(&self) -> usize {
        let mut seen = HashSet::new();
        let mut stack = vec![self];
        while let Some(img) = stack.pop() {
            if seen.insert(Arc::as_ptr(&img.0)) {
                stack.extend(img.image_inputs());
            }
        }
        seen.len()
    }

    /// Distinct geometries this image is clipped to anywhere in its graph.
    pub fn clip_geometries(&self) -> Vec<Features> {
        let mut seen = HashSet::new();
        let mut geometries: Vec<Features> = Vec::new();
        let mut stack = vec![self];
        while let Some(img) = stack.pop() {
            if !seen.insert(Arc::as_ptr(&img.0)) {
                continue;
            }
            if let ImageNode::Clip { geometry, .. } = img.node() {
                if !geometries.iter().any(|g| g.same_node(geometry)) {
                    geometries.push(geometry.clone());
                }
            }
            stack.extend(img.image_inputs());
        }
        geometries
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
