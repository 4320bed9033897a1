//! Shared types and enums used across floodmap.
//! Includes `Region`, `Polarization`, `InstrumentMode`, `OrbitPass`,
//! `DespeckleMode` and `OutputFormat`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Administrative regions offered by the region dropdown.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Region {
    Assam,
    OtherLocation,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Assam, Region::OtherLocation];

    /// Value of the `shapeName` property this region is looked up by.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Region::Assam => "Assam",
            Region::OtherLocation => "Other Location",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.shape_name())
    }
}

impl clap::ValueEnum for Region {
    fn value_variants<'a>() -> &'a [Self] {
        &Region::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Region::Assam => clap::builder::PossibleValue::new("assam").alias("Assam"),
            Region::OtherLocation => clap::builder::PossibleValue::new("other-location")
                .alias("Other Location"),
        })
    }
}

#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize,
)]
pub enum Polarization {
    Vv,
    Vh,
    Hh,
    Hv,
}

impl Polarization {
    /// Band / metadata name used by the scene catalog.
    pub fn band(&self) -> &'static str {
        match self {
            Polarization::Vv => "VV",
            Polarization::Vh => "VH",
            Polarization::Hh => "HH",
            Polarization::Hv => "HV",
        }
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.band())
    }
}

/// Sentinel-1 acquisition mode.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize,
)]
pub enum InstrumentMode {
    Iw,
    Ew,
    Sm,
}

impl InstrumentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentMode::Iw => "IW",
            InstrumentMode::Ew => "EW",
            InstrumentMode::Sm => "SM",
        }
    }
}

impl std::fmt::Display for InstrumentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize,
)]
pub enum OrbitPass {
    Ascending,
    Descending,
}

impl OrbitPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrbitPass::Ascending => "ASCENDING",
            OrbitPass::Descending => "DESCENDING",
        }
    }
}

impl std::fmt::Display for OrbitPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the composites are despeckled before thresholding.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum DespeckleMode {
    /// Adaptive Lee filter over 3x3 local statistics
    Lee,
    /// Returns the composite unchanged
    PassThrough,
}

impl std::fmt::Display for DespeckleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DespeckleMode::Lee => write!(f, "Lee"),
            DespeckleMode::PassThrough => write!(f, "PassThrough"),
        }
    }
}

#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum OutputFormat {
    TIFF,
    JPEG, // Rendered with the layer palette, preview only
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::TIFF => "tiff",
            OutputFormat::JPEG => "jpg",
        }
    }
}
