use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{DespeckleMode, Region};

/// Cutoff in dB separating water-like from dry backscatter
pub const DEFAULT_THRESHOLD_DB: f64 = -20.0;

/// Neighborhood (pixels) of the distance-to-flood transform
pub const DEFAULT_DISTANCE_NEIGHBORHOOD: u32 = 2;

/// Half-open acquisition window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Start is inclusive, end is exclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when both windows share at least one day.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Flood mapping parameters suitable for config files and GUI presets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodParams {
    pub region: Region,
    /// Dry-season reference window
    pub baseline: DateRange,
    /// Window expected to contain the flood
    pub flood: DateRange,
    #[serde(default = "default_threshold")]
    pub threshold_db: f64,
    #[serde(default = "default_despeckle")]
    pub despeckle: DespeckleMode,
    #[serde(default = "default_neighborhood")]
    pub distance_neighborhood: u32,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_DB
}

fn default_despeckle() -> DespeckleMode {
    DespeckleMode::Lee
}

fn default_neighborhood() -> u32 {
    DEFAULT_DISTANCE_NEIGHBORHOOD
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl Default for FloodParams {
    fn default() -> Self {
        Self {
            region: Region::Assam,
            baseline: DateRange::new(ymd(2024, 4, 1), ymd(2024, 5, 29)),
            flood: DateRange::new(ymd(2024, 6, 15), ymd(2024, 7, 21)),
            threshold_db: DEFAULT_THRESHOLD_DB,
            despeckle: DespeckleMode::Lee,
            distance_neighborhood: DEFAULT_DISTANCE_NEIGHBORHOOD,
        }
    }
}

impl FloodParams {
    /// Rejects empty windows and non-finite thresholds. Overlapping windows are
    /// only reported, the composites are still built.
    pub fn validate(&self) -> Result<()> {
        if self.baseline.is_empty() {
            return Err(Error::InvalidDateRange {
                label: "baseline",
                start: self.baseline.start,
                end: self.baseline.end,
            });
        }
        if self.flood.is_empty() {
            return Err(Error::InvalidDateRange {
                label: "flood",
                start: self.flood.start,
                end: self.flood.end,
            });
        }
        if !self.threshold_db.is_finite() {
            return Err(Error::InvalidArgument {
                arg: "threshold_db",
                value: self.threshold_db.to_string(),
            });
        }
        if self.distance_neighborhood == 0 {
            return Err(Error::InvalidArgument {
                arg: "distance_neighborhood",
                value: "0".to_string(),
            });
        }
        if self.baseline.overlaps(&self.flood) {
            warn!(
                "Baseline window {} overlaps flood window {}; composites will share scenes",
                self.baseline, self.flood
            );
        }
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Presets written by the GUI carry a `//` comment header
        let json_start = content.find('{').ok_or_else(|| Error::InvalidArgument {
            arg: "config",
            value: path.display().to_string(),
        })?;
        Ok(serde_json::from_str(&content[json_start..])?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(arg: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidArgument {
        arg,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_dates() {
        let p = FloodParams::default();
        assert_eq!(p.region, Region::Assam);
        assert_eq!(p.baseline.start.to_string(), "2024-04-01");
        assert_eq!(p.baseline.end.to_string(), "2024-05-29");
        assert_eq!(p.flood.start.to_string(), "2024-06-15");
        assert_eq!(p.flood.end.to_string(), "2024-07-21");
        assert_eq!(p.threshold_db, -20.0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn default_windows_do_not_overlap() {
        let p = FloodParams::default();
        assert!(p.baseline.end <= p.flood.start);
        assert!(!p.baseline.overlaps(&p.flood));
    }

    #[test]
    fn window_end_is_exclusive() {
        let r = DateRange::new(ymd(2024, 4, 1), ymd(2024, 4, 3));
        assert!(r.contains(ymd(2024, 4, 1)));
        assert!(r.contains(ymd(2024, 4, 2)));
        assert!(!r.contains(ymd(2024, 4, 3)));
        assert_eq!(r.days(), 2);
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        let a = DateRange::new(ymd(2024, 4, 1), ymd(2024, 5, 1));
        let b = DateRange::new(ymd(2024, 5, 1), ymd(2024, 6, 1));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn empty_window_is_rejected() {
        let mut p = FloodParams::default();
        p.flood = DateRange::new(ymd(2024, 7, 21), ymd(2024, 6, 15));
        assert!(matches!(
            p.validate(),
            Err(Error::InvalidDateRange { label: "flood", .. })
        ));
    }

    #[test]
    fn preset_with_comment_header_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.floodmap");
        let json = FloodParams::default().to_json_string().unwrap();
        std::fs::write(&path, format!("// floodmap preset\n// v0\n{}", json)).unwrap();
        let loaded = FloodParams::from_json_file(&path).unwrap();
        assert_eq!(loaded, FloodParams::default());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let json = r#"{
            "region": "Assam",
            "baseline": {"start": "2024-04-01", "end": "2024-05-29"},
            "flood": {"start": "2024-06-15", "end": "2024-07-21"}
        }"#;
        let p: FloodParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.despeckle, DespeckleMode::Lee);
        assert_eq!(p.distance_neighborhood, 2);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("good_date", "2024-04-01").is_ok());
        assert!(matches!(
            parse_date("good_date", "01/04/2024"),
            Err(Error::InvalidArgument { arg: "good_date", .. })
        ));
    }
}
