use tracing::{info, warn};

use crate::backend::Session;
use crate::core::expr::{Collection, Features, Image};
use crate::core::params::DateRange;
use crate::error::Result;
use crate::types::Polarization;

/// Scenes and composite of one acquisition window.
#[derive(Debug, Clone)]
pub struct PeriodComposite {
    pub label: &'static str,
    pub window: DateRange,
    pub scenes: Collection,
    /// Mosaic of the selected band, clipped to the boundary
    pub image: Image,
}

/// Restricts `scenes` to `window`, mosaics the band and clips to `boundary`.
pub fn composite(
    label: &'static str,
    scenes: &Collection,
    window: DateRange,
    band: Polarization,
    boundary: &Features,
) -> PeriodComposite {
    let scenes = scenes.filter_date(window.start, window.end);
    let image = scenes.select(band.band()).mosaic().clip(boundary);
    PeriodComposite {
        label,
        window,
        scenes,
        image,
    }
}

/// Number of scenes feeding the composite. An empty window is only reported.
pub fn count_scenes(session: &Session, period: &PeriodComposite) -> Result<usize> {
    let n = session.backend().count(&period.scenes)?;
    if n == 0 {
        warn!(
            "No scenes in {} window {}; its composite will be blank",
            period.label, period.window
        );
    } else {
        info!("{} window {}: {} scene(s)", period.label, period.window, n);
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expr::ImageNode;
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn composite_is_mosaic_then_clip() {
        let boundary = Features::load("states");
        let scenes = Collection::load("s1");
        let p = composite(
            "baseline",
            &scenes,
            DateRange::new(d(4, 1), d(5, 29)),
            Polarization::Vh,
            &boundary,
        );
        match p.image.node() {
            ImageNode::Clip { input, geometry } => {
                assert!(geometry.same_node(&boundary));
                assert_eq!(input.op_name(), "mosaic");
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(p.scenes.op_name(), "filter_date");
    }
}
