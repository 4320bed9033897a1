//! In-memory single-band rasters on a north-up lon/lat grid (EPSG:4326).
//! NaN marks masked pixels.
use geo::{Contains, Coord, MultiPolygon, Point, Rect};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Longitude of the left edge
    pub west: f64,
    /// Latitude of the top edge
    pub north: f64,
    /// Pixel size in degrees (square pixels)
    pub pixel_size: f64,
    pub cols: usize,
    pub rows: usize,
}

impl GridSpec {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn east(&self) -> f64 {
        self.west + self.cols as f64 * self.pixel_size
    }

    pub fn south(&self) -> f64 {
        self.north - self.rows as f64 * self.pixel_size
    }

    /// (lon, lat) of a pixel centre.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.west + (col as f64 + 0.5) * self.pixel_size,
            self.north - (row as f64 + 0.5) * self.pixel_size,
        )
    }

    /// GDAL-style affine transform.
    pub fn geotransform(&self) -> [f64; 6] {
        [self.west, self.pixel_size, 0.0, self.north, 0.0, -self.pixel_size]
    }

    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.west,
                y: self.south(),
            },
            Coord {
                x: self.east(),
                y: self.north,
            },
        )
    }

    pub fn describe(&self) -> String {
        format!(
            "{}x{} @ {:.5} deg from ({:.4}, {:.4})",
            self.cols, self.rows, self.pixel_size, self.west, self.north
        )
    }

    /// Boolean mask of pixel centres inside `geometry`.
    pub fn rasterize(&self, geometry: &MultiPolygon<f64>) -> Array2<bool> {
        let mut inside = Array2::from_elem(self.shape(), false);
        if geometry.0.is_empty() {
            return inside;
        }
        Zip::indexed(&mut inside).par_for_each(|(row, col), v| {
            let (lon, lat) = self.pixel_center(row, col);
            *v = geometry.contains(&Point::new(lon, lat));
        });
        inside
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub grid: GridSpec,
    pub data: Array2<f32>,
}

impl Raster {
    pub fn filled(grid: GridSpec, value: f32) -> Self {
        Self {
            grid,
            data: Array2::from_elem(grid.shape(), value),
        }
    }

    /// Every pixel masked.
    pub fn masked(grid: GridSpec) -> Self {
        Self::filled(grid, f32::NAN)
    }

    pub fn from_array(grid: GridSpec, data: Array2<f32>) -> Result<Self> {
        if data.dim() != grid.shape() {
            return Err(Error::GridMismatch {
                left: grid.describe(),
                right: format!("array {:?}", data.dim()),
            });
        }
        Ok(Self { grid, data })
    }

    pub fn from_vec(grid: GridSpec, values: Vec<f32>) -> Result<Self> {
        let data = Array2::from_shape_vec(grid.shape(), values)
            .map_err(|e| Error::Processing(format!("raster shape: {}", e)))?;
        Ok(Self { grid, data })
    }

    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    pub fn cols(&self) -> usize {
        self.grid.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[[row, col]]
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        !self.data[[row, col]].is_nan()
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Min and max over unmasked pixels.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn mean(&self) -> Option<f64> {
        let (sum, n) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    pub fn map(&self, f: impl Fn(f32) -> f32 + Sync + Send) -> Raster {
        let mut out = self.data.clone();
        out.par_mapv_inplace(|v| if v.is_nan() { v } else { f(v) });
        Raster {
            grid: self.grid,
            data: out,
        }
    }

    /// Pixel-wise combination; masked where either input is masked.
    pub fn zip_with(
        &self,
        other: &Raster,
        f: impl Fn(f32, f32) -> f32 + Sync + Send,
    ) -> Result<Raster> {
        self.ensure_same_grid(other)?;
        let mut out = Array2::<f32>::zeros(self.grid.shape());
        Zip::from(&mut out)
            .and(&self.data)
            .and(&other.data)
            .par_for_each(|o, &a, &b| {
                *o = if a.is_nan() || b.is_nan() {
                    f32::NAN
                } else {
                    f(a, b)
                };
            });
        Ok(Raster {
            grid: self.grid,
            data: out,
        })
    }

    pub fn ensure_same_grid(&self, other: &Raster) -> Result<()> {
        if self.grid != other.grid {
            return Err(Error::GridMismatch {
                left: self.grid.describe(),
                right: other.grid.describe(),
            });
        }
        Ok(())
    }

    /// Masks pixels whose centre lies outside `geometry`.
    pub fn clip(&self, geometry: &MultiPolygon<f64>) -> Raster {
        let inside = self.grid.rasterize(geometry);
        let mut out = self.data.clone();
        Zip::from(&mut out).and(&inside).par_for_each(|v, &keep| {
            if !keep {
                *v = f32::NAN;
            }
        });
        Raster {
            grid: self.grid,
            data: out,
        }
    }

    /// Lon/lat extent of the unmasked pixels.
    pub fn valid_bounds(&self) -> Option<Rect<f64>> {
        let mut extent: Option<(usize, usize, usize, usize)> = None;
        for ((r, c), v) in self.data.indexed_iter() {
            if v.is_nan() {
                continue;
            }
            extent = Some(match extent {
                None => (r, r, c, c),
                Some((r0, r1, c0, c1)) => (r0.min(r), r1.max(r), c0.min(c), c1.max(c)),
            });
        }
        let (r0, r1, c0, c1) = extent?;
        let ps = self.grid.pixel_size;
        Some(Rect::new(
            Coord {
                x: self.grid.west + c0 as f64 * ps,
                y: self.grid.north - (r1 + 1) as f64 * ps,
            },
            Coord {
                x: self.grid.west + (c1 + 1) as f64 * ps,
                y: self.grid.north - r0 as f64 * ps,
            },
        ))
    }
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

    #[test]
    fn pixel_centres_follow_north_up_convention() {
        let g = grid();
        assert_eq!(g.pixel_center(0, 0), (0.5, 3.5));
        assert_eq!(g.pixel_center(3, 3), (3.5, 0.5));
        assert_eq!(g.geotransform(), [0.0, 1.0, 0.0, 4.0, 0.0, -1.0]);
        assert_eq!(g.south(), 0.0);
    }

    #[test]
    fn clip_masks_outside_pixels() {
        let r = Raster::filled(grid(), 1.0);
        let clipped = r.clip(&square(0.0, 2.0, 2.0, 4.0));
        assert_eq!(clipped.valid_count(), 4);
        assert!(clipped.is_valid(0, 0));
        assert!(!clipped.is_valid(3, 3));
    }

    #[test]
    fn clip_to_empty_geometry_masks_everything() {
        let r = Raster::filled(grid(), 1.0);
        let clipped = r.clip(&MultiPolygon::new(vec![]));
        assert_eq!(clipped.valid_count(), 0);
        assert_eq!(clipped.min_max(), None);
    }

    #[test]
    fn zip_with_propagates_masks() {
        let mut a = Raster::filled(grid(), 2.0);
        a.data[[1, 1]] = f32::NAN;
        let b = Raster::filled(grid(), 3.0);
        let s = a.zip_with(&b, |x, y| x + y).unwrap();
        assert_eq!(s.get(0, 0), 5.0);
        assert!(s.get(1, 1).is_nan());
        assert_eq!(s.valid_count(), 15);
    }

    #[test]
    fn mismatched_grids_are_rejected() {
        let a = Raster::filled(grid(), 1.0);
        let mut g = grid();
        g.cols = 5;
        let b = Raster::filled(g, 1.0);
        assert!(matches!(a.zip_with(&b, |x, _| x), Err(Error::GridMismatch { .. })));
    }

    #[test]
    fn valid_bounds_cover_unmasked_pixels() {
        let mut r = Raster::masked(grid());
        r.data[[1, 2]] = 1.0;
        let b = r.valid_bounds().unwrap();
        assert_eq!(b.min(), Coord { x: 2.0, y: 2.0 });
        assert_eq!(b.max(), Coord { x: 3.0, y: 3.0 });
        assert!(Raster::masked(grid()).valid_bounds().is_none());
    }
}
