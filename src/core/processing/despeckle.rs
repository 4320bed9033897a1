//! Radiometric normalisation and speckle filtering, built from graph
//! primitives so the whole filter runs wherever the graph is evaluated.
use crate::core::expr::{Image, Kernel, Reducer};
use crate::types::DespeckleMode;

/// Equivalent number of looks of Sentinel-1 IW GRD products
pub const GRD_LOOKS: f64 = 4.4;

/// Lower bound on the squared coefficient of variation, keeps flat
/// neighbourhoods finite.
const MIN_CI2: f64 = 1e-10;

/// dB to linear power: `10^(dB/10)`.
pub fn to_natural(img: &Image) -> Image {
    Image::constant(10.0).pow(img.divide(10.0))
}

/// Linear power to dB: `10 * log10(x)`.
pub fn to_db(img: &Image) -> Image {
    img.log10().multiply(10.0)
}

/// Adaptive Lee filter over 3x3 local statistics of a linear-power image.
///
/// With `cu² = 1/looks` and `ci² = var/mean²`, the weight
/// `w = clamp(1 - cu²/ci², 0, 1)` blends the local mean
/// (`w = 0`, homogeneous areas) with the original pixel (`w = 1`, edges and
/// point targets): `out = mean + w * (img - mean)`.
pub fn lee_filter(img: &Image, looks: f64) -> Image {
    let kernel = Kernel::square(1);
    let mean = img.reduce_neighborhood(Reducer::Mean, kernel.clone());
    let variance = img.reduce_neighborhood(Reducer::Variance, kernel);
    let cu2 = 1.0 / looks;
    let ci2 = variance.divide(mean.multiply(&mean)).max(MIN_CI2);
    let weight = Image::constant(1.0)
        .subtract(Image::constant(cu2).divide(&ci2))
        .max(0.0)
        .min(1.0);
    mean.add(weight.multiply(img.subtract(&mean)))
}

/// Normalise, filter and return to dB. `PassThrough` hands back the input
/// handle itself.
pub fn despeckle(img: &Image, mode: DespeckleMode) -> Image {
    match mode {
        DespeckleMode::PassThrough => img.clone(),
        DespeckleMode::Lee => to_db(&lee_filter(&to_natural(img), GRD_LOOKS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, LocalBackend};
    use crate::core::raster::{GridSpec, Raster};
    use approx::assert_relative_eq;

    fn backend(values: Vec<f32>, cols: usize, rows: usize) -> LocalBackend {
        let grid = GridSpec {
            west: 0.0,
            north: rows as f64,
            pixel_size: 1.0,
            cols,
            rows,
        };
        LocalBackend::new(grid).with_image("img", Raster::from_vec(grid, values).unwrap())
    }

    #[test]
    fn pass_through_returns_the_same_handle() {
        let img = Image::load("img");
        assert!(despeckle(&img, DespeckleMode::PassThrough).same_node(&img));
        assert!(!despeckle(&img, DespeckleMode::Lee).same_node(&img));
    }

    #[test]
    fn db_round_trip_is_identity() {
        let b = backend(vec![-25.0, -12.0, 0.0, 3.0], 2, 2);
        let img = Image::load("img");
        let r = b.compute_pixels(&to_db(&to_natural(&img))).unwrap();
        assert_relative_eq!(r.get(0, 0), -25.0, epsilon = 1e-4);
        assert_relative_eq!(r.get(1, 1), 3.0, epsilon = 1e-4);
    }

    #[test]
    fn flat_area_is_left_unchanged() {
        let b = backend(vec![-15.0; 25], 5, 5);
        let r = b
            .compute_pixels(&despeckle(&Image::load("img"), DespeckleMode::Lee))
            .unwrap();
        assert_eq!(r.valid_count(), 25);
        assert!(r.data.iter().all(|&v| (v + 15.0).abs() < 1e-3));
    }

    #[test]
    fn lee_reduces_speckle_variance() {
        // checkerboard of +-2 dB around -15 dB is well inside the speckle level
        let values = (0..49)
            .map(|i| if (i / 7 + i % 7) % 2 == 0 { -13.0 } else { -17.0 })
            .collect::<Vec<f32>>();
        let b = backend(values, 7, 7);
        let r = b
            .compute_pixels(&despeckle(&Image::load("img"), DespeckleMode::Lee))
            .unwrap();
        let (lo, hi) = r.min_max().unwrap();
        assert!(hi - lo < 4.0, "range {}..{}", lo, hi);
    }

    #[test]
    fn lee_weight_follows_local_statistics() {
        // bright point target on a unit background, linear power
        let mut values = vec![1.0f32; 9];
        values[4] = 4.0;
        let b = backend(values, 3, 3);
        let r = b
            .compute_pixels(&lee_filter(&Image::load("img"), GRD_LOOKS))
            .unwrap();

        let mean = 12.0 / 9.0;
        let variance = 24.0 / 9.0 - mean * mean;
        let ci2 = variance / (mean * mean);
        let weight = 1.0 - (1.0 / GRD_LOOKS) / ci2;
        let expected = mean + weight * (4.0 - mean);
        assert_relative_eq!(r.get(1, 1) as f64, expected, max_relative = 1e-5);
    }

    #[test]
    fn strong_edges_survive() {
        // left half water, right half land
        let values = (0..36)
            .map(|i| if i % 6 < 3 { -25.0 } else { -5.0 })
            .collect::<Vec<f32>>();
        let b = backend(values, 6, 6);
        let r = b
            .compute_pixels(&despeckle(&Image::load("img"), DespeckleMode::Lee))
            .unwrap();
        assert!(r.get(3, 0) < -20.0);
        assert!(r.get(3, 5) > -20.0);
    }
}
