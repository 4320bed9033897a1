//! Raster kernels behind the non-pointwise graph operators: mosaicking,
//! neighborhood reduction and the distance transform.
use ndarray::{Array2, Zip};

use crate::core::expr::{Kernel, Reducer};
use crate::core::raster::{GridSpec, Raster};

/// Per pixel, the last unmasked value in `layers` order.
pub fn mosaic<'a>(grid: GridSpec, layers: impl IntoIterator<Item = &'a Raster>) -> Raster {
    let mut out = Raster::masked(grid);
    for layer in layers {
        Zip::from(&mut out.data)
            .and(&layer.data)
            .par_for_each(|o, &v| {
                if !v.is_nan() {
                    *o = v;
                }
            });
    }
    out
}

/// Weighted mean or population variance over the kernel footprint.
/// Masked neighbours are skipped; masked centres stay masked.
pub fn reduce_neighborhood(input: &Raster, reducer: Reducer, kernel: &Kernel) -> Raster {
    let (rows, cols) = input.data.dim();
    let half_h = kernel.height / 2;
    let half_w = kernel.width / 2;
    let src = &input.data;
    let mut out = Array2::<f32>::from_elem((rows, cols), f32::NAN);

    Zip::indexed(&mut out).par_for_each(|(i, j), o| {
        if src[[i, j]].is_nan() {
            return;
        }
        let mut sum_w = 0.0f64;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for dy in 0..kernel.height {
            let ii = i as isize + dy as isize - half_h as isize;
            if ii < 0 || ii >= rows as isize {
                continue;
            }
            for dx in 0..kernel.width {
                let jj = j as isize + dx as isize - half_w as isize;
                if jj < 0 || jj >= cols as isize {
                    continue;
                }
                let w = kernel.weight(dy, dx) as f64;
                let v = src[[ii as usize, jj as usize]];
                if w == 0.0 || v.is_nan() {
                    continue;
                }
                let v = v as f64;
                sum_w += w;
                sum += w * v;
                sum_sq += w * v * v;
            }
        }
        if sum_w <= 0.0 {
            return;
        }
        let mean = sum / sum_w;
        *o = match reducer {
            Reducer::Mean => mean as f32,
            Reducer::Variance => (sum_sq / sum_w - mean * mean).max(0.0) as f32,
        };
    });

    Raster {
        grid: input.grid,
        data: out,
    }
}

const FAR: f64 = 1e20;

/// 1-D squared distance transform of a sampled function (lower envelope of parabolas).
fn edt_1d(f: &[f64], out: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let mut v = vec![0usize; n];
    let mut z = vec![0f64; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;
    for q in 1..n {
        loop {
            let p = v[k];
            let s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64))
                / (2.0 * (q as f64 - p as f64));
            if s <= z[k] && k > 0 {
                k -= 1;
                continue;
            }
            if s <= z[k] {
                // k == 0: the new parabola dominates from the start
                v[0] = q;
                z[0] = f64::NEG_INFINITY;
                z[1] = f64::INFINITY;
                break;
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = f64::INFINITY;
            break;
        }
    }
    k = 0;
    for (q, o) in out.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let d = q as f64 - p as f64;
        *o = d * d + f[p];
    }
}

/// Squared Euclidean distance in pixels to the nearest unmasked non-zero
/// pixel. Pixels farther than `neighborhood` pixels are masked, as is
/// everything when no such pixel exists. The input mask does not carry over.
pub fn squared_distance_transform(input: &Raster, neighborhood: u32) -> Raster {
    let (rows, cols) = input.data.dim();
    let mut grid = Array2::<f64>::from_elem((rows, cols), FAR);
    let mut any_seed = false;
    for ((i, j), &v) in input.data.indexed_iter() {
        if !v.is_nan() && v != 0.0 {
            grid[[i, j]] = 0.0;
            any_seed = true;
        }
    }
    if !any_seed {
        return Raster::masked(input.grid);
    }

    let mut col_buf = vec![0f64; rows];
    let mut col_out = vec![0f64; rows];
    for j in 0..cols {
        for i in 0..rows {
            col_buf[i] = grid[[i, j]];
        }
        edt_1d(&col_buf, &mut col_out);
        for i in 0..rows {
            grid[[i, j]] = col_out[i];
        }
    }
    let mut row_buf = vec![0f64; cols];
    let mut row_out = vec![0f64; cols];
    for i in 0..rows {
        for j in 0..cols {
            row_buf[j] = grid[[i, j]];
        }
        edt_1d(&row_buf, &mut row_out);
        for j in 0..cols {
            grid[[i, j]] = row_out[j];
        }
    }

    let limit = (neighborhood as f64) * (neighborhood as f64);
    let data = grid.mapv(|d| if d <= limit { d as f32 } else { f32::NAN });
    Raster {
        grid: input.grid,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(cols: usize, rows: usize) -> GridSpec {
        GridSpec {
            west: 0.0,
            north: rows as f64,
            pixel_size: 1.0,
            cols,
            rows,
        }
    }

    #[test]
    fn mosaic_keeps_last_unmasked_value() {
        let g = grid(3, 1);
        let a = Raster::from_vec(g, vec![1.0, 1.0, f32::NAN]).unwrap();
        let b = Raster::from_vec(g, vec![2.0, f32::NAN, f32::NAN]).unwrap();
        let m = mosaic(g, [&a, &b]);
        assert_eq!(m.get(0, 0), 2.0);
        assert_eq!(m.get(0, 1), 1.0);
        assert!(m.get(0, 2).is_nan());
    }

    #[test]
    fn mosaic_of_nothing_is_blank() {
        let g = grid(2, 2);
        assert_eq!(mosaic(g, []).valid_count(), 0);
    }

    #[test]
    fn neighborhood_mean_and_variance() {
        let g = grid(3, 3);
        let r = Raster::from_vec(g, (1..=9).map(|v| v as f32).collect()).unwrap();
        let k = Kernel::square(1);
        let mean = reduce_neighborhood(&r, Reducer::Mean, &k);
        let var = reduce_neighborhood(&r, Reducer::Variance, &k);
        assert_relative_eq!(mean.get(1, 1), 5.0);
        // corner sees 1, 2, 4, 5
        assert_relative_eq!(mean.get(0, 0), 3.0);
        assert_relative_eq!(var.get(1, 1), 60.0 / 9.0, epsilon = 1e-5);
    }

    #[test]
    fn neighborhood_skips_masked_pixels() {
        let g = grid(3, 1);
        let r = Raster::from_vec(g, vec![1.0, f32::NAN, 3.0]).unwrap();
        let mean = reduce_neighborhood(&r, Reducer::Mean, &Kernel::square(1));
        assert_relative_eq!(mean.get(0, 0), 1.0);
        assert!(mean.get(0, 1).is_nan());
        assert_relative_eq!(mean.get(0, 2), 3.0);
    }

    #[test]
    fn constant_input_has_zero_variance() {
        let r = Raster::filled(grid(4, 4), 0.25);
        let var = reduce_neighborhood(&r, Reducer::Variance, &Kernel::square(1));
        assert!(var.data.iter().all(|&v| v.abs() < 1e-7));
    }

    #[test]
    fn distance_transform_is_squared_euclidean() {
        let g = grid(5, 5);
        let mut r = Raster::masked(g);
        r.data[[2, 2]] = 1.0;
        let d = squared_distance_transform(&r, 10);
        assert_eq!(d.get(2, 2), 0.0);
        assert_eq!(d.get(2, 3), 1.0);
        assert_eq!(d.get(3, 3), 2.0);
        assert_eq!(d.get(0, 0), 8.0);
        assert_eq!(d.get(0, 2), 4.0);
    }

    #[test]
    fn distance_beyond_neighborhood_is_masked() {
        let g = grid(5, 1);
        let r = Raster::from_vec(g, vec![1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let d = squared_distance_transform(&r, 2);
        assert_eq!(d.get(0, 0), 0.0);
        assert_eq!(d.get(0, 1), 1.0);
        assert_eq!(d.get(0, 2), 4.0);
        assert!(d.get(0, 3).is_nan());
        assert!(d.get(0, 4).is_nan());
    }

    #[test]
    fn distance_without_seeds_is_blank() {
        let r = Raster::filled(grid(3, 3), 0.0);
        assert_eq!(squared_distance_transform(&r, 5).valid_count(), 0);
    }
}
