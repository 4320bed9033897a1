use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Output dimensions with the long side equal to `target_size`, aspect kept.
/// Upscaling is refused and returns the original dimensions.
pub fn calculate_resize_dimensions(
    original_cols: usize,
    original_rows: usize,
    target_size: usize,
) -> (usize, usize) {
    let short_side = original_rows.min(original_cols);
    let long_side = original_rows.max(original_cols);

    if target_size >= long_side {
        if target_size > long_side {
            warn!(
                "Target size {} is larger than original long side {}. Keeping original dimensions {}x{}",
                target_size, long_side, original_cols, original_rows
            );
        }
        return (original_cols, original_rows);
    }

    let scale_factor = target_size as f64 / long_side as f64;
    let new_short_side = ((short_side as f64 * scale_factor).round() as usize).max(1);

    if original_cols > original_rows {
        (target_size, new_short_side)
    } else {
        (new_short_side, target_size)
    }
}

/// Interleaved RGB8 pixels with their dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbBuffer {
    pub cols: usize,
    pub rows: usize,
    pub data: Vec<u8>,
}

impl RgbBuffer {
    /// Pixel size multiplier relative to a buffer of `original_cols` columns.
    pub fn scale_from(&self, original_cols: usize, original_rows: usize) -> (f64, f64) {
        (
            original_cols as f64 / self.cols as f64,
            original_rows as f64 / self.rows as f64,
        )
    }
}

pub fn resize_rgb(
    data: &[u8],
    original_cols: usize,
    original_rows: usize,
    target_size: Option<usize>,
) -> Result<RgbBuffer> {
    let unchanged = || RgbBuffer {
        cols: original_cols,
        rows: original_rows,
        data: data.to_vec(),
    };
    let Some(size) = target_size else {
        return Ok(unchanged());
    };
    if size == 0 {
        return Err(Error::ZeroSize { size });
    }
    let (new_cols, new_rows) = calculate_resize_dimensions(original_cols, original_rows, size);
    if (new_cols, new_rows) == (original_cols, original_rows) {
        return Ok(unchanged());
    }
    info!(
        "Original size: {}x{}, New size: {}x{}",
        original_cols, original_rows, new_cols, new_rows
    );

    let resize_options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    let mut resizer = Resizer::new();
    let src_image = Image::from_vec_u8(
        original_cols as u32,
        original_rows as u32,
        data.to_vec(),
        PixelType::U8x3,
    )
    .map_err(Error::external)?;
    let mut dst_image = Image::new(new_cols as u32, new_rows as u32, PixelType::U8x3);
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::external)?;

    Ok(RgbBuffer {
        cols: new_cols,
        rows: new_rows,
        data: dst_image.into_vec(),
    })
}

/// Geotransform of a resampled image covering the same extent.
pub fn scale_geotransform(geotransform: [f64; 6], scale_x: f64, scale_y: f64) -> [f64; 6] {
    let mut gt = geotransform;
    gt[1] *= scale_x;
    gt[2] *= scale_y;
    gt[4] *= scale_x;
    gt[5] *= scale_y;
    gt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_side_matches_target() {
        assert_eq!(calculate_resize_dimensions(128, 84, 64), (64, 42));
        assert_eq!(calculate_resize_dimensions(84, 128, 64), (42, 64));
        assert_eq!(calculate_resize_dimensions(128, 84, 512), (128, 84));
    }

    #[test]
    fn rgb_downsampling_keeps_flat_colour() {
        let data = [10u8, 120, 200].repeat(40 * 20);
        let out = resize_rgb(&data, 40, 20, Some(10)).unwrap();
        assert_eq!((out.cols, out.rows), (10, 5));
        assert_eq!(out.data.len(), 10 * 5 * 3);
        assert!(out.data.chunks(3).all(|p| p == [10, 120, 200]));
        assert_eq!(out.scale_from(40, 20), (4.0, 4.0));
    }

    #[test]
    fn no_size_is_identity() {
        let data = vec![1u8; 2 * 2 * 3];
        assert_eq!(resize_rgb(&data, 2, 2, None).unwrap().data, data);
        assert!(resize_rgb(&data, 2, 2, Some(0)).is_err());
    }
}
