//! Raster to RGBA rendering with visualisation parameters.
use ndarray::Array2;

use crate::core::raster::Raster;
use crate::error::Result;
use crate::render::map::VisParams;
use crate::render::palette::{Palette, Rgb};

/// Row-major RGBA buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    pub fn filled(width: usize, height: usize, color: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, row: usize, col: usize) -> [u8; 4] {
        let o = (row * self.width + col) * 4;
        [
            self.pixels[o],
            self.pixels[o + 1],
            self.pixels[o + 2],
            self.pixels[o + 3],
        ]
    }

    /// Alpha-composites `top` over `self`. Sizes must match.
    pub fn blend_over(&mut self, top: &RgbaImage) {
        for (dst, src) in self.pixels.chunks_exact_mut(4).zip(top.pixels.chunks_exact(4)) {
            let a = src[3] as u32;
            if a == 0 {
                continue;
            }
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * a + dst[c] as u32 * (255 - a)) / 255) as u8;
            }
            dst[3] = dst[3].max(src[3]);
        }
    }

    /// Drops alpha by flattening onto `background`.
    pub fn to_rgb(&self, background: Rgb) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.width * self.height * 3);
        let bg = [background.r, background.g, background.b];
        for px in self.pixels.chunks_exact(4) {
            let a = px[3] as u32;
            for c in 0..3 {
                rgb.push(((px[c] as u32 * a + bg[c] as u32 * (255 - a)) / 255) as u8);
            }
        }
        rgb
    }
}

/// Colours every unmasked pixel through `vis`; masked pixels are transparent.
pub fn raster_to_rgba(raster: &Raster, vis: &VisParams) -> Result<RgbaImage> {
    let palette = Palette::parse(vis.palette.as_slice())?;
    let range = vis.max - vis.min;
    let inv_range = if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    };
    let mut out = RgbaImage::filled(raster.cols(), raster.rows(), [0, 0, 0, 0]);
    for (i, &v) in raster.data.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        let t = (v as f64 - vis.min) * inv_range;
        let Rgb { r, g, b } = palette.evaluate(t);
        let o = i * 4;
        out.pixels[o..o + 4].copy_from_slice(&[r, g, b, vis.alpha()]);
    }
    Ok(out)
}

/// Edge pixels of the unmasked area: valid pixels with a masked or
/// out-of-grid 4-neighbour become 1, everything else is masked.
pub fn outline(raster: &Raster) -> Raster {
    let (rows, cols) = raster.data.dim();
    let valid = |r: isize, c: isize| {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && !raster.data[[r as usize, c as usize]].is_nan()
    };
    let data = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let (ri, ci) = (r as isize, c as isize);
        if !valid(ri, ci) {
            return f32::NAN;
        }
        let edge = !valid(ri - 1, ci)
            || !valid(ri + 1, ci)
            || !valid(ri, ci - 1)
            || !valid(ri, ci + 1);
        if edge { 1.0 } else { f32::NAN }
    });
    Raster {
        grid: raster.grid,
        data,
    }
}
