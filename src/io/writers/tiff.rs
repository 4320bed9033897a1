use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use crate::core::raster::Raster;
use crate::error::Result;

// GeoTIFF tags
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const GDAL_NODATA: u16 = 42113;

/// GeoKey directory for a geographic WGS 84 raster (EPSG:4326), pixel-is-area.
const GEO_KEYS_WGS84: [u16; 16] = [
    1, 1, 0, 3, // header: version, revision, minor, key count
    1024, 0, 1, 2, // GTModelTypeGeoKey = geographic
    1025, 0, 1, 1, // GTRasterTypeGeoKey = pixel is area
    2048, 0, 1, 4326, // GeographicTypeGeoKey = WGS 84
];

/// Single-band float32 GeoTIFF; masked pixels are written as NaN and
/// declared as nodata.
pub fn write_tiff_f32(output: &Path, raster: &Raster) -> Result<()> {
    let file = File::create(output)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(raster.cols() as u32, raster.rows() as u32)?;

    let g = raster.grid;
    let scale = [g.pixel_size, g.pixel_size, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, g.west, g.north, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])?;
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &GEO_KEYS_WGS84[..])?;
    image.encoder().write_tag(Tag::Unknown(GDAL_NODATA), "nan")?;

    let data: Vec<f32> = raster.data.iter().copied().collect();
    image.write_data(&data)?;
    Ok(())
}
