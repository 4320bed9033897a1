use jpeg_encoder::{ColorType, Encoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};

const JPEG_QUALITY: u8 = 95;

fn dimension(value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::InvalidArgument {
        arg: "jpeg dimension",
        value: value.to_string(),
    })
}

pub fn write_rgb_jpeg(output: &Path, cols: usize, rows: usize, rgb_data: &[u8]) -> Result<()> {
    if cols == 0 || rows == 0 {
        return Err(Error::ZeroSize { size: cols.min(rows) });
    }
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    let encoder = Encoder::new(&mut writer, JPEG_QUALITY);
    encoder.encode(rgb_data, dimension(cols)?, dimension(rows)?, ColorType::Rgb)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_jpeg_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.jpg");
        write_rgb_jpeg(&path, 4, 2, &[200u8; 4 * 2 * 3]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn empty_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        assert!(matches!(
            write_rgb_jpeg(&path, 0, 2, &[]),
            Err(Error::ZeroSize { .. })
        ));
    }
}
