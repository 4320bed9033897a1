use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// OGC WKT of geographic WGS 84
pub const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

fn world_extension(output_image: &Path) -> String {
    let ext = output_image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "jgw".to_string(),
        "png" => "pgw".to_string(),
        "tif" | "tiff" => "tfw".to_string(),
        other => match other.chars().next() {
            Some(first) => format!("{}w", first),
            None => "wld".to_string(),
        },
    }
}

/// Write a world file next to the image for a GDAL-style geotransform.
/// The world file stores the transform in pixel-centre convention.
pub fn write_world_file(output_image: &Path, geotransform: [f64; 6]) -> Result<PathBuf> {
    let world_path = output_image.with_extension(world_extension(output_image));

    let a = geotransform[1];
    let d = geotransform[4];
    let b = geotransform[2];
    let e = geotransform[5];
    let c = geotransform[0] + 0.5 * a + 0.5 * b;
    let f = geotransform[3] + 0.5 * d + 0.5 * e;

    let mut file = File::create(&world_path)?;
    for v in [a, d, b, e, c, f] {
        writeln!(file, "{:.12}", v)?;
    }
    Ok(world_path)
}

/// Write a .prj file with the provided projection WKT.
pub fn write_prj_file(output_image: &Path, projection: &str) -> Result<PathBuf> {
    let prj_path = output_image.with_extension("prj");
    std::fs::write(&prj_path, projection.as_bytes())?;
    Ok(prj_path)
}
