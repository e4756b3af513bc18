//! Format detection and dispatch for raster imports.

use std::path::Path;
use std::str::FromStr;

use scenery_core::error::read_file;
use scenery_core::{Result, SceneryError};
use tracing::info;

use crate::grid::Dem;
use crate::{dem_file, dted, geotiff, hgt, ida, usgs};

/// Raster formats the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemFormat {
    Hgt,
    FloatHgt,
    /// Never detected; the layout is indistinguishable from raw HGT.
    ShortOz,
    Usgs,
    Ida,
    GeoTiff,
    Dted,
    Persisted,
}

impl FromStr for DemFormat {
    type Err = SceneryError;

    fn from_str(s: &str) -> Result<Self> {
        let format = match s.to_ascii_lowercase().as_str() {
            "hgt" => DemFormat::Hgt,
            "float-hgt" => DemFormat::FloatHgt,
            "short-oz" => DemFormat::ShortOz,
            "usgs" => DemFormat::Usgs,
            "ida" => DemFormat::Ida,
            "geotiff" | "tiff" => DemFormat::GeoTiff,
            "dted" => DemFormat::Dted,
            "dem" => DemFormat::Persisted,
            _ => return Err(SceneryError::format(s, "unknown raster format name")),
        };
        Ok(format)
    }
}

/// Pick a format from the file extension, sniffing the header for `.dem`
/// (shared by the persisted codec, float HGT and USGS ASCII).
pub fn detect_format(path: &Path, data: &[u8]) -> Option<DemFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let format = match ext.as_str() {
        "hgt" => DemFormat::Hgt,
        "tif" | "tiff" => DemFormat::GeoTiff,
        "dt0" | "dt1" | "dt2" => DemFormat::Dted,
        "img" | "ida" => DemFormat::Ida,
        "dem" => {
            if data.starts_with(b"SDEM") {
                DemFormat::Persisted
            } else if data.starts_with(&[b'a', 0, 0, 0, 1]) {
                DemFormat::FloatHgt
            } else {
                DemFormat::Usgs
            }
        }
        _ => return None,
    };
    Some(format)
}

/// Parse bytes in a known format.
pub fn parse_dem(format: DemFormat, data: &[u8], name: &str) -> Result<Dem> {
    match format {
        DemFormat::Hgt => hgt::parse_hgt(data, name),
        DemFormat::FloatHgt => hgt::parse_float_hgt(data, name),
        DemFormat::ShortOz => hgt::parse_short_oz(data, name),
        DemFormat::Usgs => usgs::parse_usgs(data, name),
        DemFormat::Ida => ida::parse_ida(data, name),
        DemFormat::GeoTiff => geotiff::parse_geotiff(data, name),
        DemFormat::Dted => dted::parse_dted(data, name),
        DemFormat::Persisted => dem_file::decode_dem(data, name).map(|(dem, _)| dem),
    }
}

/// Load any supported raster file.
pub fn import_dem(path: &Path) -> Result<Dem> {
    import_dem_as(path, None)
}

/// Load a raster file, in `format` if given, else as detected.
pub fn import_dem_as(path: &Path, format: Option<DemFormat>) -> Result<Dem> {
    let data = read_file(path)?;
    let name = path.to_string_lossy();
    let format = match format {
        Some(f) => f,
        None => detect_format(path, &data).ok_or_else(|| {
            SceneryError::format(name.as_ref(), "unrecognised raster file extension")
        })?,
    };
    let dem = parse_dem(format, &data, &name)?;
    info!(
        "Imported {} as {:?}: {}x{}, bounds {:.4},{:.4} -> {:.4},{:.4}",
        name,
        format,
        dem.width(),
        dem.height(),
        dem.header.west,
        dem.header.south,
        dem.header.east,
        dem.header.north
    );
    Ok(dem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        let p = Path::new;
        assert_eq!(detect_format(p("N34W119.hgt"), &[]), Some(DemFormat::Hgt));
        assert_eq!(detect_format(p("a.TIF"), &[]), Some(DemFormat::GeoTiff));
        assert_eq!(detect_format(p("a.dt2"), &[]), Some(DemFormat::Dted));
        assert_eq!(detect_format(p("a.dem"), b"SDEM...."), Some(DemFormat::Persisted));
        assert_eq!(detect_format(p("+40-018.DEM"), &[b'a', 0, 0, 0, 1, 9]), Some(DemFormat::FloatHgt));
        assert_eq!(detect_format(p("quad.dem"), b"     SAN FRANCISCO"), Some(DemFormat::Usgs));
        assert_eq!(detect_format(p("notes.txt"), &[]), None);
        assert_eq!(detect_format(p("noext"), &[]), None);
    }

    #[test]
    fn test_format_names() {
        assert_eq!("short-oz".parse::<DemFormat>().unwrap(), DemFormat::ShortOz);
        assert_eq!("GeoTIFF".parse::<DemFormat>().unwrap(), DemFormat::GeoTiff);
        assert!("png".parse::<DemFormat>().is_err());
    }
}
