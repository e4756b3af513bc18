//! GeoTIFF elevation tiles.
//!
//! The georeferencing comes from the model tie point and pixel scale tags;
//! bounds within a pixel of a whole degree are rounded to it. The image is widened by one row
//! and one column so that a 1200 sample recut gains the shared north and
//! east edges of a post-sampled tile.

use std::io::Cursor;
use std::path::Path;

use scenery_core::constants::NO_DATA;
use scenery_core::error::read_file;
use scenery_core::{Result, SceneryError};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

use crate::grid::{Dem, DemHeader};

/// Samples beyond this magnitude in 16-bit tiles are voids.
const SRTM_VOID_LIMIT: f32 = 30000.0;

fn tiff_err(name: &str, e: tiff::TiffError) -> SceneryError {
    SceneryError::format(name, format!("TIFF: {e}"))
}

/// Round to the nearest whole degree when closer than one pixel.
fn snap_degree(v: f64, pixel: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < pixel.abs() {
        r
    } else {
        v
    }
}

fn void_16(v: f32) -> f32 {
    if !(-SRTM_VOID_LIMIT..=SRTM_VOID_LIMIT).contains(&v) {
        NO_DATA
    } else {
        v
    }
}

/// Convert decoded samples, applying the SRTM void conventions.
fn to_samples(name: &str, image: DecodingResult) -> Result<Vec<f32>> {
    let samples = match image {
        DecodingResult::I16(d) => d.into_iter().map(|v| void_16(v as f32)).collect(),
        DecodingResult::U16(d) => d.into_iter().map(|v| void_16(v as f32)).collect(),
        DecodingResult::U8(d) => d
            .into_iter()
            .map(|v| if v > 127 { NO_DATA } else { v as f32 })
            .collect(),
        DecodingResult::I8(d) => d.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(d) => d
            .into_iter()
            .map(|v| if v.is_finite() { v } else { NO_DATA })
            .collect(),
        _ => return Err(SceneryError::format(name, "unsupported GeoTIFF sample type")),
    };
    Ok(samples)
}

/// Parse GeoTIFF bytes.
pub fn parse_geotiff(data: &[u8], name: &str) -> Result<Dem> {
    let mut decoder = Decoder::new(Cursor::new(data)).map_err(|e| tiff_err(name, e))?;
    let (w, h) = decoder.dimensions().map_err(|e| tiff_err(name, e))?;
    let (w, h) = (w as usize, h as usize);
    if w == 0 || h == 0 {
        return Err(SceneryError::format(name, "empty image"));
    }

    let tie = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| SceneryError::format(name, "missing GeoTIFF tie point"))?;
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| SceneryError::format(name, "missing GeoTIFF pixel scale"))?;
    if tie.len() < 6 || scale.len() < 2 {
        return Err(SceneryError::format(name, "short GeoTIFF georeferencing tags"));
    }

    let west = tie[3] - tie[0] * scale[0];
    let north = tie[4] + tie[1] * scale[1];
    let east = west + w as f64 * scale[0];
    let south = north - h as f64 * scale[1];
    debug!(w, h, west, south, east, north, "GeoTIFF corners");

    let image = decoder.read_image().map_err(|e| tiff_err(name, e))?;
    let pixels = to_samples(name, image)?;
    if pixels.len() != w * h {
        return Err(SceneryError::format(name, "only single-band GeoTIFFs are supported"));
    }

    let header = DemHeader::post(
        snap_degree(west, scale[0]),
        snap_degree(south, scale[1]),
        snap_degree(east, scale[0]),
        snap_degree(north, scale[1]),
        w + 1,
        h + 1,
    );
    let mut dem = Dem::new(header);
    for (r, row) in pixels.chunks_exact(w).enumerate() {
        for (c, &v) in row.iter().enumerate() {
            dem.set(c, r + 1, v);
            if r == 0 {
                dem.set(c, 0, v);
            }
        }
    }
    for r in 0..=h {
        let v = dem.get(w - 1, r);
        dem.set(w, r, v);
    }
    Ok(dem)
}

pub fn read_geotiff(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    parse_geotiff(&data, &path.to_string_lossy())
}
