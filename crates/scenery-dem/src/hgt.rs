//! SRTM-style HGT tiles.
//!
//! Raw HGT files are square arrays of big-endian i16 posts covering a
//! 1° × 1° tile, north row first. The filename encodes the SW corner
//! (e.g. `N34W119.hgt`). The float variant (`+40-018.DEM`) carries a
//! five byte header followed by big-endian f32 samples stored column by
//! column, south to north. The Australian short grid uses the same
//! naming with headerless big-endian i16 rows, south row first.

use std::path::Path;

use scenery_core::constants::{is_no_data, NO_DATA};
use scenery_core::error::read_file;
use scenery_core::{Result, SceneryError};
use tracing::warn;

use crate::grid::{Dem, DemHeader};

/// Void value in HGT files.
const HGT_VOID: i16 = -32768;

/// Leading bytes of a float HGT file.
const FLOAT_HGT_MAGIC: [u8; 5] = [b'a', 0, 0, 0, 1];

/// Parse an HGT-style filename into the SW corner `(lat, lon)`.
///
/// Accepts `N34W119.hgt`, `S10E045.HGT` and the signed form `+40-018.DEM`.
/// Any directory prefix is ignored.
pub fn parse_hgt_filename(filename: &str) -> Option<(f64, f64)> {
    let base = filename.rsplit(['/', '\\']).next()?;
    let stem = base.split('.').next()?;
    let mut chars = stem.char_indices();

    let (_, lat_c) = chars.next()?;
    let lat_sign = match lat_c {
        'N' | 'n' | '+' => 1.0,
        'S' | 's' | '-' => -1.0,
        _ => return None,
    };
    let rest = &stem[1..];
    let lon_pos = rest.find(|c: char| !c.is_ascii_digit())?;
    let lat: f64 = rest[..lon_pos].parse().ok()?;

    let lon_part = &rest[lon_pos..];
    let lon_sign = match lon_part.chars().next()? {
        'E' | 'e' | '+' => 1.0,
        'W' | 'w' | '-' => -1.0,
        _ => return None,
    };
    let digits: String = lon_part[1..].chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let lon: f64 = digits.parse().ok()?;

    Some((lat * lat_sign, lon * lon_sign))
}

/// Side length of a square grid of `bytes_per_sample` samples, if exact.
fn square_side(byte_count: usize, bytes_per_sample: usize) -> Option<usize> {
    if byte_count == 0 || byte_count % bytes_per_sample != 0 {
        return None;
    }
    let samples = byte_count / bytes_per_sample;
    let side = (samples as f64).sqrt().round() as usize;
    (side >= 2 && side * side == samples).then_some(side)
}

fn tile_header(name: &str, side: usize) -> Result<DemHeader> {
    let (lat, lon) = parse_hgt_filename(name).ok_or_else(|| {
        SceneryError::format(name, "cannot parse tile coordinates from filename")
    })?;
    Ok(DemHeader::post(lon, lat, lon + 1.0, lat + 1.0, side, side))
}

/// Parse raw HGT bytes. `name` supplies the tile origin.
pub fn parse_hgt(data: &[u8], name: &str) -> Result<Dem> {
    let side = square_side(data.len(), 2).ok_or_else(|| {
        SceneryError::format(
            name,
            format!("{} bytes is not a square grid of 16-bit samples", data.len()),
        )
    })?;
    let header = tile_header(name, side)?;

    let samples = data
        .chunks_exact(2)
        .map(|b| match i16::from_be_bytes([b[0], b[1]]) {
            HGT_VOID => NO_DATA,
            v => v as f32,
        })
        .collect();
    Dem::from_samples(header, samples)
}

/// Load a raw HGT file.
pub fn read_hgt(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    parse_hgt(&data, &path.to_string_lossy())
}

/// Encode a grid as raw HGT: big-endian i16, north row first.
/// Values are rounded; no-data becomes the HGT void.
pub fn encode_hgt(dem: &Dem) -> Vec<u8> {
    let mut out = Vec::with_capacity(dem.samples.len() * 2);
    for &v in &dem.samples {
        let s = if is_no_data(v) {
            HGT_VOID
        } else {
            v.round().clamp(i16::MIN as f32 + 1.0, i16::MAX as f32) as i16
        };
        out.extend_from_slice(&s.to_be_bytes());
    }
    out
}

pub fn write_hgt(dem: &Dem, path: &Path) -> Result<()> {
    std::fs::write(path, encode_hgt(dem)).map_err(|e| SceneryError::io(path, e))
}

/// Parse a float HGT (`.DEM`) tile. The five leading bytes are skipped;
/// an unexpected preamble is only logged.
pub fn parse_float_hgt(data: &[u8], name: &str) -> Result<Dem> {
    if data.len() < FLOAT_HGT_MAGIC.len() {
        return Err(SceneryError::format(name, "file shorter than the float HGT header"));
    }
    if data[..5] != FLOAT_HGT_MAGIC {
        warn!(name, preamble = ?&data[..5], "Unexpected float HGT header");
    }
    let body = &data[5..];
    let side = square_side(body.len(), 4).ok_or_else(|| {
        SceneryError::format(
            name,
            format!("{} bytes is not a square grid of float samples", body.len()),
        )
    })?;
    let header = tile_header(name, side)?;
    let mut dem = Dem::new(header);

    // Column-major, south to north within a column.
    let mut values = body
        .chunks_exact(4)
        .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]));
    for x in 0..side {
        for y in 0..side {
            if let Some(v) = values.next() {
                dem.set(x, side - 1 - y, v);
            }
        }
    }
    Ok(dem)
}

pub fn read_float_hgt(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    parse_float_hgt(&data, &path.to_string_lossy())
}

/// Parse an Australian short grid tile: square, big-endian i16, rows
/// south to north.
pub fn parse_short_oz(data: &[u8], name: &str) -> Result<Dem> {
    let side = square_side(data.len(), 2).ok_or_else(|| {
        SceneryError::format(
            name,
            format!("{} bytes is not a square grid of 16-bit samples", data.len()),
        )
    })?;
    let mut dem = Dem::new(tile_header(name, side)?);
    for (i, b) in data.chunks_exact(2).enumerate() {
        let (x, y) = (i % side, i / side);
        let v = match i16::from_be_bytes([b[0], b[1]]) {
            HGT_VOID => NO_DATA,
            v => v as f32,
        };
        dem.set(x, side - 1 - y, v);
    }
    Ok(dem)
}

pub fn read_short_oz(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    parse_short_oz(&data, &path.to_string_lossy())
}

/// Encode a grid in the float HGT layout.
pub fn encode_float_hgt(dem: &Dem) -> Vec<u8> {
    let (w, h) = (dem.width(), dem.height());
    let mut out = Vec::with_capacity(5 + w * h * 4);
    out.extend_from_slice(&FLOAT_HGT_MAGIC);
    for x in 0..w {
        for y in 0..h {
            out.extend_from_slice(&dem.get(x, h - 1 - y).to_be_bytes());
        }
    }
    out
}

pub fn write_float_hgt(dem: &Dem, path: &Path) -> Result<()> {
    std::fs::write(path, encode_float_hgt(dem)).map_err(|e| SceneryError::io(path, e))
}
