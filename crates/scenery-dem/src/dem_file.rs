//! `.dem` binary format: the persisted grid codec.
//!
//! 64 byte little-endian header followed by `width * height` f32 samples,
//! north row first.
//!
//! | offset | size | field            |
//! |--------|------|------------------|
//! | 0      | 4    | magic `SDEM`     |
//! | 4      | 2    | version          |
//! | 6      | 2    | flags            |
//! | 8      | 32   | W, S, E, N (f64) |
//! | 40     | 4    | width (u32)      |
//! | 44     | 4    | height (u32)     |
//! | 48     | 16   | reserved         |

use std::io::{self, Write};
use std::path::Path;

use scenery_core::error::read_file;
use scenery_core::{Result, SceneryError};

use crate::grid::{Dem, DemHeader};

/// .dem magic bytes.
const DEM_MAGIC: [u8; 4] = *b"SDEM";

/// Current format version.
const DEM_VERSION: u16 = 1;

/// Header flag: post sampling.
const FLAG_POST: u16 = 0x0001;

/// Total header size in bytes.
pub const HEADER_SIZE: usize = 64;

fn f64_at(data: &[u8], offset: usize) -> f64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[offset..offset + 8]);
    f64::from_le_bytes(b)
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Decode a grid, returning it and the number of bytes consumed.
pub fn decode_dem(data: &[u8], name: &str) -> Result<(Dem, usize)> {
    if data.len() < HEADER_SIZE {
        return Err(SceneryError::format(name, "file too small for .dem header"));
    }
    if data[0..4] != DEM_MAGIC {
        return Err(SceneryError::format(name, "invalid .dem magic bytes"));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != DEM_VERSION {
        return Err(SceneryError::format(name, format!("unsupported .dem version: {version}")));
    }
    let flags = u16::from_le_bytes([data[6], data[7]]);

    let header = DemHeader {
        west: f64_at(data, 8),
        south: f64_at(data, 16),
        east: f64_at(data, 24),
        north: f64_at(data, 32),
        width: u32_at(data, 40) as usize,
        height: u32_at(data, 44) as usize,
        post: flags & FLAG_POST != 0,
    };

    let end = header
        .sample_count()
        .checked_mul(4)
        .and_then(|n| n.checked_add(HEADER_SIZE))
        .filter(|&end| end <= data.len())
        .ok_or_else(|| SceneryError::format(name, "file too small for sample data"))?;

    let samples = data[HEADER_SIZE..end]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((Dem::from_samples(header, samples)?, end))
}

/// Encode a grid into `writer`.
pub fn encode_dem<W: Write>(dem: &Dem, writer: &mut W) -> io::Result<()> {
    let h = &dem.header;
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&DEM_MAGIC);
    header[4..6].copy_from_slice(&DEM_VERSION.to_le_bytes());
    let flags = if h.post { FLAG_POST } else { 0 };
    header[6..8].copy_from_slice(&flags.to_le_bytes());
    header[8..16].copy_from_slice(&h.west.to_le_bytes());
    header[16..24].copy_from_slice(&h.south.to_le_bytes());
    header[24..32].copy_from_slice(&h.east.to_le_bytes());
    header[32..40].copy_from_slice(&h.north.to_le_bytes());
    header[40..44].copy_from_slice(&(h.width as u32).to_le_bytes());
    header[44..48].copy_from_slice(&(h.height as u32).to_le_bytes());
    writer.write_all(&header)?;

    let mut body = Vec::with_capacity(dem.samples.len() * 4);
    for &v in &dem.samples {
        body.extend_from_slice(&v.to_le_bytes());
    }
    writer.write_all(&body)
}

/// Load a `.dem` file.
pub fn read_dem(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    let (dem, _) = decode_dem(&data, &path.to_string_lossy())?;
    Ok(dem)
}

/// Write a `.dem` file.
pub fn write_dem(dem: &Dem, path: &Path) -> Result<()> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + dem.samples.len() * 4);
    encode_dem(dem, &mut buf).map_err(|e| SceneryError::io(path, e))?;
    std::fs::write(path, buf).map_err(|e| SceneryError::io(path, e))
}
