//! Whole-world raw byte images (`.img`).
//!
//! One unsigned byte per sample, no header. The image covers the globe at a
//! fixed number of samples per degree, north row first, with the date line
//! on the left edge. Files run to hundreds of megabytes, so a tile is cut
//! out by seeking to each of its rows instead of loading the whole image.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use scenery_core::{Result, SceneryError};
use tracing::debug;

use crate::grid::{Dem, DemHeader};

/// Samples per degree of the land-use world images.
pub const RAW_IMG_SAMPLES_PER_DEGREE: usize = 120;

/// Cut the whole-degree box `west..east`, `south..north` out of a world
/// image with `per_degree` samples per degree. The result is post sampled,
/// so the shared east and north edges are included; the east edge wraps
/// across the date line and the south pole row repeats the last image row.
pub fn extract_raw_img<R: Read + Seek>(
    reader: &mut R,
    name: &str,
    per_degree: usize,
    west: i32,
    south: i32,
    east: i32,
    north: i32,
) -> Result<Dem> {
    if per_degree == 0 {
        return Err(SceneryError::format(name, "zero samples per degree"));
    }
    if west >= east || south >= north || west < -180 || east > 180 || south < -90 || north > 90 {
        return Err(SceneryError::format(
            name,
            format!("bad extraction box W{west} S{south} E{east} N{north}"),
        ));
    }

    let image_w = 360 * per_degree;
    let image_h = 180 * per_degree;
    let width = (east - west) as usize * per_degree + 1;
    let height = (north - south) as usize * per_degree + 1;
    let x_off = (west + 180) as usize * per_degree;
    let y_off = (90 - north) as usize * per_degree;
    debug!(name, width, height, x_off, y_off, "Extracting raw image tile");

    let mut dem = Dem::new(DemHeader::post(
        west as f64,
        south as f64,
        east as f64,
        north as f64,
        width,
        height,
    ));
    let mut row = vec![0u8; image_w];
    for y in 0..height {
        let src_row = (y_off + y).min(image_h - 1);
        reader
            .seek(SeekFrom::Start((src_row * image_w) as u64))
            .and_then(|_| reader.read_exact(&mut row))
            .map_err(|e| SceneryError::format(name, format!("short image at row {src_row}: {e}")))?;
        for x in 0..width {
            dem.set(x, y, row[(x_off + x) % image_w] as f32);
        }
    }

    if let Some((lo, hi)) = dem.min_max() {
        debug!(name, lo, hi, "Raw image value range");
    }
    Ok(dem)
}

/// Cut a box out of a raw world image file at the standard resolution.
pub fn read_raw_img(path: &Path, west: i32, south: i32, east: i32, north: i32) -> Result<Dem> {
    let file = File::open(path).map_err(|e| SceneryError::io(path, e))?;
    let mut reader = BufReader::new(file);
    extract_raw_img(
        &mut reader,
        &path.to_string_lossy(),
        RAW_IMG_SAMPLES_PER_DEGREE,
        west,
        south,
        east,
        north,
    )
}
