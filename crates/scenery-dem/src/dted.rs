//! DTED level 0/1/2 cells (`.dt0`, `.dt1`, `.dt2`).
//!
//! A cell is one degree square. After the UHL, DSI and ACC headers come
//! one record per longitude line: an 8 byte block header, then
//! sign-magnitude big-endian elevations running south to north, then a
//! 4 byte checksum.

use std::path::Path;

use scenery_core::constants::NO_DATA;
use scenery_core::error::read_file;
use scenery_core::{Result, SceneryError};

use crate::grid::{Dem, DemHeader};

const UHL_LEN: usize = 80;
const DSI_LEN: usize = 648;
const ACC_LEN: usize = 2700;
const DATA_START: usize = UHL_LEN + DSI_LEN + ACC_LEN;
const RECORD_HEADER_LEN: usize = 8;
const RECORD_CHECKSUM_LEN: usize = 4;
const MAX_LINES: usize = 10000;
const DTED_VOID: f32 = -32767.0;

/// Parse `DDDMMSSH` into signed degrees.
fn parse_angle(field: &[u8], negative: u8) -> Option<f64> {
    let (digits, hemi) = field.split_at(7);
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let n = |r: std::ops::Range<usize>| {
        digits[r].iter().fold(0u32, |acc, d| acc * 10 + (d - b'0') as u32) as f64
    };
    let value = n(0..3) + n(3..5) / 60.0 + n(5..7) / 3600.0;
    Some(if hemi[0].eq_ignore_ascii_case(&negative) { -value } else { value })
}

fn parse_count(field: &[u8]) -> Option<usize> {
    std::str::from_utf8(field).ok()?.trim().parse().ok()
}

/// Parse a DTED cell.
pub fn parse_dted(data: &[u8], name: &str) -> Result<Dem> {
    if data.len() < DATA_START {
        return Err(SceneryError::format(name, "file shorter than the DTED headers"));
    }
    if &data[0..3] != b"UHL" || data[3] != b'1' {
        return Err(SceneryError::format(name, "missing UHL1 header"));
    }

    let west = parse_angle(&data[4..12], b'W')
        .ok_or_else(|| SceneryError::format(name, "bad origin longitude"))?;
    let south = parse_angle(&data[12..20], b'S')
        .ok_or_else(|| SceneryError::format(name, "bad origin latitude"))?;
    let (east, north) = (west + 1.0, south + 1.0);

    let width = parse_count(&data[47..51]).unwrap_or(0);
    let height = parse_count(&data[51..55]).unwrap_or(0);
    if !(1..=MAX_LINES).contains(&width) || !(1..=MAX_LINES).contains(&height) {
        return Err(SceneryError::format(name, format!("bad line counts {width}x{height}")));
    }
    if west < -180.0 || east > 180.0 || south < -90.0 || north > 90.0 {
        return Err(SceneryError::format(name, "cell outside the globe"));
    }

    let mut dem = Dem::new(DemHeader::post(west, south, east, north, width, height));
    let mut p = DATA_START;
    for x in 0..width {
        p += RECORD_HEADER_LEN;
        for y in 0..height {
            if p + 2 > data.len() {
                return Err(SceneryError::format(name, "elevation records end early"));
            }
            let (c1, c2) = (data[p], data[p + 1]);
            p += 2;
            let magnitude = ((((c1 & 0x7f) as u16) << 8) | c2 as u16) as f32;
            let v = if c1 & 0x80 != 0 { -magnitude } else { magnitude };
            dem.set(x, height - 1 - y, if v == DTED_VOID { NO_DATA } else { v });
        }
        p += RECORD_CHECKSUM_LEN;
    }
    Ok(dem)
}

pub fn read_dted(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    parse_dted(&data, &path.to_string_lossy())
}
