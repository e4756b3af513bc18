//! USGS "natural format" ASCII DEMs.
//!
//! Only geographic grids with arc-second ground units and metre elevations
//! are accepted, with one column per profile. The header is a fixed-column
//! 1024 byte record; each profile starts on a fresh 1024 byte record and
//! may continue into following records.

use std::path::Path;

use scenery_core::error::read_file;
use scenery_core::{Result, SceneryError};
use tracing::debug;

use crate::grid::{Dem, DemHeader};

const RECORD_LEN: usize = 1024;
const FIRST_RECORD_SAMPLES: usize = 146;
const CONTINUATION_SAMPLES: usize = 170;
const FIRST_RECORD_DATA_OFFSET: usize = 144;

const GROUND_UNITS_ARC_SECONDS: i64 = 3;
const ELEVATION_UNITS_METERS: i64 = 2;

/// Cursor over a fixed-width field.
struct Field<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Field<'a> {
    /// The `start..end` columns of `data`, clipped to the buffer.
    fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(data.len());
        let start = start.min(end);
        Self { bytes: &data[start..end], pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn sign(&mut self) -> f64 {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                -1.0
            }
            Some(b'+') => {
                self.pos += 1;
                1.0
            }
            _ => 1.0,
        }
    }

    /// Spaces, optional sign, then digits. No digits reads as zero.
    fn int(&mut self) -> i64 {
        self.skip_spaces();
        let sign = self.sign() as i64;
        let mut v = 0i64;
        while let Some(c @ b'0'..=b'9') = self.peek() {
            v = v.saturating_mul(10).saturating_add((c - b'0') as i64);
            self.pos += 1;
        }
        v * sign
    }

    /// `[sign]0.digits[DdEe]exp`, as written by the USGS Fortran producers.
    /// Anything else reads as zero.
    fn float(&mut self) -> f64 {
        self.skip_spaces();
        let sign = self.sign();
        if self.peek() != Some(b'0') {
            return 0.0;
        }
        self.pos += 1;
        if self.peek() != Some(b'.') {
            return 0.0;
        }
        self.pos += 1;

        let mut mantissa = 0.0f64;
        let mut digits = 0i32;
        while let Some(c @ b'0'..=b'9') = self.peek() {
            mantissa = mantissa * 10.0 + (c - b'0') as f64;
            digits += 1;
            self.pos += 1;
        }
        if !matches!(self.peek(), Some(b'D' | b'd' | b'E' | b'e')) {
            return 0.0;
        }
        self.pos += 1;
        let exponent = self.int() as i32;
        let shift = digits - exponent;
        if shift > 0 {
            sign * (mantissa / 10f64.powi(shift))
        } else {
            sign * (mantissa * 10f64.powi(-shift))
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(self.bytes).trim().to_string()
    }
}

/// Parse a USGS ASCII DEM.
pub fn parse_usgs(data: &[u8], name: &str) -> Result<Dem> {
    if data.len() < RECORD_LEN {
        return Err(SceneryError::format(name, "file shorter than the header record"));
    }

    let title = Field::new(data, 0, 40).text();
    let geo = Field::new(data, 156, 162).int();
    let hunits = Field::new(data, 528, 534).int();
    let vunits = Field::new(data, 534, 540).int();
    let mut corners = Field::new(data, 546, 738);
    let west = corners.float() / 3600.0;
    let south = corners.float() / 3600.0;
    corners.float();
    corners.float();
    let east = corners.float() / 3600.0;
    let north = corners.float() / 3600.0;
    let mut counts = Field::new(data, 852, 864);
    let k = counts.int();
    let profiles = counts.int();

    if geo != 0 {
        return Err(SceneryError::format(name, "not geographically projected"));
    }
    if hunits != GROUND_UNITS_ARC_SECONDS {
        return Err(SceneryError::format(name, "ground units are not arc seconds"));
    }
    if vunits != ELEVATION_UNITS_METERS {
        return Err(SceneryError::format(name, "elevation units are not metres"));
    }
    if k != 1 {
        return Err(SceneryError::format(name, "expected a single row of profiles"));
    }
    if profiles <= 0 {
        return Err(SceneryError::format(name, "no profiles"));
    }
    debug!(%title, profiles, west, south, east, north, "USGS header");

    let width = profiles as usize;
    let mut dem: Option<Dem> = None;
    let mut p = RECORD_LEN;
    let mut records = 0usize;

    for _ in 0..width {
        if p >= data.len() {
            return Err(SceneryError::format(name, "profile record past end of file"));
        }
        let mut ids = Field::new(data, p, p + 12);
        let oy = ids.int() - 1;
        let ox = ids.int() - 1;
        let mut sizes = Field::new(data, p + 12, p + 24);
        let count = sizes.int();
        let pk = sizes.int();
        if pk != 1 {
            return Err(SceneryError::format(name, "expected one column per profile"));
        }
        if count <= 0 {
            return Err(SceneryError::format(name, "empty profile"));
        }

        let grid = dem.get_or_insert_with(|| {
            Dem::new(DemHeader::post(west, south, east, north, width, count as usize))
        });
        if grid.height() != count as usize {
            return Err(SceneryError::format(name, "profiles have different lengths"));
        }
        if ox < 0 || ox as usize >= width || oy < 0 {
            return Err(SceneryError::format(name, format!("bad profile origin {},{}", ox + 1, oy + 1)));
        }

        let h = grid.height();
        let mut remaining = count as usize;
        let mut y = oy as usize;
        let mut first = true;
        while remaining > 0 {
            let (start, per_record) = if first {
                (p + FIRST_RECORD_DATA_OFFSET, FIRST_RECORD_SAMPLES)
            } else {
                (p, CONTINUATION_SAMPLES)
            };
            let mut samples = Field::new(data, start, data.len());
            let n = per_record.min(remaining);
            for _ in 0..n {
                let elev = samples.int();
                if start + samples.pos >= data.len() {
                    return Err(SceneryError::format(name, "sample data overruns the file"));
                }
                // Profiles run south to north.
                if y < h {
                    grid.set(ox as usize, h - 1 - y, elev as f32);
                }
                y += 1;
            }
            remaining -= n;
            if remaining > 0 {
                p += RECORD_LEN;
                records += 1;
                first = false;
            }
        }
        p += RECORD_LEN;
        records += 1;
    }

    debug!(records, "USGS profiles read");
    dem.ok_or_else(|| SceneryError::format(name, "no profiles"))
}

pub fn read_usgs(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    parse_usgs(&data, &path.to_string_lossy())
}
