//! IDA/WinDisp image files: one byte per sample with a linear scale.
//!
//! The 512 byte header carries the dimensions, a missing-value byte and
//! a slope/intercept pair stored as Turbo Pascal `Real48`. Rows are north
//! first. The format has no georeferencing, so bounds are left at zero.

use std::path::Path;

use scenery_core::constants::NO_DATA;
use scenery_core::error::read_file;
use scenery_core::{Result, SceneryError};
use tracing::debug;

use crate::grid::{Dem, DemHeader};

const IDA_HEADER_LEN: usize = 512;

/// Decode a little-endian 6 byte Turbo Pascal real.
///
/// Byte 0 is the exponent biased by 129 (zero means the value is zero),
/// bytes 1..=5 the mantissa with the sign in the top bit of byte 5.
pub fn real48(p: &[u8; 6]) -> f64 {
    if p[0] == 0 {
        return 0.0;
    }
    let negative = p[5] & 0x80 != 0;
    let exponent = p[0] as i32 - 0x81;
    let frac = ((((p[1] as f64 / 256.0 + p[2] as f64) / 256.0 + p[3] as f64) / 256.0
        + p[4] as f64)
        / 256.0
        + (p[5] & 0x7f) as f64)
        / 256.0;
    let m = (1.0 + 2.0 * frac) * 2f64.powi(exponent);
    if negative {
        -m
    } else {
        m
    }
}

fn real48_at(data: &[u8], offset: usize) -> f64 {
    let mut b = [0u8; 6];
    b.copy_from_slice(&data[offset..offset + 6]);
    real48(&b)
}

/// Parse an IDA image.
pub fn parse_ida(data: &[u8], name: &str) -> Result<Dem> {
    if data.len() < IDA_HEADER_LEN {
        return Err(SceneryError::format(name, "file shorter than the IDA header"));
    }
    let height = u16::from_le_bytes([data[30], data[31]]) as usize;
    let width = u16::from_le_bytes([data[32], data[33]]) as usize;
    let missing = data[170];
    let slope = real48_at(data, 171);
    let intercept = real48_at(data, 177);

    if width == 0 || height == 0 {
        return Err(SceneryError::format(name, "empty image"));
    }
    if data.len() < IDA_HEADER_LEN + width * height {
        return Err(SceneryError::format(
            name,
            format!("{width}x{height} image does not fit in {} bytes", data.len()),
        ));
    }
    debug!(width, height, slope, intercept, missing, "IDA header");

    let body = &data[IDA_HEADER_LEN..IDA_HEADER_LEN + width * height];
    let samples = body
        .iter()
        .map(|&v| {
            if v == missing {
                NO_DATA
            } else {
                (slope * v as f64 + intercept) as f32
            }
        })
        .collect();
    Dem::from_samples(DemHeader::post(0.0, 0.0, 0.0, 0.0, width, height), samples)
}

pub fn read_ida(path: &Path) -> Result<Dem> {
    let data = read_file(path)?;
    parse_ida(&data, &path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real48_values() {
        assert_eq!(real48(&[0, 1, 2, 3, 4, 5]), 0.0, "Zero exponent is zero");
        assert_eq!(real48(&[0x81, 0, 0, 0, 0, 0]), 1.0);
        assert_eq!(real48(&[0x82, 0, 0, 0, 0, 0]), 2.0);
        assert_eq!(real48(&[0x80, 0, 0, 0, 0, 0]), 0.5);
        assert_eq!(real48(&[0x81, 0, 0, 0, 0, 0x80]), -1.0);
        // 1.5 = 1 + 0.5, top mantissa bit set
        assert_eq!(real48(&[0x81, 0, 0, 0, 0, 0x40]), 1.5);
    }

    fn ida_bytes(width: u16, height: u16, missing: u8, body: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; IDA_HEADER_LEN];
        data[30..32].copy_from_slice(&height.to_le_bytes());
        data[32..34].copy_from_slice(&width.to_le_bytes());
        data[170] = missing;
        data[171..177].copy_from_slice(&[0x82, 0, 0, 0, 0, 0]); // slope 2
        data[177..183].copy_from_slice(&[0x84, 0, 0, 0, 0, 0x80]); // intercept -8
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_parse_ida_scales_samples() {
        let data = ida_bytes(3, 2, 255, &[10, 20, 255, 0, 1, 2]);
        let dem = parse_ida(&data, "ndvi.img").unwrap();
        assert_eq!((dem.width(), dem.height()), (3, 2));
        assert_eq!(dem.get(0, 0), 12.0, "2*10 - 8");
        assert_eq!(dem.get(1, 0), 32.0);
        assert_eq!(dem.get(2, 0), NO_DATA, "Missing byte becomes no-data");
        assert_eq!(dem.get(0, 1), -8.0);
        assert_eq!(dem.header.west, 0.0);
    }

    #[test]
    fn test_parse_ida_truncated() {
        let data = ida_bytes(3, 2, 255, &[1, 2, 3]);
        assert!(matches!(parse_ida(&data, "x.img"), Err(SceneryError::Format { .. })));
        assert!(parse_ida(&[0u8; 100], "x.img").is_err());
    }
}
