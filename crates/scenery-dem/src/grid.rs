//! Dem: georeferenced sample grid with a reserved no-data value.

use scenery_core::constants::{is_no_data, NO_DATA};
use scenery_core::{Result, SceneryError};
use serde::{Deserialize, Serialize};

/// Grid georeferencing and dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemHeader {
    /// West edge longitude (degrees).
    pub west: f64,
    /// South edge latitude (degrees).
    pub south: f64,
    /// East edge longitude (degrees).
    pub east: f64,
    /// North edge latitude (degrees).
    pub north: f64,
    /// Number of columns (west to east).
    pub width: usize,
    /// Number of rows (north to south).
    pub height: usize,
    /// Post sampling: the outer rows and columns lie exactly on the bounds.
    /// Otherwise samples are cell centers.
    pub post: bool,
}

impl DemHeader {
    /// Post-sampled header for the given bounds and size.
    pub fn post(west: f64, south: f64, east: f64, north: f64, width: usize, height: usize) -> Self {
        Self { west, south, east, north, width, height, post: true }
    }

    /// Area-sampled (cell-centered) header for the given bounds and size.
    pub fn area(west: f64, south: f64, east: f64, north: f64, width: usize, height: usize) -> Self {
        Self { west, south, east, north, width, height, post: false }
    }

    fn pixel_offset(&self) -> f64 {
        if self.post {
            0.0
        } else {
            0.5
        }
    }

    fn x_divisions(&self) -> f64 {
        let d = if self.post { self.width.saturating_sub(1) } else { self.width };
        d.max(1) as f64
    }

    fn y_divisions(&self) -> f64 {
        let d = if self.post { self.height.saturating_sub(1) } else { self.height };
        d.max(1) as f64
    }

    /// Degrees of longitude between adjacent columns.
    pub fn x_res(&self) -> f64 {
        (self.east - self.west) / self.x_divisions()
    }

    /// Degrees of latitude between adjacent rows.
    pub fn y_res(&self) -> f64 {
        (self.north - self.south) / self.y_divisions()
    }

    /// Longitude of column `x` (fractional columns allowed).
    pub fn x_to_lon(&self, x: f64) -> f64 {
        self.west + (x + self.pixel_offset()) * self.x_res()
    }

    /// Latitude of row `y`. Row 0 is the north row.
    pub fn y_to_lat(&self, y: f64) -> f64 {
        self.north - (y + self.pixel_offset()) * self.y_res()
    }

    /// Fractional column of a longitude.
    pub fn lon_to_x(&self, lon: f64) -> f64 {
        (lon - self.west) / self.x_res() - self.pixel_offset()
    }

    /// Fractional row of a latitude.
    pub fn lat_to_y(&self, lat: f64) -> f64 {
        (self.north - lat) / self.y_res() - self.pixel_offset()
    }

    pub fn sample_count(&self) -> usize {
        self.width * self.height
    }
}

/// Raster grid. Samples are row-major, north row first, west column first.
#[derive(Debug, Clone, PartialEq)]
pub struct Dem {
    pub header: DemHeader,
    pub samples: Vec<f32>,
}

impl Dem {
    /// A grid filled with `NO_DATA`.
    pub fn new(header: DemHeader) -> Self {
        Self {
            samples: vec![NO_DATA; header.sample_count()],
            header,
        }
    }

    /// A grid from existing samples. Fails if the sample count does not match.
    pub fn from_samples(header: DemHeader, samples: Vec<f32>) -> Result<Self> {
        if samples.len() != header.sample_count() {
            return Err(SceneryError::format(
                "dem",
                format!(
                    "{}x{} grid needs {} samples, got {}",
                    header.width,
                    header.height,
                    header.sample_count(),
                    samples.len()
                ),
            ));
        }
        Ok(Self { header, samples })
    }

    pub fn width(&self) -> usize {
        self.header.width
    }

    pub fn height(&self) -> usize {
        self.header.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.header.width + x
    }

    /// Sample at column `x`, row `y`; `NO_DATA` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x >= self.header.width || y >= self.header.height {
            return NO_DATA;
        }
        self.samples[self.index(x, y)]
    }

    /// Sample with coordinates clamped into the grid.
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        if self.samples.is_empty() {
            return NO_DATA;
        }
        let cx = x.clamp(0, self.header.width as isize - 1) as usize;
        let cy = y.clamp(0, self.header.height as isize - 1) as usize;
        self.samples[self.index(cx, cy)]
    }

    /// Write a sample; writes outside the grid are ignored.
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        if x < self.header.width && y < self.header.height {
            let i = self.index(x, y);
            self.samples[i] = v;
        }
    }

    /// Nearest sample index to a geographic position, if inside the grid.
    pub fn nearest_index(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        let x = self.header.lon_to_x(lon).round();
        let y = self.header.lat_to_y(lat).round();
        if x < 0.0 || y < 0.0 || x >= self.header.width as f64 || y >= self.header.height as f64 {
            return None;
        }
        Some((x as usize, y as usize))
    }

    /// Nearest sample value at a geographic position.
    pub fn value_nearest(&self, lon: f64, lat: f64) -> Option<f32> {
        let (x, y) = self.nearest_index(lon, lat)?;
        let v = self.get(x, y);
        (!is_no_data(v)).then_some(v)
    }

    /// Bilinear value at a geographic position.
    /// Falls back to the nearest sample when a neighbour is no-data.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f32> {
        let col = self.header.lon_to_x(lon);
        let row = self.header.lat_to_y(lat);
        let w = self.header.width as f64;
        let h = self.header.height as f64;
        if col < -0.5 || row < -0.5 || col > w - 0.5 || row > h - 0.5 {
            return None;
        }
        let col = col.clamp(0.0, w - 1.0);
        let row = row.clamp(0.0, h - 1.0);

        let c0 = col.floor() as usize;
        let r0 = row.floor() as usize;
        let c1 = (c0 + 1).min(self.header.width - 1);
        let r1 = (r0 + 1).min(self.header.height - 1);
        let fc = col - c0 as f64;
        let fr = row - r0 as f64;

        let e00 = self.get(c0, r0);
        let e01 = self.get(c1, r0);
        let e10 = self.get(c0, r1);
        let e11 = self.get(c1, r1);
        if [e00, e01, e10, e11].iter().any(|&e| is_no_data(e)) {
            let v = self.get(col.round() as usize, row.round() as usize);
            return (!is_no_data(v)).then_some(v);
        }

        let top = e00 as f64 * (1.0 - fc) + e01 as f64 * fc;
        let bot = e10 as f64 * (1.0 - fc) + e11 as f64 * fc;
        Some((top * (1.0 - fr) + bot * fr) as f32)
    }

    /// Minimum and maximum of the valid samples.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.samples
            .iter()
            .copied()
            .filter(|&v| !is_no_data(v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn count_no_data(&self) -> usize {
        self.samples.iter().filter(|&&v| is_no_data(v)).count()
    }

    /// Resample to a new size over the same bounds (bilinear, no-data aware).
    pub fn resize(&self, width: usize, height: usize) -> Dem {
        let header = DemHeader { width, height, ..self.header };
        let mut out = Dem::new(header);
        for y in 0..height {
            let lat = header.y_to_lat(y as f64);
            for x in 0..width {
                let lon = header.x_to_lon(x as f64);
                if let Some(v) = self.value_at(lon, lat) {
                    out.set(x, y, v);
                }
            }
        }
        out
    }

    /// Copy of the columns `x1..x2` and rows `y1..y2` with bounds adjusted.
    pub fn subset(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> Result<Dem> {
        if x1 >= x2 || y1 >= y2 || x2 > self.header.width || y2 > self.header.height {
            return Err(SceneryError::format(
                "dem",
                format!("bad subset {x1},{y1}..{x2},{y2} of {}x{}", self.header.width, self.header.height),
            ));
        }
        let h = &self.header;
        let post = h.post as usize;
        let header = DemHeader {
            west: h.west + x1 as f64 * h.x_res(),
            east: h.west + (x2 - post) as f64 * h.x_res(),
            north: h.north - y1 as f64 * h.y_res(),
            south: h.north - (y2 - post) as f64 * h.y_res(),
            width: x2 - x1,
            height: y2 - y1,
            post: h.post,
        };
        let mut samples = Vec::with_capacity(header.sample_count());
        for y in y1..y2 {
            let start = self.index(x1, y);
            samples.extend_from_slice(&self.samples[start..start + (x2 - x1)]);
        }
        Dem::from_samples(header, samples)
    }

    /// Copy every valid sample of a same-sized grid over this one.
    pub fn overlay(&mut self, other: &Dem) -> Result<()> {
        if other.header.width != self.header.width || other.header.height != self.header.height {
            return Err(SceneryError::format(
                "dem",
                "overlay requires grids of the same size",
            ));
        }
        for (dst, &src) in self.samples.iter_mut().zip(&other.samples) {
            if !is_no_data(src) {
                *dst = src;
            }
        }
        Ok(())
    }

    /// Replace no-data samples with the average of their valid neighbours.
    /// Voids with no valid neighbour are left alone.
    pub fn fill_voids(&mut self) -> usize {
        let w = self.header.width;
        let h = self.header.height;
        let snapshot = self.samples.clone();
        let mut filled = 0;
        for r in 0..h {
            for c in 0..w {
                let idx = r * w + c;
                if !is_no_data(snapshot[idx]) {
                    continue;
                }

                let mut sum = 0.0f64;
                let mut count = 0u32;
                for dr in -1i64..=1 {
                    for dc in -1i64..=1 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = r as i64 + dr;
                        let nc = c as i64 + dc;
                        if nr >= 0 && nr < h as i64 && nc >= 0 && nc < w as i64 {
                            let v = snapshot[nr as usize * w + nc as usize];
                            if !is_no_data(v) {
                                sum += v as f64;
                                count += 1;
                            }
                        }
                    }
                }

                if count > 0 {
                    self.samples[idx] = (sum / count as f64) as f32;
                    filled += 1;
                }
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 5×5 post grid over a one-degree tile with a peak in the middle.
    fn make_test_grid() -> Dem {
        #[rustfmt::skip]
        let samples: Vec<f32> = vec![
            0.0,  0.0,   0.0,  0.0, 0.0,
            0.0, 50.0,  50.0, 50.0, 0.0,
            0.0, 50.0, 100.0, 50.0, 0.0,
            0.0, 50.0,  50.0, 50.0, 0.0,
            0.0,  0.0,   0.0,  0.0, 0.0,
        ];
        Dem::from_samples(DemHeader::post(10.0, 20.0, 11.0, 21.0, 5, 5), samples).unwrap()
    }

    #[test]
    fn test_post_coordinates_touch_both_edges() {
        let h = DemHeader::post(-119.0, 34.0, -118.0, 35.0, 3601, 3601);
        assert_eq!(h.x_to_lon(0.0), -119.0);
        assert!((h.x_to_lon(3600.0) - -118.0).abs() < 1e-12);
        assert_eq!(h.y_to_lat(0.0), 35.0, "Row 0 is the north edge");
        assert!((h.y_to_lat(3600.0) - 34.0).abs() < 1e-12);
    }

    #[test]
    fn test_area_coordinates_are_cell_centers() {
        let h = DemHeader::area(0.0, 0.0, 10.0, 10.0, 10, 10);
        assert!((h.x_to_lon(0.0) - 0.5).abs() < 1e-12);
        assert!((h.y_to_lat(9.0) - 0.5).abs() < 1e-12);
        assert!((h.lon_to_x(9.5) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_affine_round_trip_has_no_drift() {
        let h = DemHeader::post(-119.0, 34.0, -118.0, 35.0, 1201, 1201);
        for x in [0usize, 1, 600, 1199, 1200] {
            let mut v = x as f64;
            for _ in 0..50 {
                v = h.lon_to_x(h.x_to_lon(v));
            }
            assert!((v - x as f64).abs() < 1e-6, "Column {x} drifted to {v}");
        }
    }

    #[test]
    fn test_value_at_center_and_interpolation() {
        let grid = make_test_grid();
        let h = grid.header;
        let e = grid.value_at(h.x_to_lon(2.0), h.y_to_lat(2.0)).unwrap();
        assert!((e - 100.0).abs() < 1e-3, "Peak elevation should be 100m, got {e}");

        let e = grid.value_at(h.x_to_lon(2.0), h.y_to_lat(1.5)).unwrap();
        assert!((e - 75.0).abs() < 1e-3, "Interpolated elevation should be ~75m, got {e}");

        assert!(grid.value_at(12.0, 20.5).is_none(), "Far position should be outside grid");
    }

    #[test]
    fn test_value_at_falls_back_near_voids() {
        let mut grid = make_test_grid();
        grid.set(3, 2, NO_DATA);
        let h = grid.header;
        let e = grid.value_at(h.x_to_lon(2.2), h.y_to_lat(2.0)).unwrap();
        assert_eq!(e, 100.0);
    }

    #[test]
    fn test_subset_bounds() {
        let grid = make_test_grid();
        let sub = grid.subset(1, 1, 4, 4).unwrap();
        assert_eq!((sub.width(), sub.height()), (3, 3));
        assert!((sub.header.west - 10.25).abs() < 1e-12);
        assert!((sub.header.east - 10.75).abs() < 1e-12);
        assert!((sub.header.north - 20.75).abs() < 1e-12);
        assert!((sub.header.south - 20.25).abs() < 1e-12);
        assert_eq!(sub.get(1, 1), 100.0);
        assert!(grid.subset(3, 3, 2, 4).is_err());
    }

    #[test]
    fn test_fill_voids() {
        let mut grid = make_test_grid();
        grid.set(2, 2, NO_DATA);
        assert_eq!(grid.fill_voids(), 1);
        assert_eq!(grid.get(2, 2), 50.0, "Center void is the average of its 50m ring");
    }

    #[test]
    fn test_fill_voids_corner() {
        let mut grid = Dem::from_samples(
            DemHeader::post(0.0, 0.0, 1.0, 1.0, 2, 2),
            vec![NO_DATA, 100.0, 100.0, 100.0],
        )
        .unwrap();
        grid.fill_voids();
        assert_eq!(grid.get(0, 0), 100.0);
    }

    #[test]
    fn test_resize_keeps_corners() {
        let grid = make_test_grid();
        let big = grid.resize(9, 9);
        assert_eq!(big.get(4, 4), 100.0);
        assert_eq!(big.get(0, 0), 0.0);
        assert_eq!(big.count_no_data(), 0);
    }

    #[test]
    fn test_min_max_skips_no_data() {
        let mut grid = make_test_grid();
        grid.set(0, 0, NO_DATA);
        assert_eq!(grid.min_max(), Some((0.0, 100.0)));
        assert_eq!(Dem::new(DemHeader::post(0.0, 0.0, 1.0, 1.0, 2, 2)).min_max(), None);
    }
}
