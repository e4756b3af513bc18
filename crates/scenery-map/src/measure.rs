//! Metric measurements of map features.
//!
//! Uses an equirectangular projection anchored at the feature's mean
//! latitude; good to well under a percent for anything tile sized.

use glam::DVec2;
use scenery_core::constants::METERS_PER_DEGREE;

use crate::pmwx::{FaceId, HalfedgeId, Pmwx};

/// Equirectangular projection about a reference latitude.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    cos_ref_lat: f64,
}

impl LocalProjection {
    pub fn new(ref_lat: f64) -> Self {
        Self {
            cos_ref_lat: ref_lat.to_radians().cos(),
        }
    }

    /// Degrees (lon, lat) to metres east/north of the origin.
    pub fn to_meters(&self, p: DVec2) -> DVec2 {
        DVec2::new(p.x * METERS_PER_DEGREE * self.cos_ref_lat, p.y * METERS_PER_DEGREE)
    }
}

fn ring_area(proj: &LocalProjection, ring: &[DVec2]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = proj.to_meters(ring[i]);
            let b = proj.to_meters(ring[(i + 1) % n]);
            a.perp_dot(b)
        })
        .sum::<f64>()
        / 2.0
}

/// Face area in square metres, holes subtracted. Infinite for the unbounded face.
pub fn face_area_meters(map: &Pmwx, f: FaceId) -> f64 {
    let outer = map.face_outer_ring(f);
    if outer.is_empty() {
        return f64::INFINITY;
    }
    let mean_lat = outer.iter().map(|p| p.y).sum::<f64>() / outer.len() as f64;
    let proj = LocalProjection::new(mean_lat);
    let holes: f64 = map.face_holes(f).iter().map(|h| ring_area(&proj, h)).sum();
    ring_area(&proj, &outer) + holes
}

/// Length of an edge in metres.
pub fn edge_length_meters(map: &Pmwx, h: HalfedgeId) -> f64 {
    let (a, b) = map.segment(h);
    let proj = LocalProjection::new((a.y + b.y) / 2.0);
    proj.to_meters(a).distance(proj.to_meters(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FaceData;

    #[test]
    fn test_equator_degree_square() {
        let map = Pmwx::from_polygon(
            &[
                DVec2::new(0.0, -0.5),
                DVec2::new(1.0, -0.5),
                DVec2::new(1.0, 0.5),
                DVec2::new(0.0, 0.5),
            ],
            &[],
            FaceData::default(),
            1e-6,
        )
        .unwrap();
        let f = map.bounded_faces().next().unwrap();
        let area = face_area_meters(&map, f);
        let expected = METERS_PER_DEGREE * METERS_PER_DEGREE;
        assert!((area - expected).abs() / expected < 1e-6, "Area should be ~{expected}, got {area}");
        for h in map.edges() {
            let len = edge_length_meters(&map, h);
            assert!((len - METERS_PER_DEGREE).abs() / METERS_PER_DEGREE < 1e-4, "Edge should be ~111km, got {len}");
        }
    }

    #[test]
    fn test_longitude_shrinks_with_latitude() {
        let proj = LocalProjection::new(60.0);
        let m = proj.to_meters(DVec2::new(1.0, 0.0));
        assert!((m.x - METERS_PER_DEGREE / 2.0).abs() < 1.0, "Degree of lon at 60N should be ~55.7km, got {}", m.x);
    }
}
