//! Geometric predicates behind a narrow interface.
//!
//! Map topology never touches raw floating point. Every coordinate is
//! snapped onto an integer lattice when it enters a map, and the
//! predicates below are evaluated exactly on lattice points. Swapping the
//! kernel changes the lattice and the constructions, not the topology code.

use std::cmp::Ordering;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A point on the snapping lattice. Ordered lexicographically (x, then y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LatticePoint {
    pub x: i64,
    pub y: i64,
}

impl LatticePoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Clockwise,
    Collinear,
    CounterClockwise,
}

/// Where a point lies relative to a closed ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Inside,
    Boundary,
    Outside,
}

/// Twice the signed area of triangle `abc`.
#[inline]
pub fn cross(a: LatticePoint, b: LatticePoint, c: LatticePoint) -> i128 {
    let abx = (b.x - a.x) as i128;
    let aby = (b.y - a.y) as i128;
    let acx = (c.x - a.x) as i128;
    let acy = (c.y - a.y) as i128;
    abx * acy - aby * acx
}

#[inline]
fn dot(a: LatticePoint, b: LatticePoint, c: LatticePoint) -> i128 {
    (b.x - a.x) as i128 * (c.x - a.x) as i128 + (b.y - a.y) as i128 * (c.y - a.y) as i128
}

/// True if `p` lies on segment `ab` strictly between its endpoints.
pub fn strictly_inside_segment(p: LatticePoint, a: LatticePoint, b: LatticePoint) -> bool {
    if cross(a, b, p) != 0 {
        return false;
    }
    let t = dot(a, b, p);
    t > 0 && t < dot(a, b, b)
}

/// Twice the signed area of a closed ring (positive for CCW).
pub fn ring_area2(ring: &[LatticePoint]) -> i128 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128
        })
        .sum()
}

/// Compare two direction vectors by angle, counterclockwise from +x.
pub fn compare_directions(d1: (i64, i64), d2: (i64, i64)) -> Ordering {
    let half = |d: (i64, i64)| if d.1 > 0 || (d.1 == 0 && d.0 > 0) { 0 } else { 1 };
    half(d1).cmp(&half(d2)).then_with(|| {
        let c = d1.0 as i128 * d2.1 as i128 - d1.1 as i128 * d2.0 as i128;
        0.cmp(&c)
    })
}

/// The capability set map construction relies on.
pub trait Kernel {
    /// Snap a coordinate onto the lattice.
    fn snap(&self, p: DVec2) -> LatticePoint;

    /// Coordinate of a lattice point.
    fn point(&self, p: LatticePoint) -> DVec2;

    fn orientation(&self, a: LatticePoint, b: LatticePoint, c: LatticePoint) -> Orientation {
        match cross(a, b, c).cmp(&0) {
            Ordering::Greater => Orientation::CounterClockwise,
            Ordering::Less => Orientation::Clockwise,
            Ordering::Equal => Orientation::Collinear,
        }
    }

    /// Snapped crossing point of two segments whose interiors cross
    /// properly (not at an endpoint, not collinear).
    fn segment_intersection(
        &self,
        a0: LatticePoint,
        a1: LatticePoint,
        b0: LatticePoint,
        b1: LatticePoint,
    ) -> Option<LatticePoint>;

    /// Exact even-odd location of `p` against a closed ring.
    fn point_in_ring(&self, p: LatticePoint, ring: &[LatticePoint]) -> Location {
        let n = ring.len();
        let mut inside = false;
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            if a == p || (cross(a, b, p) == 0 && strictly_inside_segment(p, a, b)) {
                return Location::Boundary;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let c = cross(a, b, p);
                let crosses_right = if b.y > a.y { c > 0 } else { c < 0 };
                if crosses_right {
                    inside = !inside;
                }
            }
        }
        if inside {
            Location::Inside
        } else {
            Location::Outside
        }
    }
}

/// Kernel on a uniform lattice of `step` degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeKernel {
    step: f64,
}

impl LatticeKernel {
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

impl Default for LatticeKernel {
    fn default() -> Self {
        Self::new(scenery_core::constants::DEFAULT_MAP_RESOLUTION)
    }
}

impl Kernel for LatticeKernel {
    fn snap(&self, p: DVec2) -> LatticePoint {
        LatticePoint::new((p.x / self.step).round() as i64, (p.y / self.step).round() as i64)
    }

    fn point(&self, p: LatticePoint) -> DVec2 {
        DVec2::new(p.x as f64 * self.step, p.y as f64 * self.step)
    }

    fn segment_intersection(
        &self,
        a0: LatticePoint,
        a1: LatticePoint,
        b0: LatticePoint,
        b1: LatticePoint,
    ) -> Option<LatticePoint> {
        let o1 = cross(a0, a1, b0).signum();
        let o2 = cross(a0, a1, b1).signum();
        let o3 = cross(b0, b1, a0).signum();
        let o4 = cross(b0, b1, a1).signum();
        if o1 * o2 >= 0 || o3 * o4 >= 0 {
            return None;
        }
        let rx = (a1.x - a0.x) as i128;
        let ry = (a1.y - a0.y) as i128;
        let sx = (b1.x - b0.x) as i128;
        let sy = (b1.y - b0.y) as i128;
        let qx = (b0.x - a0.x) as i128;
        let qy = (b0.y - a0.y) as i128;
        let denom = rx * sy - ry * sx;
        let num = qx * sy - qy * sx;
        let t = num as f64 / denom as f64;
        let mut p = LatticePoint::new(
            a0.x + (t * rx as f64).round() as i64,
            a0.y + (t * ry as f64).round() as i64,
        );
        // Keep crossings with axis-aligned edges exactly on them.
        for (s0, s1) in [(a0, a1), (b0, b1)] {
            if s0.x == s1.x {
                p.x = s0.x;
            }
            if s0.y == s1.y {
                p.y = s0.y;
            }
        }
        Some(p)
    }
}
