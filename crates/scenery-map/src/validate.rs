//! Structural validation of a planar map.

use std::collections::BTreeSet;

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use scenery_core::{Result, SceneryError};

use crate::kernel::{ring_area2, strictly_inside_segment, Kernel};
use crate::pmwx::{FaceId, HalfedgeId, Pmwx, UNBOUNDED};

fn broken(msg: impl Into<String>) -> SceneryError {
    SceneryError::Topology(msg.into())
}

impl Pmwx {
    /// Check every structural invariant of the map.
    pub fn validate(&self) -> Result<()> {
        let nh = self.halfedges.len();
        let nv = self.vertices.len();
        let nf = self.faces.len();
        if nh % 2 != 0 {
            return Err(broken("odd number of half-edges"));
        }
        if nf == 0 || self.faces[UNBOUNDED.0].outer_ccb.is_some() {
            return Err(broken("face 0 must be the unbounded face"));
        }

        for h in self.halfedge_ids() {
            let he = &self.halfedges[h.0];
            if he.target.0 >= nv || he.next.0 >= nh || he.prev.0 >= nh || he.face.0 >= nf {
                return Err(broken(format!("half-edge {} has a dangling index", h.0)));
            }
        }
        for h in self.halfedge_ids() {
            if self.prev(self.next(h)) != h || self.next(self.prev(h)) != h {
                return Err(broken(format!("next/prev mismatch at half-edge {}", h.0)));
            }
            if self.source(self.next(h)) != self.target(h) {
                return Err(broken(format!("cycle breaks after half-edge {}", h.0)));
            }
            if self.target(h) == self.target(h.twin()) {
                return Err(broken(format!("half-edge {} is a loop", h.0)));
            }
            if self.face_of(self.next(h)) != self.face_of(h) {
                return Err(broken(format!("face changes along cycle at {}", h.0)));
            }
            if h.is_dominant() && self.lattice(self.source(h)) >= self.lattice(self.target(h)) {
                return Err(broken(format!("edge {} is not canonically oriented", h.edge())));
            }
        }
        for (v, vertex) in self.vertices.iter().enumerate() {
            if vertex.incident.0 >= nh || self.target(vertex.incident).0 != v {
                return Err(broken(format!("vertex {v} has a bad incident half-edge")));
            }
        }
        let points: BTreeSet<_> = self.vertices.iter().map(|v| v.point).collect();
        if points.len() != nv {
            return Err(broken("two vertices share a location"));
        }

        let mut covered = vec![0u8; nh];
        for f in self.face_ids() {
            let face = &self.faces[f.0];
            if let Some(outer) = face.outer_ccb {
                self.check_ccb(f, outer, &mut covered)?;
                if ring_area2(&self.ccb_lattice(outer)) <= 0 {
                    return Err(broken(format!("outer boundary of face {} is not counterclockwise", f.0)));
                }
            } else if f != UNBOUNDED {
                return Err(broken(format!("bounded face {} has no outer boundary", f.0)));
            }
            for &hole in &face.holes {
                self.check_ccb(f, hole, &mut covered)?;
                if ring_area2(&self.ccb_lattice(hole)) > 0 {
                    return Err(broken(format!("hole of face {} is counterclockwise", f.0)));
                }
            }
        }
        if let Some(h) = covered.iter().position(|&c| c != 1) {
            return Err(broken(format!("half-edge {h} is not on exactly one boundary")));
        }

        self.check_embedding()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn check_ccb(&self, f: FaceId, start: HalfedgeId, covered: &mut [u8]) -> Result<()> {
        let ccb = self.ccb(start);
        if self.next(ccb[ccb.len() - 1]) != start {
            return Err(broken(format!("boundary of face {} does not close", f.0)));
        }
        for h in ccb {
            if self.face_of(h) != f {
                return Err(broken(format!("half-edge {} disagrees about its face", h.0)));
            }
            covered[h.0] = covered[h.0].saturating_add(1);
        }
        Ok(())
    }

    /// No duplicate, overlapping or crossing edges.
    fn check_embedding(&self) -> Result<()> {
        let segs: Vec<_> = self
            .edges()
            .map(|h| (self.lattice(self.source(h)), self.lattice(self.target(h))))
            .collect();
        let tree: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>> = RTree::bulk_load(
            segs.iter()
                .enumerate()
                .map(|(i, (a, b))| {
                    GeomWithData::new(
                        Rectangle::from_corners([a.x as f64, a.y as f64], [b.x as f64, b.y as f64]),
                        i,
                    )
                })
                .collect(),
        );
        for (i, &(a, b)) in segs.iter().enumerate() {
            let env = AABB::from_corners(
                [a.x.min(b.x) as f64, a.y.min(b.y) as f64],
                [a.x.max(b.x) as f64, a.y.max(b.y) as f64],
            );
            for cand in tree.locate_in_envelope_intersecting(&env) {
                let j = cand.data;
                if j <= i {
                    continue;
                }
                let (c, d) = segs[j];
                if (a, b) == (c, d) {
                    return Err(broken(format!("edges {i} and {j} are duplicates")));
                }
                if strictly_inside_segment(c, a, b)
                    || strictly_inside_segment(d, a, b)
                    || strictly_inside_segment(a, c, d)
                    || strictly_inside_segment(b, c, d)
                {
                    return Err(broken(format!("edges {i} and {j} touch without a vertex")));
                }
                if self.kernel.segment_intersection(a, b, c, d).is_some() {
                    return Err(broken(format!("edges {i} and {j} cross")));
                }
            }
        }
        Ok(())
    }
}

/// Replace `target` with a freshly built map once it checks out.
pub(crate) fn commit(target: &mut Pmwx, result: Pmwx) -> Result<()> {
    result.validate()?;
    *target = result;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    use crate::data::FaceData;

    fn square() -> Pmwx {
        Pmwx::from_polygon(
            &[
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(1.0, 1.0),
                DVec2::new(0.0, 1.0),
            ],
            &[],
            FaceData::default(),
            1e-6,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_map_is_valid() {
        assert!(Pmwx::new().is_valid());
    }

    #[test]
    fn test_square_is_valid() {
        assert!(square().is_valid());
    }

    #[test]
    fn test_broken_next_link_is_detected() {
        let mut map = square();
        map.halfedges[0].next = HalfedgeId(0);
        assert!(!map.is_valid());
    }

    #[test]
    fn test_wrong_face_is_detected() {
        let mut map = square();
        let h = map.faces[1].outer_ccb.unwrap();
        map.halfedges[h.0].face = UNBOUNDED;
        assert!(matches!(map.validate(), Err(SceneryError::Topology(_))));
    }

    #[test]
    fn test_crossing_edges_are_detected() {
        let mut map = square();
        // Move a corner across the opposite side.
        let v = map.vertices.iter().position(|v| v.point.x == 0 && v.point.y == 0).unwrap();
        let step = map.kernel.step();
        map.vertices[v].point = map.kernel.snap(DVec2::new(2.0, 0.5 + step));
        assert!(!map.is_valid());
    }
}
