//! The planar map: an arena of vertices, half-edges and faces.
//!
//! Half-edges come in twin pairs stored at `2k` and `2k + 1`; the even one
//! is the dominant half and runs from the lexicographically smaller
//! endpoint to the larger. Face 0 is the unbounded face. Each face keeps
//! one representative half-edge of its outer boundary cycle and one per
//! hole; the cycles themselves are walked through `next` links.

use std::collections::BTreeSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::data::{FaceData, HalfedgeData};
use crate::kernel::{ring_area2, Kernel, LatticeKernel, LatticePoint, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HalfedgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceId(pub usize);

impl HalfedgeId {
    #[inline]
    pub fn twin(self) -> HalfedgeId {
        HalfedgeId(self.0 ^ 1)
    }

    /// Index of the edge this half belongs to.
    #[inline]
    pub fn edge(self) -> usize {
        self.0 / 2
    }

    #[inline]
    pub fn is_dominant(self) -> bool {
        self.0 % 2 == 0
    }
}

/// The unbounded face.
pub const UNBOUNDED: FaceId = FaceId(0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub point: LatticePoint,
    /// One half-edge pointing into this vertex.
    pub incident: HalfedgeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Halfedge {
    pub target: VertexId,
    pub next: HalfedgeId,
    pub prev: HalfedgeId,
    /// Face on the left.
    pub face: FaceId,
    pub data: HalfedgeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Representative of the outer boundary; `None` only for the unbounded face.
    pub outer_ccb: Option<HalfedgeId>,
    /// One representative per hole boundary.
    pub holes: Vec<HalfedgeId>,
    pub data: FaceData,
}

/// Planar map with attributed faces and half-edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pmwx {
    pub(crate) kernel: LatticeKernel,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) halfedges: Vec<Halfedge>,
    pub(crate) faces: Vec<Face>,
}

impl Default for Pmwx {
    fn default() -> Self {
        Self::with_kernel(LatticeKernel::default())
    }
}

impl Pmwx {
    /// An empty map: just the unbounded face.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty map snapping to a lattice of `resolution` degrees.
    pub fn with_resolution(resolution: f64) -> Self {
        Self::with_kernel(LatticeKernel::new(resolution))
    }

    pub fn with_kernel(kernel: LatticeKernel) -> Self {
        Self {
            kernel,
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: vec![Face {
                outer_ccb: None,
                holes: Vec::new(),
                data: FaceData::default(),
            }],
        }
    }

    pub fn kernel(&self) -> &LatticeKernel {
        &self.kernel
    }

    pub fn resolution(&self) -> f64 {
        self.kernel.step()
    }

    pub fn is_empty(&self) -> bool {
        self.halfedges.is_empty()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Number of faces including the unbounded one.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v.0]
    }

    pub fn halfedge(&self, h: HalfedgeId) -> &Halfedge {
        &self.halfedges[h.0]
    }

    pub fn face(&self, f: FaceId) -> &Face {
        &self.faces[f.0]
    }

    pub fn face_data(&self, f: FaceId) -> &FaceData {
        &self.faces[f.0].data
    }

    pub fn face_data_mut(&mut self, f: FaceId) -> &mut FaceData {
        &mut self.faces[f.0].data
    }

    pub fn halfedge_data(&self, h: HalfedgeId) -> &HalfedgeData {
        &self.halfedges[h.0].data
    }

    pub fn halfedge_data_mut(&mut self, h: HalfedgeId) -> &mut HalfedgeData {
        &mut self.halfedges[h.0].data
    }

    /// Mutable access to every face's data.
    pub fn face_data_iter_mut(&mut self) -> impl Iterator<Item = &mut FaceData> {
        self.faces.iter_mut().map(|f| &mut f.data)
    }

    /// Mutable access to every half-edge's data.
    pub fn halfedge_data_iter_mut(&mut self) -> impl Iterator<Item = &mut HalfedgeData> {
        self.halfedges.iter_mut().map(|h| &mut h.data)
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> {
        (0..self.faces.len()).map(FaceId)
    }

    /// Bounded faces only.
    pub fn bounded_faces(&self) -> impl Iterator<Item = FaceId> {
        (1..self.faces.len()).map(FaceId)
    }

    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfedgeId> {
        (0..self.halfedges.len()).map(HalfedgeId)
    }

    /// Dominant half of every edge.
    pub fn edges(&self) -> impl Iterator<Item = HalfedgeId> {
        (0..self.halfedges.len()).step_by(2).map(HalfedgeId)
    }

    pub fn is_unbounded(&self, f: FaceId) -> bool {
        f == UNBOUNDED
    }

    pub fn target(&self, h: HalfedgeId) -> VertexId {
        self.halfedges[h.0].target
    }

    pub fn source(&self, h: HalfedgeId) -> VertexId {
        self.halfedges[h.twin().0].target
    }

    pub fn next(&self, h: HalfedgeId) -> HalfedgeId {
        self.halfedges[h.0].next
    }

    pub fn prev(&self, h: HalfedgeId) -> HalfedgeId {
        self.halfedges[h.0].prev
    }

    pub fn face_of(&self, h: HalfedgeId) -> FaceId {
        self.halfedges[h.0].face
    }

    pub fn lattice(&self, v: VertexId) -> LatticePoint {
        self.vertices[v.0].point
    }

    pub fn point(&self, v: VertexId) -> DVec2 {
        self.kernel.point(self.vertices[v.0].point)
    }

    /// Source and target coordinates of a half-edge.
    pub fn segment(&self, h: HalfedgeId) -> (DVec2, DVec2) {
        (self.point(self.source(h)), self.point(self.target(h)))
    }

    /// An edge with the same face on both sides.
    pub fn is_antenna(&self, h: HalfedgeId) -> bool {
        self.face_of(h) == self.face_of(h.twin())
    }

    /// Number of edges meeting at a vertex.
    pub fn degree(&self, v: VertexId) -> usize {
        let start = self.vertices[v.0].incident;
        let mut h = start;
        let mut n = 0;
        loop {
            n += 1;
            h = self.next(h).twin();
            if h == start || n > self.halfedges.len() {
                return n;
            }
        }
    }

    /// The half-edges of the cycle containing `start`, in `next` order.
    pub fn ccb(&self, start: HalfedgeId) -> Vec<HalfedgeId> {
        let mut out = vec![start];
        let mut h = self.next(start);
        while h != start && out.len() <= self.halfedges.len() {
            out.push(h);
            h = self.next(h);
        }
        out
    }

    pub(crate) fn ccb_lattice(&self, start: HalfedgeId) -> Vec<LatticePoint> {
        self.ccb(start)
            .into_iter()
            .map(|h| self.lattice(self.target(h)))
            .collect()
    }

    fn ccb_points(&self, start: HalfedgeId) -> Vec<DVec2> {
        self.ccb(start)
            .into_iter()
            .map(|h| self.point(self.target(h)))
            .collect()
    }

    /// All half-edges bounding a face: outer cycle first, then holes.
    pub fn find_edges_for_face(&self, f: FaceId) -> Vec<HalfedgeId> {
        let face = &self.faces[f.0];
        let mut out = Vec::new();
        if let Some(h) = face.outer_ccb {
            out.extend(self.ccb(h));
        }
        for &h in &face.holes {
            out.extend(self.ccb(h));
        }
        out
    }

    /// Faces sharing at least one edge with `f`.
    pub fn find_adjacent_faces(&self, f: FaceId) -> BTreeSet<FaceId> {
        self.find_edges_for_face(f)
            .into_iter()
            .map(|h| self.face_of(h.twin()))
            .filter(|&g| g != f)
            .collect()
    }

    /// Outer boundary ring (counterclockwise, not closed). Empty for the unbounded face.
    pub fn face_outer_ring(&self, f: FaceId) -> Vec<DVec2> {
        self.faces[f.0]
            .outer_ccb
            .map(|h| self.ccb_points(h))
            .unwrap_or_default()
    }

    /// Hole rings (clockwise, not closed).
    pub fn face_holes(&self, f: FaceId) -> Vec<Vec<DVec2>> {
        self.faces[f.0].holes.iter().map(|&h| self.ccb_points(h)).collect()
    }

    /// Area of a face in square degrees (outer minus holes). Infinite for the unbounded face.
    pub fn face_area(&self, f: FaceId) -> f64 {
        let face = &self.faces[f.0];
        let Some(outer) = face.outer_ccb else {
            return f64::INFINITY;
        };
        let step2 = self.kernel.step() * self.kernel.step();
        let mut area2 = ring_area2(&self.ccb_lattice(outer));
        for &h in &face.holes {
            area2 += ring_area2(&self.ccb_lattice(h));
        }
        area2 as f64 * step2 / 2.0
    }

    /// Bounding box of all vertices.
    pub fn bounding_box(&self) -> Option<(DVec2, DVec2)> {
        let mut it = self.vertices.iter().map(|v| self.kernel.point(v.point));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// The face containing `p`. Points on an edge resolve to the smaller
    /// of the faces whose outer boundary touches them.
    pub fn locate_face(&self, p: DVec2) -> FaceId {
        let q = self.kernel.snap(p);
        let mut best: Option<(i128, FaceId)> = None;
        for f in self.bounded_faces() {
            let Some(outer) = self.faces[f.0].outer_ccb else {
                continue;
            };
            let ring = self.ccb_lattice(outer);
            if !ring_bbox_contains(&ring, q) {
                continue;
            }
            if self.kernel.point_in_ring(q, &ring) == Location::Outside {
                continue;
            }
            let area = ring_area2(&ring);
            if best.map_or(true, |(a, _)| area < a) {
                best = Some((area, f));
            }
        }
        best.map(|(_, f)| f).unwrap_or(UNBOUNDED)
    }

    /// A point strictly inside a bounded face, or `None` for the unbounded face
    /// or a face too thin to probe.
    pub fn interior_point(&self, f: FaceId) -> Option<DVec2> {
        let face = &self.faces[f.0];
        let outer = face.outer_ccb?;
        let mut segs = Vec::new();
        for start in std::iter::once(outer).chain(face.holes.iter().copied()) {
            for h in self.ccb(start) {
                // Antennas do not separate inside from outside.
                if self.face_of(h.twin()) == f {
                    continue;
                }
                segs.push(self.segment(h));
            }
        }

        let mut ys: Vec<f64> = segs.iter().flat_map(|(a, b)| [a.y, b.y]).collect();
        ys.sort_by(f64::total_cmp);
        ys.dedup();
        let y = match ys.as_slice() {
            [y0, y1, ..] => (y0 + y1) / 2.0,
            _ => return None,
        };

        let mut xs: Vec<f64> = segs
            .iter()
            .filter(|(a, b)| (a.y > y) != (b.y > y))
            .map(|(a, b)| a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
            .collect();
        xs.sort_by(f64::total_cmp);
        xs.chunks_exact(2)
            .max_by(|l, r| (l[1] - l[0]).total_cmp(&(r[1] - r[0])))
            .map(|pair| DVec2::new((pair[0] + pair[1]) / 2.0, y))
    }
}

fn ring_bbox_contains(ring: &[LatticePoint], q: LatticePoint) -> bool {
    let (mut x0, mut y0, mut x1, mut y1) = (i64::MAX, i64::MAX, i64::MIN, i64::MIN);
    for p in ring {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    q.x >= x0 && q.x <= x1 && q.y >= y0 && q.y <= y1
}
