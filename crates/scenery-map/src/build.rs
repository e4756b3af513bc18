//! Map construction: noding, face assembly and label transfer.
//!
//! Every editing operator works the same way. The edges of its inputs are
//! gathered as pieces tagged with their source and the source faces on
//! either side, noded into a set of non-crossing edges, and assembled into
//! an arrangement. Source faces are then carried onto arrangement faces by
//! flood fill, the operator picks the edges and face data it wants, and
//! the kept edges are assembled into the result map.

use std::collections::{BTreeMap, VecDeque};

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use scenery_core::{Result, SceneryError};
use tracing::trace;

use crate::data::{FaceData, HalfedgeData};
use crate::kernel::{
    compare_directions, ring_area2, strictly_inside_segment, Kernel, LatticeKernel,
    LatticePoint, Location,
};
use crate::pmwx::{Face, FaceId, Halfedge, HalfedgeId, Pmwx, Vertex, VertexId, UNBOUNDED};

/// Noding passes before giving up on snap-induced cascades.
const MAX_NODING_PASSES: usize = 32;

/// Source tags used by the operators.
pub(crate) const SRC_A: u8 = 0;
pub(crate) const SRC_B: u8 = 1;
pub(crate) const SRC_RING: u8 = 2;

/// One input edge's contribution to a noded edge.
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub source: u8,
    /// Source face left of the edge direction.
    pub left: FaceId,
    pub right: FaceId,
    pub forward: HalfedgeData,
    pub backward: HalfedgeData,
}

impl Piece {
    fn reversed(self) -> Piece {
        Piece {
            source: self.source,
            left: self.right,
            right: self.left,
            forward: self.backward,
            backward: self.forward,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InputEdge {
    pub a: LatticePoint,
    pub b: LatticePoint,
    pub piece: Piece,
}

/// A non-crossing edge with `a < b` and every piece that lies on it.
#[derive(Debug, Clone)]
pub(crate) struct NodedEdge {
    pub a: LatticePoint,
    pub b: LatticePoint,
    pub pieces: Vec<Piece>,
}

impl NodedEdge {
    pub fn has_source(&self, source: u8) -> bool {
        self.pieces.iter().any(|p| p.source == source)
    }

    pub fn pieces_from(&self, source: u8) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(move |p| p.source == source)
    }

    /// Merged half-edge data of the pieces accepted by `pred`, in piece order.
    pub fn merged(&self, pred: impl Fn(&Piece) -> bool) -> (HalfedgeData, HalfedgeData) {
        let mut fwd = HalfedgeData::default();
        let mut bwd = HalfedgeData::default();
        for p in self.pieces.iter().filter(|p| pred(p)) {
            fwd.merge(&p.forward);
            bwd.merge(&p.backward);
        }
        (fwd, bwd)
    }
}

/// Every edge of `map` as a piece from `source`, on `kernel`'s lattice.
pub(crate) fn map_edges(map: &Pmwx, kernel: &LatticeKernel, source: u8) -> Vec<InputEdge> {
    let place = |v| {
        if map.kernel == *kernel {
            map.lattice(v)
        } else {
            kernel.snap(map.point(v))
        }
    };
    map.edges()
        .map(|h| InputEdge {
            a: place(map.source(h)),
            b: place(map.target(h)),
            piece: Piece {
                source,
                left: map.face_of(h),
                right: map.face_of(h.twin()),
                forward: map.halfedge_data(h).clone(),
                backward: map.halfedge_data(h.twin()).clone(),
            },
        })
        .collect()
}

/// The edges of a closed ring, oriented so `inside` is on the left.
/// Fails on rings with fewer than three distinct points or no area.
pub(crate) fn ring_edges(
    ring: &[LatticePoint],
    source: u8,
    inside: FaceId,
    outside: FaceId,
) -> Result<Vec<InputEdge>> {
    let mut pts: Vec<LatticePoint> = ring.to_vec();
    pts.dedup();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    let area = ring_area2(&pts);
    if pts.len() < 3 || area == 0 {
        return Err(SceneryError::Geometry("ring has no area".to_string()));
    }
    if area < 0 {
        pts.reverse();
    }
    let n = pts.len();
    Ok((0..n)
        .map(|i| InputEdge {
            a: pts[i],
            b: pts[(i + 1) % n],
            piece: Piece {
                source,
                left: inside,
                right: outside,
                forward: HalfedgeData::default(),
                backward: HalfedgeData::default(),
            },
        })
        .collect())
}

type SegEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

fn envelope(a: LatticePoint, b: LatticePoint) -> Rectangle<[f64; 2]> {
    Rectangle::from_corners([a.x as f64, a.y as f64], [b.x as f64, b.y as f64])
}

/// Split `edges` until no two cross or overlap, then unify duplicates.
pub(crate) fn node(kernel: &dyn Kernel, mut edges: Vec<InputEdge>) -> Result<Vec<NodedEdge>> {
    edges.retain(|e| e.a != e.b);

    let mut converged = false;
    for pass in 0..MAX_NODING_PASSES {
        let tree: RTree<SegEnvelope> = RTree::bulk_load(
            edges
                .iter()
                .enumerate()
                .map(|(i, e)| GeomWithData::new(envelope(e.a, e.b), i))
                .collect(),
        );

        let mut splits: Vec<Vec<LatticePoint>> = vec![Vec::new(); edges.len()];
        for (i, s) in edges.iter().enumerate() {
            let env = AABB::from_corners(
                [s.a.x.min(s.b.x) as f64, s.a.y.min(s.b.y) as f64],
                [s.a.x.max(s.b.x) as f64, s.a.y.max(s.b.y) as f64],
            );
            for cand in tree.locate_in_envelope_intersecting(&env) {
                let j = cand.data;
                if j == i {
                    continue;
                }
                let t = &edges[j];
                for q in [t.a, t.b] {
                    if strictly_inside_segment(q, s.a, s.b) {
                        splits[i].push(q);
                    }
                }
                if j > i {
                    if let Some(p) = kernel.segment_intersection(s.a, s.b, t.a, t.b) {
                        if p != s.a && p != s.b {
                            splits[i].push(p);
                        }
                        if p != t.a && p != t.b {
                            splits[j].push(p);
                        }
                    }
                }
            }
        }

        let count: usize = splits.iter().map(Vec::len).sum();
        trace!(pass, edges = edges.len(), splits = count, "noding pass");
        if count == 0 {
            converged = true;
            break;
        }

        let mut next = Vec::with_capacity(edges.len() + count);
        for (e, mut pts) in edges.into_iter().zip(splits) {
            if pts.is_empty() {
                next.push(e);
                continue;
            }
            let (a, b) = (e.a, e.b);
            pts.sort_by_key(|&p| {
                (b.x - a.x) as i128 * (p.x - a.x) as i128 + (b.y - a.y) as i128 * (p.y - a.y) as i128
            });
            pts.dedup();
            let mut from = a;
            for p in pts.into_iter().chain(std::iter::once(b)) {
                if p != from {
                    next.push(InputEdge {
                        a: from,
                        b: p,
                        piece: e.piece.clone(),
                    });
                    from = p;
                }
            }
        }
        edges = next;
    }
    if !converged {
        return Err(SceneryError::Geometry(
            "edge noding did not converge".to_string(),
        ));
    }

    let mut unified: BTreeMap<(LatticePoint, LatticePoint), Vec<Piece>> = BTreeMap::new();
    for e in edges {
        let (key, piece) = if e.a < e.b {
            ((e.a, e.b), e.piece)
        } else {
            ((e.b, e.a), e.piece.reversed())
        };
        unified.entry(key).or_default().push(piece);
    }
    Ok(unified
        .into_iter()
        .map(|((a, b), pieces)| NodedEdge { a, b, pieces })
        .collect())
}

/// One edge handed to [`assemble`]. `left`/`right` are caller keys that
/// come back as the face keys of the faces on either side.
#[derive(Debug, Clone)]
pub(crate) struct EdgeSpec {
    pub a: LatticePoint,
    pub b: LatticePoint,
    pub forward: HalfedgeData,
    pub backward: HalfedgeData,
    pub left: usize,
    pub right: usize,
}

struct Cycle {
    rep: HalfedgeId,
    area2: i128,
    component: usize,
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Build the face structure of a set of non-crossing, distinct edges.
///
/// Edge `k` of the input becomes half-edges `2k`/`2k + 1`. Returns the map
/// (faces carry default data) and, per face, the key of the side its
/// outer boundary representative was given; `None` for the unbounded face.
pub(crate) fn assemble(
    kernel: LatticeKernel,
    specs: Vec<EdgeSpec>,
) -> Result<(Pmwx, Vec<Option<usize>>)> {
    let mut specs = specs;
    for s in specs.iter_mut() {
        if s.a == s.b {
            return Err(SceneryError::Topology("zero-length edge".to_string()));
        }
        if s.a > s.b {
            std::mem::swap(&mut s.a, &mut s.b);
            std::mem::swap(&mut s.forward, &mut s.backward);
            std::mem::swap(&mut s.left, &mut s.right);
        }
    }

    let mut vmap: BTreeMap<LatticePoint, usize> = BTreeMap::new();
    for s in &specs {
        vmap.insert(s.a, 0);
        vmap.insert(s.b, 0);
    }
    for (i, v) in vmap.values_mut().enumerate() {
        *v = i;
    }

    let mut map = Pmwx::with_kernel(kernel);
    map.vertices = vmap
        .keys()
        .map(|&point| Vertex {
            point,
            incident: HalfedgeId(0),
        })
        .collect();

    let mut keys = Vec::with_capacity(specs.len() * 2);
    for s in specs {
        let (va, vb) = (VertexId(vmap[&s.a]), VertexId(vmap[&s.b]));
        let here = HalfedgeId(map.halfedges.len());
        map.halfedges.push(Halfedge {
            target: vb,
            next: here,
            prev: here,
            face: UNBOUNDED,
            data: s.forward,
        });
        map.halfedges.push(Halfedge {
            target: va,
            next: here.twin(),
            prev: here.twin(),
            face: UNBOUNDED,
            data: s.backward,
        });
        keys.push(s.left);
        keys.push(s.right);
    }

    // Outgoing half-edges per vertex, counterclockwise.
    let mut outgoing: Vec<Vec<HalfedgeId>> = vec![Vec::new(); map.vertices.len()];
    for h in map.halfedge_ids() {
        outgoing[map.source(h).0].push(h);
    }
    for (v, list) in outgoing.iter_mut().enumerate() {
        let origin = map.vertices[v].point;
        let dir = |h: HalfedgeId| {
            let t = map.vertices[map.halfedges[h.0].target.0].point;
            (t.x - origin.x, t.y - origin.y)
        };
        list.sort_by(|&a, &b| compare_directions(dir(a), dir(b)));
        for w in list.windows(2) {
            if compare_directions(dir(w[0]), dir(w[1])).is_eq() {
                return Err(SceneryError::Topology(format!(
                    "overlapping edges at vertex {v}"
                )));
            }
        }
    }
    for (v, list) in outgoing.iter().enumerate() {
        let n = list.len();
        if n == 0 {
            continue;
        }
        map.vertices[v].incident = list[0].twin();
        for i in 0..n {
            let incoming = list[i].twin();
            let next = list[(i + n - 1) % n];
            map.halfedges[incoming.0].next = next;
            map.halfedges[next.0].prev = incoming;
        }
    }

    // Connected components over vertices.
    let mut parent: Vec<usize> = (0..map.vertices.len()).collect();
    for h in map.edges() {
        let a = find(&mut parent, map.source(h).0);
        let b = find(&mut parent, map.target(h).0);
        parent[a] = b;
    }

    // Trace cycles.
    let mut seen = vec![false; map.halfedges.len()];
    let mut cycles = Vec::new();
    for h in map.halfedge_ids() {
        if seen[h.0] {
            continue;
        }
        let ccb = map.ccb(h);
        for c in &ccb {
            seen[c.0] = true;
        }
        let ring: Vec<LatticePoint> = ccb.iter().map(|&c| map.lattice(map.target(c))).collect();
        cycles.push(Cycle {
            rep: h,
            area2: ring_area2(&ring),
            component: find(&mut parent, map.target(h).0),
        });
    }

    // Bounded faces: one per counterclockwise cycle.
    let mut face_keys: Vec<Option<usize>> = vec![None];
    let mut outers: Vec<(usize, Vec<LatticePoint>)> = Vec::new();
    for (ci, c) in cycles.iter().enumerate() {
        if c.area2 <= 0 {
            continue;
        }
        let f = FaceId(map.faces.len());
        map.faces.push(Face {
            outer_ccb: Some(c.rep),
            holes: Vec::new(),
            data: FaceData::default(),
        });
        for h in map.ccb(c.rep) {
            map.halfedges[h.0].face = f;
        }
        face_keys.push(Some(keys[c.rep.0]));
        outers.push((ci, map.ccb_lattice(c.rep)));
    }

    let index: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>> = RTree::bulk_load(
        outers
            .iter()
            .enumerate()
            .map(|(oi, (_, ring))| {
                let (mut lo, mut hi) = ([f64::MAX; 2], [f64::MIN; 2]);
                for p in ring {
                    lo = [lo[0].min(p.x as f64), lo[1].min(p.y as f64)];
                    hi = [hi[0].max(p.x as f64), hi[1].max(p.y as f64)];
                }
                GeomWithData::new(Rectangle::from_corners(lo, hi), oi)
            })
            .collect(),
    );

    // Holes: the outer cycle of each component goes to the smallest
    // counterclockwise cycle of another component that contains it.
    for c in cycles.iter().filter(|c| c.area2 <= 0) {
        let pt = map.lattice(map.target(c.rep));
        let env = AABB::from_point([pt.x as f64, pt.y as f64]);
        let mut best: Option<(i128, usize)> = None;
        for cand in index.locate_in_envelope_intersecting(&env) {
            let oi = cand.data;
            let (ci, ring) = &outers[oi];
            let outer = &cycles[*ci];
            if outer.component == c.component {
                continue;
            }
            if kernel.point_in_ring(pt, ring) != Location::Inside {
                continue;
            }
            if best.map_or(true, |(a, _)| outer.area2 < a) {
                best = Some((outer.area2, oi));
            }
        }
        let f = best.map(|(_, oi)| FaceId(oi + 1)).unwrap_or(UNBOUNDED);
        map.faces[f.0].holes.push(c.rep);
        for h in map.ccb(c.rep) {
            map.halfedges[h.0].face = f;
        }
    }

    Ok((map, face_keys))
}

/// Noded edges from several sources plus the face structure they induce.
pub(crate) struct Arrangement {
    pub map: Pmwx,
    pub edges: Vec<NodedEdge>,
}

impl Arrangement {
    pub fn build(kernel: LatticeKernel, inputs: Vec<InputEdge>) -> Result<Self> {
        let edges = node(&kernel, inputs)?;
        let specs = edges
            .iter()
            .map(|e| EdgeSpec {
                a: e.a,
                b: e.b,
                forward: HalfedgeData::default(),
                backward: HalfedgeData::default(),
                left: 0,
                right: 0,
            })
            .collect();
        let (map, _) = assemble(kernel, specs)?;
        Ok(Self { map, edges })
    }

    /// Arrangement faces left and right of edge `k`.
    pub fn edge_faces(&self, k: usize) -> (FaceId, FaceId) {
        let h = HalfedgeId(2 * k);
        (self.map.face_of(h), self.map.face_of(h.twin()))
    }

    /// For every arrangement face, the face of `source` it lies in.
    pub fn labels(&self, source: u8) -> Vec<FaceId> {
        let n = self.map.num_faces();
        let mut label: Vec<Option<FaceId>> = vec![None; n];
        let mut queue = VecDeque::new();
        for (k, e) in self.edges.iter().enumerate() {
            let (l, r) = self.edge_faces(k);
            for p in e.pieces_from(source) {
                for (f, src) in [(l, p.left), (r, p.right)] {
                    if label[f.0].is_none() {
                        label[f.0] = Some(src);
                        queue.push_back(f);
                    }
                }
            }
        }
        if label[UNBOUNDED.0].is_none() {
            label[UNBOUNDED.0] = Some(UNBOUNDED);
            queue.push_back(UNBOUNDED);
        }
        while let Some(f) = queue.pop_front() {
            let here = label[f.0];
            for h in self.map.find_edges_for_face(f) {
                if self.edges[h.edge()].has_source(source) {
                    continue;
                }
                let g = self.map.face_of(h.twin());
                if label[g.0].is_none() {
                    label[g.0] = here;
                    queue.push_back(g);
                }
            }
        }
        label.into_iter().map(|l| l.unwrap_or(UNBOUNDED)).collect()
    }

    /// Assemble the kept edges into a finished map.
    ///
    /// `edge_data` supplies the half-edge data of each kept edge and
    /// `face_data` the data for a result face given the arrangement face
    /// it was grown from. Returns the map and, per result face, that
    /// arrangement face.
    pub fn extract(
        &self,
        keep: impl Fn(usize) -> bool,
        edge_data: impl Fn(usize) -> (HalfedgeData, HalfedgeData),
        face_data: impl Fn(FaceId) -> FaceData,
        unbounded: FaceData,
    ) -> Result<(Pmwx, Vec<Option<FaceId>>)> {
        let mut specs = Vec::new();
        for (k, e) in self.edges.iter().enumerate() {
            if !keep(k) {
                continue;
            }
            let (forward, backward) = edge_data(k);
            let (l, r) = self.edge_faces(k);
            specs.push(EdgeSpec {
                a: e.a,
                b: e.b,
                forward,
                backward,
                left: l.0,
                right: r.0,
            });
        }
        let (mut map, keys) = assemble(self.map.kernel, specs)?;
        let origins: Vec<Option<FaceId>> = keys.into_iter().map(|k| k.map(FaceId)).collect();
        for (f, origin) in origins.iter().enumerate() {
            if let Some(a) = origin {
                map.faces[f].data = face_data(*a);
            }
        }
        map.faces[UNBOUNDED.0].data = unbounded;
        Ok((map, origins))
    }
}

/// Vertices of a ring after snapping.
pub(crate) fn snap_ring(kernel: &LatticeKernel, ring: &[glam::DVec2]) -> Vec<LatticePoint> {
    ring.iter().map(|&p| kernel.snap(p)).collect()
}

