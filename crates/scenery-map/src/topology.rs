//! Operators that remove edges from a single map: simplification, water
//! body reduction and face cleaning.
//!
//! None of these insert geometry, so there is no noding step; the kept
//! edges are reassembled directly and each new face takes the data of the
//! old face along its outer boundary. Features and placements of the other
//! old faces folded into it are appended; faces absorbed by the unbounded
//! face leave the map along with their contents.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use scenery_core::progress::{checkpoint, Ticker};
use scenery_core::tokens::{HE_IS_RIVER, HE_MUST_BURN};
use scenery_core::{Progress, Result, SceneryError, NO_VALUE};
use tracing::debug;

use crate::build::{assemble, EdgeSpec};
use crate::data::HalfedgeData;
use crate::kernel::{cross, LatticePoint};
use crate::pmwx::{FaceId, HalfedgeId, Pmwx, UNBOUNDED};
use crate::validate::commit;

/// A run of one or more original edges, oriented along `origin`.
#[derive(Debug, Clone)]
struct Chain {
    a: LatticePoint,
    b: LatticePoint,
    forward: HalfedgeData,
    backward: HalfedgeData,
    origin: HalfedgeId,
}

impl Chain {
    fn from_edge(map: &Pmwx, h: HalfedgeId) -> Self {
        Self {
            a: map.lattice(map.source(h)),
            b: map.lattice(map.target(h)),
            forward: map.halfedge_data(h).clone(),
            backward: map.halfedge_data(h.twin()).clone(),
            origin: h,
        }
    }

    fn reversed(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
            forward: self.backward.clone(),
            backward: self.forward.clone(),
            origin: self.origin.twin(),
        }
    }

    fn ending_at(&self, v: LatticePoint) -> Self {
        if self.b == v {
            self.clone()
        } else {
            self.reversed()
        }
    }
}

/// Join two chains meeting at `v` if they continue in a straight line
/// with identical data.
fn join(first: &Chain, second: &Chain, v: LatticePoint) -> Option<Chain> {
    let x = first.ending_at(v);
    let y = second.ending_at(v).reversed();
    if cross(x.a, v, y.b) != 0 {
        return None;
    }
    let dot = (x.a.x - v.x) as i128 * (y.b.x - v.x) as i128 + (x.a.y - v.y) as i128 * (y.b.y - v.y) as i128;
    if dot >= 0 || x.forward != y.forward || x.backward != y.backward {
        return None;
    }
    Some(Chain {
        a: x.a,
        b: y.b,
        forward: x.forward,
        backward: x.backward,
        origin: x.origin,
    })
}

/// Merge every degree-two vertex whose two edges are collinear and carry
/// the same data.
fn merge_collinear(chains: Vec<Chain>) -> Vec<Chain> {
    let mut slots: Vec<Option<Chain>> = chains.into_iter().map(Some).collect();
    let mut adj: BTreeMap<LatticePoint, Vec<usize>> = BTreeMap::new();
    for (i, c) in slots.iter().enumerate() {
        if let Some(c) = c {
            adj.entry(c.a).or_default().push(i);
            adj.entry(c.b).or_default().push(i);
        }
    }
    let points: Vec<LatticePoint> = adj.keys().copied().collect();
    for v in points {
        let (i, j) = match adj.get(&v).map(Vec::as_slice) {
            Some(&[i, j]) if i != j => (i, j),
            _ => continue,
        };
        let joined = match (&slots[i], &slots[j]) {
            (Some(ci), Some(cj)) => join(ci, cj, v),
            _ => None,
        };
        let Some(joined) = joined else {
            continue;
        };
        let far = joined.b;
        slots[i] = Some(joined);
        slots[j] = None;
        if let Some(list) = adj.get_mut(&v) {
            list.clear();
        }
        if let Some(list) = adj.get_mut(&far) {
            for e in list.iter_mut().filter(|e| **e == j) {
                *e = i;
            }
        }
    }
    slots.into_iter().flatten().collect()
}

fn find_root(parent: &mut [usize], mut f: usize) -> usize {
    while parent[f] != f {
        parent[f] = parent[parent[f]];
        f = parent[f];
    }
    f
}

/// Group the old faces that end up in one new face: faces on either side
/// of a removed edge merge.
fn merged_groups(map: &Pmwx, removed: &[HalfedgeId]) -> Vec<usize> {
    let mut parent: Vec<usize> = (0..map.num_faces()).collect();
    for &h in removed {
        let a = find_root(&mut parent, map.face_of(h).0);
        let b = find_root(&mut parent, map.face_of(h.twin()).0);
        if a != b {
            parent[a.max(b)] = a.min(b);
        }
    }
    (0..parent.len()).map(|f| find_root(&mut parent, f)).collect()
}

/// Assemble `chains` into a map; each face copies the data of the old
/// face left of its outer boundary and absorbs the rest of its group.
fn rebuild(map: &Pmwx, chains: Vec<Chain>, removed: &[HalfedgeId]) -> Result<Pmwx> {
    let specs = chains
        .into_iter()
        .map(|c| EdgeSpec {
            a: c.a,
            b: c.b,
            forward: c.forward,
            backward: c.backward,
            left: map.face_of(c.origin).0,
            right: map.face_of(c.origin.twin()).0,
        })
        .collect();
    let (mut out, keys) = assemble(map.kernel, specs)?;

    let group = merged_groups(map, removed);
    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (f, &root) in group.iter().enumerate() {
        members.entry(root).or_default().push(f);
    }
    let mut claimed = BTreeSet::new();
    claimed.insert(group[UNBOUNDED.0]);

    for (f, key) in keys.into_iter().enumerate() {
        let Some(k) = key else {
            continue;
        };
        let mut data = map.face_data(FaceId(k)).clone();
        let root = group[k];
        if claimed.insert(root) {
            for &g in members.get(&root).map(Vec::as_slice).unwrap_or_default() {
                if g != k {
                    data.absorb(map.face_data(FaceId(g)));
                }
            }
        }
        out.faces[f].data = data;
    }
    out.faces[UNBOUNDED.0].data = map.face_data(UNBOUNDED).clone();
    Ok(out)
}

/// Whether an edge separates anything worth keeping.
fn must_keep(map: &Pmwx, h: HalfedgeId, kill_rivers: bool) -> bool {
    let t = h.twin();
    let (f1, f2) = (map.face_of(h), map.face_of(t));
    let (e1, e2) = (map.halfedge_data(h), map.halfedge_data(t));
    let (d1, d2) = (map.face_data(f1), map.face_data(f2));

    if e1.has_roads() || e2.has_roads() {
        return true;
    }
    if e1.has_param(HE_MUST_BURN) || e2.has_param(HE_MUST_BURN) {
        return true;
    }
    if map.is_unbounded(f1) != map.is_unbounded(f2) {
        return true;
    }
    let river = e1.has_param(HE_IS_RIVER) || e2.has_param(HE_IS_RIVER);
    if river && !kill_rivers && !d1.is_water() && !d2.is_water() {
        return true;
    }
    if d1.is_water() != d2.is_water() || d1.terrain_type != d2.terrain_type {
        return true;
    }
    let (a1, a2) = (&d1.area_feature, &d2.area_feature);
    a1.feat_type != a2.feat_type || (a1.feat_type != NO_VALUE && a1.params != a2.params)
}

const SIMPLIFY_STAGES: usize = 3;

/// Remove edges between faces with identical attributes that carry no
/// network, then merge straight runs of edges with identical data. Rivers
/// between dry faces survive unless `kill_rivers` is set.
pub fn simplify_map(map: &mut Pmwx, kill_rivers: bool, progress: &mut dyn Progress) -> Result<()> {
    let edges: Vec<HalfedgeId> = map.edges().collect();
    let ticker = Ticker::new(edges.len());
    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for (i, &h) in edges.iter().enumerate() {
        ticker.tick(progress, 0, SIMPLIFY_STAGES, "Finding redundant edges", i)?;
        if must_keep(map, h, kill_rivers) {
            kept.push(Chain::from_edge(map, h));
        } else {
            removed.push(h);
        }
    }

    checkpoint(progress, 1, SIMPLIFY_STAGES, "Merging collinear edges", 0.0)?;
    let merged = merge_collinear(kept);

    checkpoint(progress, 2, SIMPLIFY_STAGES, "Rebuilding map", 0.0)?;
    let result = rebuild(map, merged, &removed)?;
    checkpoint(progress, 2, SIMPLIFY_STAGES, "Rebuilding map", 1.0)?;
    debug!(
        edges = edges.len(),
        removed = removed.len(),
        remaining = result.num_edges(),
        "simplified map"
    );
    commit(map, result)
}

fn reduce_water(map: &mut Pmwx, unbounded_wet: bool, progress: &mut dyn Progress) -> Result<()> {
    let mut current = map.clone();
    for pass in 0.. {
        checkpoint(progress, 0, 1, "Reducing water", 0.0)?;
        let wet = |f: FaceId| {
            if current.is_unbounded(f) {
                unbounded_wet
            } else {
                current.face_data(f).is_water()
            }
        };
        let mut dropped = Vec::new();
        let mut kept = Vec::new();
        for h in current.edges() {
            let (f1, f2) = (current.face_of(h), current.face_of(h.twin()));
            let roads = current.halfedge_data(h).has_roads() || current.halfedge_data(h.twin()).has_roads();
            let outside = current.is_unbounded(f1) && current.is_unbounded(f2);
            if outside || (wet(f1) && wet(f2) && !roads) {
                dropped.push(h);
            } else {
                kept.push(Chain::from_edge(&current, h));
            }
        }
        debug!(pass, dropped = dropped.len(), "water reduction pass");
        if dropped.is_empty() {
            break;
        }
        current = rebuild(&current, kept, &dropped)?;
    }
    checkpoint(progress, 0, 1, "Reducing water", 1.0)?;
    commit(map, current)
}

/// Dissolve boundaries inside water so each water body is one face, and
/// drop edges that float in the unbounded face.
pub fn reduce_to_water_bodies(map: &mut Pmwx, progress: &mut dyn Progress) -> Result<()> {
    reduce_water(map, false, progress)
}

/// As [`reduce_to_water_bodies`], but water touching the unbounded face is
/// absorbed into it, leaving only enclosed water bodies and dry land.
pub fn remove_unbounded_water(map: &mut Pmwx, progress: &mut dyn Progress) -> Result<()> {
    reduce_water(map, true, progress)
}

/// Remove antennas and holes (with everything inside them) from `face`.
pub fn clean_face(map: &mut Pmwx, face: FaceId, progress: &mut dyn Progress) -> Result<()> {
    if face == UNBOUNDED || face.0 >= map.num_faces() {
        return Err(SceneryError::Topology(format!(
            "cannot clean face {}: not a bounded face",
            face.0
        )));
    }
    checkpoint(progress, 0, 1, "Cleaning face", 0.0)?;

    let mut inner: BTreeSet<FaceId> = BTreeSet::new();
    let mut queue: VecDeque<FaceId> = VecDeque::new();
    for &hole in &map.face(face).holes {
        for h in map.ccb(hole) {
            let g = map.face_of(h.twin());
            if g != face && inner.insert(g) {
                queue.push_back(g);
            }
        }
    }
    while let Some(f) = queue.pop_front() {
        for g in map.find_adjacent_faces(f) {
            if g != face && inner.insert(g) {
                queue.push_back(g);
            }
        }
    }
    let gone = |f: FaceId| f == face || inner.contains(&f);

    let (removed, kept): (Vec<HalfedgeId>, Vec<HalfedgeId>) = map
        .edges()
        .partition(|&h| gone(map.face_of(h)) && gone(map.face_of(h.twin())));
    let kept: Vec<Chain> = kept.into_iter().map(|h| Chain::from_edge(map, h)).collect();
    let result = rebuild(map, kept, &removed)?;
    checkpoint(progress, 0, 1, "Cleaning face", 1.0)?;
    debug!(face = face.0, removed_faces = inner.len(), "cleaned face");
    commit(map, result)
}
