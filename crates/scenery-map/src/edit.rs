//! Direct editing: inserting edges and rings, building polygons.

use glam::DVec2;
use scenery_core::{Result, SceneryError};

use crate::build::{map_edges, ring_edges, snap_ring, Arrangement, InputEdge, Piece, SRC_A, SRC_B, SRC_RING};
use crate::data::{FaceData, HalfedgeData};
use crate::kernel::Kernel;
use crate::pmwx::{FaceId, Pmwx, UNBOUNDED};
use crate::validate::commit;

impl Pmwx {
    /// Insert a straight edge from `a` to `b`, splitting whatever it
    /// crosses. `data` goes on the `a -> b` half. Faces the edge splits
    /// keep their attributes on both sides.
    pub fn insert_edge(&mut self, a: DVec2, b: DVec2, data: HalfedgeData) -> Result<()> {
        let (pa, pb) = (self.kernel.snap(a), self.kernel.snap(b));
        if pa == pb {
            return Err(SceneryError::Geometry(
                "edge collapses to a single point".to_string(),
            ));
        }
        let mut inputs = map_edges(self, &self.kernel, SRC_A);
        inputs.push(InputEdge {
            a: pa,
            b: pb,
            piece: Piece {
                source: SRC_B,
                left: UNBOUNDED,
                right: UNBOUNDED,
                forward: data,
                backward: HalfedgeData::default(),
            },
        });
        let arr = Arrangement::build(self.kernel, inputs)?;
        let labels = arr.labels(SRC_A);
        let (map, _) = arr.extract(
            |_| true,
            |k| arr.edges[k].merged(|_| true),
            |f| self.face_data(labels[f.0]).clone(),
            self.face_data(UNBOUNDED).clone(),
        )?;
        commit(self, map)
    }

    /// Insert a closed ring. Faces inside it get `inside` (or empty data)
    /// and are returned; faces outside keep what they had.
    pub fn insert_ring(&mut self, ring: &[DVec2], inside: Option<FaceData>) -> Result<Vec<FaceId>> {
        let pts = snap_ring(&self.kernel, ring);
        let mut inputs = map_edges(self, &self.kernel, SRC_A);
        inputs.extend(ring_edges(&pts, SRC_RING, FaceId(1), UNBOUNDED)?);
        let arr = Arrangement::build(self.kernel, inputs)?;
        let old = arr.labels(SRC_A);
        let ring_side = arr.labels(SRC_RING);
        let fresh = inside.unwrap_or_default();
        let (map, origins) = arr.extract(
            |_| true,
            |k| arr.edges[k].merged(|_| true),
            |f| {
                if ring_side[f.0] != UNBOUNDED {
                    fresh.clone()
                } else {
                    self.face_data(old[f.0]).clone()
                }
            },
            self.face_data(UNBOUNDED).clone(),
        )?;
        let faces = origins
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_some_and(|a| ring_side[a.0] != UNBOUNDED))
            .map(|(i, _)| FaceId(i))
            .collect();
        commit(self, map)?;
        Ok(faces)
    }

    /// A map holding one polygon with holes. Hole interiors become empty
    /// bounded faces.
    pub fn from_polygon(
        outer: &[DVec2],
        holes: &[Vec<DVec2>],
        data: FaceData,
        resolution: f64,
    ) -> Result<Pmwx> {
        let mut map = Pmwx::with_resolution(resolution);
        let kernel = map.kernel;
        let mut inputs = ring_edges(&snap_ring(&kernel, outer), SRC_A, FaceId(1), UNBOUNDED)?;
        for hole in holes {
            inputs.extend(ring_edges(&snap_ring(&kernel, hole), SRC_B, FaceId(1), UNBOUNDED)?);
        }
        let arr = Arrangement::build(kernel, inputs)?;
        let in_outer = arr.labels(SRC_A);
        let in_hole = arr.labels(SRC_B);
        let (result, _) = arr.extract(
            |_| true,
            |_| (HalfedgeData::default(), HalfedgeData::default()),
            |f| {
                if in_outer[f.0] != UNBOUNDED && in_hole[f.0] == UNBOUNDED {
                    data.clone()
                } else {
                    FaceData::default()
                }
            },
            FaceData::default(),
        )?;
        commit(&mut map, result)?;
        Ok(map)
    }
}
