//! Grafting a separately edited map into one face of another.

use scenery_core::progress::checkpoint;
use scenery_core::{Progress, Result, SceneryError};
use tracing::debug;

use crate::build::{map_edges, Arrangement, Piece, SRC_A, SRC_B};
use crate::pmwx::{FaceId, Pmwx, UNBOUNDED};
use crate::validate::commit;

const STAGES: usize = 3;

/// Exchange the contents of `face` in `master` with `slave`.
///
/// Inside the face, `master` drops its interior antennas and takes the
/// slave's edges (clipped to the face) and face data; the face's own
/// holes stay where they are. `slave` receives the face boundary with the
/// face's data inside it, and keeps its own edges outside the face.
pub fn swap_face(
    master: &mut Pmwx,
    slave: &mut Pmwx,
    face: FaceId,
    progress: &mut dyn Progress,
) -> Result<()> {
    if face == UNBOUNDED || face.0 >= master.num_faces() {
        return Err(SceneryError::Topology(format!(
            "cannot swap face {}: not a bounded face",
            face.0
        )));
    }

    checkpoint(progress, 0, STAGES, "Inserting edges", 0.0)?;
    let mut inputs = map_edges(master, &master.kernel, SRC_A);
    inputs.extend(map_edges(slave, &master.kernel, SRC_B));
    let arr = Arrangement::build(master.kernel, inputs)?;

    checkpoint(progress, 1, STAGES, "Classifying faces", 0.0)?;
    let lm = arr.labels(SRC_A);
    let lsl = arr.labels(SRC_B);
    let in_region = |f: FaceId| lm[f.0] == face;
    let side = |k: usize| {
        let (l, r) = arr.edge_faces(k);
        (in_region(l), in_region(r))
    };
    let interior_antenna = |p: &Piece| p.left == face && p.right == face;

    checkpoint(progress, 2, STAGES, "Rebuilding maps", 0.0)?;
    let (new_master, _) = arr.extract(
        |k| {
            let e = &arr.edges[k];
            let (l, r) = side(k);
            e.pieces_from(SRC_A).any(|p| !interior_antenna(p)) || (e.has_source(SRC_B) && (l || r))
        },
        |k| {
            let (l, r) = side(k);
            arr.edges[k].merged(|p| {
                if p.source == SRC_A {
                    !interior_antenna(p)
                } else {
                    l || r
                }
            })
        },
        |f| {
            if !in_region(f) {
                master.face_data(lm[f.0]).clone()
            } else if lsl[f.0] != UNBOUNDED {
                slave.face_data(lsl[f.0]).clone()
            } else {
                master.face_data(face).clone()
            }
        },
        master.face_data(UNBOUNDED).clone(),
    )?;
    let (new_slave, _) = arr.extract(
        |k| {
            let (l, r) = side(k);
            (arr.edges[k].has_source(SRC_B) && !(l && r)) || l != r
        },
        |k| {
            let (l, r) = side(k);
            arr.edges[k].merged(|p| if p.source == SRC_B { !(l && r) } else { l != r })
        },
        |f| {
            if in_region(f) {
                master.face_data(face).clone()
            } else {
                slave.face_data(lsl[f.0]).clone()
            }
        },
        slave.face_data(UNBOUNDED).clone(),
    )?;
    checkpoint(progress, 2, STAGES, "Rebuilding maps", 1.0)?;
    debug!(
        face = face.0,
        master_faces = new_master.num_faces(),
        slave_faces = new_slave.num_faces(),
        "swapped face"
    );

    new_slave.validate()?;
    commit(master, new_master)?;
    *slave = new_slave;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use scenery_core::tokens::{TERRAIN_FOREST_PARK, TERRAIN_WATER};
    use scenery_core::NoProgress;

    use crate::data::{FaceData, HalfedgeData, NetworkSegment};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x1, y0),
            DVec2::new(x1, y1),
            DVec2::new(x0, y1),
        ]
    }

    #[test]
    fn test_swap_rejects_unbounded_face() {
        let mut master = Pmwx::new();
        let mut slave = Pmwx::new();
        assert!(matches!(
            swap_face(&mut master, &mut slave, UNBOUNDED, &mut NoProgress),
            Err(SceneryError::Topology(_))
        ));
    }

    #[test]
    fn test_swap_grafts_detail_and_keeps_holes() {
        let mut master = Pmwx::from_polygon(
            &rect(0.0, 0.0, 4.0, 4.0),
            &[rect(3.0, 3.0, 3.5, 3.5)],
            FaceData::with_terrain(TERRAIN_WATER),
            1e-6,
        )
        .unwrap();
        master
            .insert_edge(DVec2::new(0.5, 0.5), DVec2::new(1.5, 0.5), HalfedgeData::default())
            .unwrap();
        let face = master.locate_face(DVec2::new(1.0, 1.0));
        assert!(master.face_data(face).is_water());

        // The slave carries a road across a forest patch that pokes out of the face.
        let mut slave = Pmwx::from_polygon(
            &rect(1.0, 1.0, 5.0, 2.0),
            &[],
            FaceData::with_terrain(TERRAIN_FOREST_PARK),
            1e-6,
        )
        .unwrap();
        let mut road = HalfedgeData::default();
        road.segments.push(NetworkSegment::new(7));
        slave.insert_edge(DVec2::new(2.0, 1.0), DVec2::new(2.0, 2.0), road).unwrap();

        swap_face(&mut master, &mut slave, face, &mut NoProgress).unwrap();
        assert!(master.is_valid());
        assert!(slave.is_valid());

        // The antenna at y = 0.5 is gone, the hole survives.
        assert!(master
            .edges()
            .all(|h| master.segment(h).0.y != 0.5 || master.segment(h).1.y != 0.5));
        let hole = master.locate_face(DVec2::new(3.25, 3.25));
        assert!(master.face_data(hole).is_empty());

        let patch = master.locate_face(DVec2::new(1.5, 1.5));
        assert_eq!(master.face_data(patch).terrain_type, TERRAIN_FOREST_PARK);
        let rest = master.locate_face(DVec2::new(0.5, 3.0));
        assert!(master.face_data(rest).is_water());
        assert_eq!(master.edges().filter(|&h| master.halfedge_data(h).has_roads()).count(), 1);
        // Nothing of the slave past x = 4 makes it into the master.
        let (_, hi) = master.bounding_box().unwrap();
        assert!(hi.x <= 4.0 + 1e-9);

        // The slave now holds the old face inside the boundary.
        let old = slave.locate_face(DVec2::new(1.5, 1.5));
        assert!(slave.face_data(old).is_water());
        let outside = slave.locate_face(DVec2::new(4.5, 1.5));
        assert_eq!(slave.face_data(outside).terrain_type, TERRAIN_FOREST_PARK);
    }
}
