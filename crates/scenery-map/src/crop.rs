//! Cropping a map to a box or an arbitrary ring.

use glam::DVec2;
use scenery_core::progress::checkpoint;
use scenery_core::{Progress, Result, SceneryError};
use tracing::debug;

use crate::build::{map_edges, ring_edges, snap_ring, Arrangement, SRC_A, SRC_RING};
use crate::data::FaceData;
use crate::kernel::LatticePoint;
use crate::pmwx::{FaceId, Pmwx, UNBOUNDED};
use crate::validate::commit;

const STAGES: usize = 3;

fn box_ring(west: f64, south: f64, east: f64, north: f64) -> Result<Vec<DVec2>> {
    if !(west < east && south < north) {
        return Err(SceneryError::Geometry(format!(
            "empty crop box {west},{south} -> {east},{north}"
        )));
    }
    Ok(vec![
        DVec2::new(west, south),
        DVec2::new(east, south),
        DVec2::new(east, north),
        DVec2::new(west, north),
    ])
}

/// Cut `map` along `ring` and keep one side of it.
fn cut(
    map: &Pmwx,
    ring: &[LatticePoint],
    keep_outside: bool,
    progress: &mut dyn Progress,
) -> Result<Pmwx> {
    checkpoint(progress, 0, STAGES, "Inserting cut", 0.0)?;
    let mut inputs = map_edges(map, &map.kernel, SRC_A);
    inputs.extend(ring_edges(ring, SRC_RING, FaceId(1), UNBOUNDED)?);
    let arr = Arrangement::build(map.kernel, inputs)?;

    checkpoint(progress, 1, STAGES, "Classifying faces", 0.0)?;
    let old = arr.labels(SRC_A);
    let inside = arr.labels(SRC_RING);
    let is_in = |f: FaceId| inside[f.0] != UNBOUNDED;

    checkpoint(progress, 2, STAGES, "Rebuilding map", 0.0)?;
    let (result, _) = arr.extract(
        |k| {
            if arr.edges[k].has_source(SRC_RING) {
                return true;
            }
            let (l, r) = arr.edge_faces(k);
            is_in(l) != keep_outside && is_in(r) != keep_outside
        },
        |k| arr.edges[k].merged(|_| true),
        |f| {
            if is_in(f) == keep_outside {
                FaceData::default()
            } else {
                map.face_data(old[f.0]).clone()
            }
        },
        map.face_data(UNBOUNDED).clone(),
    )?;
    checkpoint(progress, 2, STAGES, "Rebuilding map", 1.0)?;
    debug!(
        edges_in = map.num_edges(),
        edges_out = result.num_edges(),
        faces_out = result.num_faces(),
        keep_outside,
        "cut map"
    );
    Ok(result)
}

/// Crop `map` to a box. With `keep_outside` the box interior is cleared
/// to a single empty face instead, leaving everything around it.
pub fn crop_map(
    map: &mut Pmwx,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    keep_outside: bool,
    progress: &mut dyn Progress,
) -> Result<()> {
    let ring = snap_ring(&map.kernel, &box_ring(west, south, east, north)?);
    let result = cut(map, &ring, keep_outside, progress)?;
    commit(map, result)
}

/// Like [`crop_map`] with an arbitrary simple ring.
pub fn cut_ring(
    map: &mut Pmwx,
    ring: &[DVec2],
    keep_outside: bool,
    progress: &mut dyn Progress,
) -> Result<()> {
    let ring = snap_ring(&map.kernel, ring);
    let result = cut(map, &ring, keep_outside, progress)?;
    commit(map, result)
}

/// Split `map` at a box: the box contents are returned as a new map and
/// `map` keeps everything outside, with an empty face where the box was.
pub fn crop_map_with_cutout(
    map: &mut Pmwx,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    progress: &mut dyn Progress,
) -> Result<Pmwx> {
    let ring = snap_ring(&map.kernel, &box_ring(west, south, east, north)?);
    let inside = cut(map, &ring, false, progress)?;
    let outside = cut(map, &ring, true, progress)?;
    inside.validate()?;
    commit(map, outside)?;
    Ok(inside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery_core::tokens::TERRAIN_WATER;
    use scenery_core::NoProgress;

    fn lake() -> Pmwx {
        Pmwx::from_polygon(
            &[
                DVec2::new(0.0, 0.0),
                DVec2::new(4.0, 0.0),
                DVec2::new(4.0, 4.0),
                DVec2::new(0.0, 4.0),
            ],
            &[],
            FaceData::with_terrain(TERRAIN_WATER),
            1e-6,
        )
        .unwrap()
    }

    #[test]
    fn test_crop_to_box_inside_face() {
        let mut map = lake();
        crop_map(&mut map, 1.0, 1.0, 2.0, 3.0, false, &mut NoProgress).unwrap();
        assert!(map.is_valid());
        assert_eq!(map.num_faces(), 2);
        let f = map.locate_face(DVec2::new(1.5, 2.0));
        assert!(map.face_data(f).is_water());
        assert!((map.face_area(f) - 2.0).abs() < 1e-9);
        let (lo, hi) = map.bounding_box().unwrap();
        assert!((lo - DVec2::new(1.0, 1.0)).length() < 1e-9);
        assert!((hi - DVec2::new(2.0, 3.0)).length() < 1e-9);
    }

    #[test]
    fn test_crop_keep_outside_leaves_empty_face() {
        let mut map = lake();
        crop_map(&mut map, 1.0, 1.0, 2.0, 2.0, true, &mut NoProgress).unwrap();
        assert!(map.is_valid());
        assert_eq!(map.num_faces(), 3);
        let hole = map.locate_face(DVec2::new(1.5, 1.5));
        assert!(map.face_data(hole).is_empty());
        let rest = map.locate_face(DVec2::new(3.0, 3.0));
        assert!(map.face_data(rest).is_water());
    }

    #[test]
    fn test_crop_rejects_empty_box() {
        let mut map = lake();
        let before = map.clone();
        assert!(crop_map(&mut map, 2.0, 0.0, 1.0, 1.0, false, &mut NoProgress).is_err());
        assert_eq!(map, before);
    }

    #[test]
    fn test_cutout_splits_map_in_two() {
        let mut map = lake();
        let inside = crop_map_with_cutout(&mut map, 3.0, 3.0, 5.0, 5.0, &mut NoProgress).unwrap();
        assert!(inside.is_valid());
        assert!(map.is_valid());
        let total = map.face_area(map.locate_face(DVec2::new(1.0, 1.0)))
            + inside.face_area(inside.locate_face(DVec2::new(3.5, 3.5)));
        assert!((total - 16.0).abs() < 1e-9, "Areas should add up to 16, got {total}");
    }

    #[test]
    fn test_cut_ring_triangle() {
        let mut map = lake();
        let tri = [DVec2::new(-1.0, -1.0), DVec2::new(2.0, 5.0), DVec2::new(5.0, -1.0)];
        cut_ring(&mut map, &tri, false, &mut NoProgress).unwrap();
        assert!(map.is_valid());
        let water: f64 = map
            .bounded_faces()
            .filter(|&f| map.face_data(f).is_water())
            .map(|f| map.face_area(f))
            .sum();
        assert!((water - 11.5).abs() < 1e-4, "Water inside the triangle should be 11.5, got {water}");
    }
}
