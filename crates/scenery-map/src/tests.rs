use glam::DVec2;
use scenery_core::tokens::{TERRAIN_AIRPORT, TERRAIN_FOREST_PARK, TERRAIN_WATER};
use scenery_core::{NoProgress, SceneryError};

use crate::data::{FaceData, HalfedgeData, NetworkSegment};
use crate::kernel::Kernel;
use crate::{
    crop_map, merge_maps, overlay_map, reduce_to_water_bodies, simplify_map, swap_face, Pmwx,
    UNBOUNDED,
};

fn p(x: f64, y: f64) -> DVec2 {
    DVec2::new(x, y)
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<DVec2> {
    vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)]
}

fn road() -> HalfedgeData {
    let mut data = HalfedgeData::default();
    data.segments.push(NetworkSegment::new(42));
    data
}

/// A lake with an island, a forest next to it, a road crossing both and a
/// dangling track.
fn sample_map() -> Pmwx {
    let mut map = Pmwx::from_polygon(
        &rect(0.0, 0.0, 4.0, 4.0),
        &[rect(1.0, 1.0, 2.0, 2.0)],
        FaceData::with_terrain(TERRAIN_WATER),
        1e-7,
    )
    .unwrap();
    map.insert_ring(&rect(4.0, 0.0, 8.0, 4.0), Some(FaceData::with_terrain(TERRAIN_FOREST_PARK)))
        .unwrap();
    map.insert_edge(p(-1.0, 3.0), p(9.0, 3.0), road()).unwrap();
    map.insert_edge(p(6.0, 1.0), p(6.0, 2.5), HalfedgeData::default()).unwrap();
    map
}

#[test]
fn test_crossing_edges_are_noded() {
    let mut map = Pmwx::with_resolution(1e-6);
    map.insert_edge(p(0.0, 0.0), p(2.0, 2.0), HalfedgeData::default()).unwrap();
    map.insert_edge(p(0.0, 2.0), p(2.0, 0.0), HalfedgeData::default()).unwrap();
    assert!(map.is_valid());
    assert_eq!(map.num_edges(), 4);
    assert_eq!(map.num_vertices(), 5);
    let centre = map
        .vertices
        .iter()
        .any(|v| (map.kernel().point(v.point) - p(1.0, 1.0)).length() < 1e-9);
    assert!(centre, "Crossing should create a vertex at (1, 1)");
}

#[test]
fn test_t_junction_and_overlap_are_noded() {
    let mut map = Pmwx::with_resolution(1e-6);
    map.insert_edge(p(0.0, 0.0), p(4.0, 0.0), road()).unwrap();
    // Ends on the first edge.
    map.insert_edge(p(2.0, 0.0), p(2.0, 3.0), HalfedgeData::default()).unwrap();
    // Overlaps part of the first edge.
    map.insert_edge(p(3.0, 0.0), p(6.0, 0.0), HalfedgeData::default()).unwrap();
    assert!(map.is_valid());
    // 0-2, 2-3, 3-4, 4-6 along the axis plus the stem.
    assert_eq!(map.num_edges(), 5);
    let roads = map.edges().filter(|&h| map.halfedge_data(h).has_roads()).count();
    assert_eq!(roads, 3, "Road data should survive on every piece of the split edge");
}

#[test]
fn test_nested_rings_get_correct_holes() {
    let mut map = Pmwx::with_resolution(1e-6);
    map.insert_ring(&rect(0.0, 0.0, 10.0, 10.0), Some(FaceData::with_terrain(TERRAIN_WATER)))
        .unwrap();
    map.insert_ring(&rect(2.0, 2.0, 8.0, 8.0), Some(FaceData::with_terrain(TERRAIN_FOREST_PARK)))
        .unwrap();
    map.insert_ring(&rect(4.0, 4.0, 6.0, 6.0), Some(FaceData::with_terrain(TERRAIN_WATER)))
        .unwrap();
    assert!(map.is_valid());
    assert_eq!(map.num_faces(), 4);

    let outer = map.locate_face(p(1.0, 1.0));
    let middle = map.locate_face(p(3.0, 3.0));
    let inner = map.locate_face(p(5.0, 5.0));
    assert_eq!(map.face(outer).holes.len(), 1);
    assert_eq!(map.face(middle).holes.len(), 1);
    assert!(map.face(inner).holes.is_empty());
    assert_eq!(map.face(UNBOUNDED).holes.len(), 1);
    assert_eq!(map.find_adjacent_faces(middle).len(), 2);
    assert!((map.face_area(middle) - 32.0).abs() < 1e-6);

    let pt = map.interior_point(middle).unwrap();
    assert_eq!(map.locate_face(pt), middle);
}

#[test]
fn test_every_operator_leaves_map_valid() {
    let mut map = sample_map();
    assert!(map.is_valid());

    let mut src = Pmwx::from_polygon(&rect(3.0, 0.5, 5.0, 1.5), &[], FaceData::with_terrain(TERRAIN_AIRPORT), 1e-7)
        .unwrap();
    overlay_map(&mut map, &mut src, &mut NoProgress).unwrap();
    assert!(map.is_valid());
    assert!(src.is_valid());

    let other = Pmwx::from_polygon(&rect(5.0, 3.5, 7.0, 5.0), &[], FaceData::with_terrain(TERRAIN_WATER), 1e-7)
        .unwrap();
    merge_maps(&mut map, &other, false, &mut NoProgress).unwrap();
    assert!(map.is_valid());

    let face = map.locate_face(p(7.0, 0.5));
    let mut slave = Pmwx::from_polygon(&rect(6.5, 0.2, 7.5, 0.8), &[], FaceData::with_terrain(TERRAIN_WATER), 1e-7)
        .unwrap();
    swap_face(&mut map, &mut slave, face, &mut NoProgress).unwrap();
    assert!(map.is_valid());
    assert!(slave.is_valid());

    simplify_map(&mut map, false, &mut NoProgress).unwrap();
    assert!(map.is_valid());

    reduce_to_water_bodies(&mut map, &mut NoProgress).unwrap();
    assert!(map.is_valid());

    crop_map(&mut map, 0.5, 0.5, 7.5, 3.5, false, &mut NoProgress).unwrap();
    assert!(map.is_valid());
    assert!(map.edges().any(|h| map.halfedge_data(h).has_roads()), "The road must survive simplification");
}

#[test]
fn test_crop_is_idempotent() {
    let mut map = sample_map();
    crop_map(&mut map, 0.5, 0.5, 6.5, 3.5, false, &mut NoProgress).unwrap();
    assert!(map.is_valid());
    let once = map.clone();
    crop_map(&mut map, 0.5, 0.5, 6.5, 3.5, false, &mut NoProgress).unwrap();
    assert_eq!(map, once);

    let (lo, hi) = map.bounding_box().unwrap();
    assert!((lo - p(0.5, 0.5)).length() < 1e-9 && (hi - p(6.5, 3.5)).length() < 1e-9);
    // Island, lake split by the road, forest split by the road.
    let island = map.locate_face(p(1.5, 1.5));
    assert!(map.face_data(island).is_empty());
    assert!(map.face_data(map.locate_face(p(3.0, 2.0))).is_water());
    assert!(map.face_data(map.locate_face(p(3.0, 3.2))).is_water());
    assert_eq!(map.face_data(map.locate_face(p(5.0, 2.0))).terrain_type, TERRAIN_FOREST_PARK);
}

#[test]
fn test_crop_splits_dangling_edge() {
    let mut map = sample_map();
    crop_map(&mut map, 5.0, 0.0, 8.0, 2.0, false, &mut NoProgress).unwrap();
    assert!(map.is_valid());
    // The track from (6, 1) to (6, 2.5) is cut at the box top.
    let track: Vec<_> = map
        .edges()
        .map(|h| map.segment(h))
        .filter(|(a, b)| (a.x - 6.0).abs() < 1e-9 && (b.x - 6.0).abs() < 1e-9)
        .collect();
    assert_eq!(track.len(), 1);
    let (a, b) = track[0];
    assert!((a.y - 1.0).abs() < 1e-9 && (b.y - 2.0).abs() < 1e-9);
}

#[test]
fn test_overlay_adds_exactly_one_face() {
    let mut dst = sample_map();
    let before = dst.clone();
    let mut src = Pmwx::from_polygon(&rect(6.5, 0.5, 7.5, 0.9), &[], FaceData::with_terrain(TERRAIN_AIRPORT), 1e-7)
        .unwrap();
    overlay_map(&mut dst, &mut src, &mut NoProgress).unwrap();
    assert!(dst.is_valid());
    assert_eq!(dst.num_faces(), before.num_faces() + 1);

    let apron = dst.locate_face(p(7.0, 0.7));
    assert_eq!(dst.face_data(apron).terrain_type, TERRAIN_AIRPORT);
    for pt in [p(3.0, 2.0), p(3.0, 3.5), p(1.5, 1.5), p(5.0, 3.5)] {
        let old = before.locate_face(pt);
        let new = dst.locate_face(pt);
        assert_eq!(dst.face_data(new), before.face_data(old));
        assert!((dst.face_area(new) - before.face_area(old)).abs() < 1e-9);
    }
}

#[test]
fn test_cancelled_crop_leaves_map_unchanged() {
    let mut map = sample_map();
    let before = map.clone();
    let mut calls = 0;
    let mut cancel_late = |stage: usize, _: usize, _: &str, _: f64| {
        calls += 1;
        stage == 2
    };
    let result = crop_map(&mut map, 0.5, 0.5, 6.5, 3.5, false, &mut cancel_late);
    assert!(matches!(result, Err(SceneryError::Cancelled)));
    assert!(calls >= 3);
    assert_eq!(map, before);
}

#[test]
fn test_map_json_round_trip() {
    let map = sample_map();
    let json = serde_json::to_string(&map).unwrap();
    let back: Pmwx = serde_json::from_str(&json).unwrap();
    assert_eq!(back, map);
    assert!(back.is_valid());
}
