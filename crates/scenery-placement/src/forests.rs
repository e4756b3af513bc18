//! Vegetation footprints: clip same-typed mesh triangles against
//! macro placement polygons.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{Area, BooleanOps, Centroid, Coord, LineString, MultiPolygon, Polygon, Simplify};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use scenery_core::progress::{checkpoint, Ticker};
use scenery_core::{PipelineConfig, Progress, Result, TokenId};
use scenery_map::{FaceId, Pmwx, PolyObjPlacement};

use crate::hash::TriangleHash;
use crate::mesh::{ClassifiedMesh, MeshTriangle};

const STAGES: usize = 2;

/// A macro placement polygon: outer ring plus holes, rings not closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GtPolygon {
    pub outer: Vec<DVec2>,
    pub holes: Vec<Vec<DVec2>>,
}

impl GtPolygon {
    pub fn new(outer: Vec<DVec2>, holes: Vec<Vec<DVec2>>) -> Self {
        Self { outer, holes }
    }

    pub fn bounding_box(&self) -> Option<(DVec2, DVec2)> {
        let mut it = self.outer.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    fn to_geo(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            ring_to_geo(&self.outer),
            self.holes.iter().map(|h| ring_to_geo(h)).collect(),
        )])
    }
}

/// One output footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Index of the source polygon.
    pub source: usize,
    pub rep_type: TokenId,
    /// Outer ring first, then holes.
    pub shape: Vec<Vec<DVec2>>,
    /// Instance anchor.
    pub centroid: DVec2,
    pub derived: bool,
}

/// Counters describing how much work the hash saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementStats {
    /// Triangles that carry a placement type.
    pub indexed_tris: usize,
    /// Bucket insertions; above `indexed_tris` when triangles span buckets.
    pub hashed_tris: usize,
    /// Triangle fetches summed over all polygons.
    pub processed_tris: usize,
    pub processed_polys: usize,
    pub hash_fetches: usize,
    pub footprints: usize,
    pub footprint_points: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementReport {
    pub footprints: Vec<Footprint>,
    /// Polygons whose boolean operations failed; they contribute nothing.
    pub failed: BTreeSet<usize>,
    pub stats: PlacementStats,
}

fn ring_to_geo(ring: &[DVec2]) -> LineString<f64> {
    LineString::from(ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect::<Vec<_>>())
}

fn ring_from_geo(ring: &LineString<f64>) -> Vec<DVec2> {
    let mut pts: Vec<DVec2> = ring.coords().map(|c| DVec2::new(c.x, c.y)).collect();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

fn triangle_to_geo(t: &MeshTriangle) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(ring_to_geo(&t.corners), Vec::new())])
}

/// Union by pairwise reduction; keeps operand sizes balanced.
fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while parts.len() > 1 {
        let mut next = Vec::with_capacity(parts.len().div_ceil(2));
        let mut it = parts.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => next.push(a.union(&b)),
                None => next.push(a),
            }
        }
        parts = next;
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// Footprint rings and centroid produced by one clip.
pub(crate) type ClipResult = Vec<(Vec<Vec<DVec2>>, DVec2)>;

/// The per-type clip: `(polygon index, polygon, triangles, tolerance)`.
pub(crate) type ClipFn<'a> = &'a dyn Fn(usize, &MultiPolygon<f64>, &[&MeshTriangle], f64) -> ClipResult;

/// Footprints of one type inside one polygon.
pub(crate) fn clip_type(
    gt: &MultiPolygon<f64>,
    triangles: &[&MeshTriangle],
    tolerance: f64,
) -> ClipResult {
    let cover = union_all(triangles.iter().map(|t| triangle_to_geo(t)).collect());
    let clipped = cover.intersection(gt);
    let simplified = if tolerance > 0.0 {
        clipped.simplify(&tolerance)
    } else {
        clipped
    };
    simplified
        .into_iter()
        .filter(|p| p.exterior().0.len() >= 4 && p.unsigned_area() > 0.0)
        .filter_map(|p| {
            let c = p.centroid()?;
            let mut shape = vec![ring_from_geo(p.exterior())];
            shape.extend(p.interiors().iter().map(ring_from_geo));
            Some((shape, DVec2::new(c.x(), c.y())))
        })
        .collect()
}

/// Clip the mesh's placement-typed triangles against each polygon.
///
/// Stage 0 indexes the mesh, stage 1 walks the polygons. A polygon with
/// no typed triangles under its bounding box yields nothing. A polygon
/// whose boolean operations fail is recorded in `failed` and skipped.
pub fn overlay_polygons(
    polys: &[GtPolygon],
    mesh: &ClassifiedMesh,
    mapping: &HashMap<TokenId, TokenId>,
    config: &PipelineConfig,
    progress: &mut dyn Progress,
) -> Result<PlacementReport> {
    overlay_with(polys, mesh, mapping, config, progress, &|_, gt, tris, tol| {
        clip_type(gt, tris, tol)
    })
}

pub(crate) fn overlay_with(
    polys: &[GtPolygon],
    mesh: &ClassifiedMesh,
    mapping: &HashMap<TokenId, TokenId>,
    config: &PipelineConfig,
    progress: &mut dyn Progress,
    clip: ClipFn<'_>,
) -> Result<PlacementReport> {
    let mut report = PlacementReport::default();

    checkpoint(progress, 0, STAGES, "Indexing mesh", 0.0)?;
    let (lo, hi) = mesh.bounding_box().unwrap_or((DVec2::ZERO, DVec2::ZERO));
    let mut hash = TriangleHash::new(lo, hi, config.placement_buckets);
    let mut types = Vec::with_capacity(mesh.triangles.len());
    let ticker = Ticker::new(mesh.triangles.len());
    for (i, tri) in mesh.triangles.iter().enumerate() {
        ticker.tick(progress, 0, STAGES, "Indexing mesh", i)?;
        let t = tri.placement_type(mapping);
        if t.is_some() {
            report.stats.hashed_tris += hash.insert(i, &tri.corners);
            report.stats.indexed_tris += 1;
        }
        types.push(t);
    }
    checkpoint(progress, 0, STAGES, "Indexing mesh", 1.0)?;

    checkpoint(progress, 1, STAGES, "Processing faces", 0.0)?;
    let ticker = Ticker::new(polys.len());
    for (pi, poly) in polys.iter().enumerate() {
        ticker.tick(progress, 1, STAGES, "Processing faces", pi)?;
        let Some((plo, phi)) = poly.bounding_box() else {
            continue;
        };
        let (found, lookups) = hash.fetch(plo, phi);
        report.stats.hash_fetches += lookups;
        report.stats.processed_tris += found.len();
        report.stats.processed_polys += 1;

        let mut by_type: BTreeMap<TokenId, Vec<&MeshTriangle>> = BTreeMap::new();
        for i in found {
            if let Some(t) = types[i] {
                by_type.entry(t).or_default().push(&mesh.triangles[i]);
            }
        }
        if by_type.is_empty() {
            continue;
        }

        let gt = poly.to_geo();
        let tolerance = config.placement_simplify_tolerance;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            by_type
                .iter()
                .map(|(&t, tris)| (t, clip(pi, &gt, tris, tolerance)))
                .collect::<Vec<_>>()
        }));
        match outcome {
            Ok(per_type) => {
                for (rep_type, shapes) in per_type {
                    for (shape, centroid) in shapes {
                        report.stats.footprints += 1;
                        report.stats.footprint_points += shape.iter().map(Vec::len).sum::<usize>();
                        report.footprints.push(Footprint {
                            source: pi,
                            rep_type,
                            shape,
                            centroid,
                            derived: true,
                        });
                    }
                }
            }
            Err(_) => {
                warn!(polygon = pi, "Boolean operation failed; skipping polygon");
                report.failed.insert(pi);
            }
        }
    }
    checkpoint(progress, 1, STAGES, "Processing faces", 1.0)?;

    let s = &report.stats;
    info!(
        indexed = s.indexed_tris,
        hashed = s.hashed_tris,
        processed = s.processed_tris,
        polygons = s.processed_polys,
        fetches = s.hash_fetches,
        footprints = s.footprints,
        points = s.footprint_points,
        failed = report.failed.len(),
        "Placement overlay done"
    );
    Ok(report)
}

/// Run the overlay with each listed bounded, non-water face as a
/// polygon and append the footprints to that face's placements. The map
/// is only touched after the overlay has completed.
pub fn generate_forests(
    map: &mut Pmwx,
    faces: &[FaceId],
    mesh: &ClassifiedMesh,
    mapping: &HashMap<TokenId, TokenId>,
    config: &PipelineConfig,
    progress: &mut dyn Progress,
) -> Result<PlacementReport> {
    let targets: Vec<FaceId> = faces
        .iter()
        .copied()
        .filter(|&f| f.0 < map.num_faces() && !map.is_unbounded(f))
        .filter(|&f| !map.face_data(f).is_water())
        .collect();
    let polys: Vec<GtPolygon> = targets
        .iter()
        .map(|&f| GtPolygon::new(map.face_outer_ring(f), map.face_holes(f)))
        .collect();

    let report = overlay_polygons(&polys, mesh, mapping, config, progress)?;
    for fp in &report.footprints {
        map.face_data_mut(targets[fp.source])
            .poly_objs
            .push(PolyObjPlacement {
                rep_type: fp.rep_type,
                shape: fp.shape.clone(),
                location: fp.centroid,
                params: Default::default(),
                derived: fp.derived,
            });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery_core::NoProgress;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x1, y0),
            DVec2::new(x1, y1),
            DVec2::new(x0, y1),
        ]
    }

    fn ring_area(r: &[DVec2]) -> f64 {
        let n = r.len();
        let twice: f64 = (0..n).map(|i| r[i].perp_dot(r[(i + 1) % n])).sum();
        twice.abs() / 2.0
    }

    fn area(shape: &[Vec<DVec2>]) -> f64 {
        ring_area(&shape[0]) - shape[1..].iter().map(|h| ring_area(h)).sum::<f64>()
    }

    #[test]
    fn test_union_all_merges_adjacent_squares() {
        let parts = (0..4)
            .map(|i| {
                let x = i as f64;
                MultiPolygon::new(vec![Polygon::new(ring_to_geo(&square(x, 0.0, x + 1.0, 1.0)), vec![])])
            })
            .collect();
        let merged = union_all(parts);
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_clip_type_respects_holes() {
        let gt = GtPolygon::new(square(0.0, 0.0, 4.0, 4.0), vec![square(1.0, 1.0, 3.0, 3.0)]);
        let mesh = ClassifiedMesh::grid(DVec2::ZERO, DVec2::new(4.0, 4.0), 4, 4, |_, _| 9);
        let tris: Vec<&MeshTriangle> = mesh.triangles.iter().collect();
        let shapes = clip_type(&gt.to_geo(), &tris, 0.0);
        assert_eq!(shapes.len(), 1);
        let a = area(&shapes[0].0);
        assert!((a - 12.0).abs() < 1e-6, "Area should be 12, got {a}");
    }

    #[test]
    fn test_ring_from_geo_drops_closing_point() {
        let ring = ring_to_geo(&square(0.0, 0.0, 1.0, 1.0));
        assert_eq!(ring.0.len(), 5);
        assert_eq!(ring_from_geo(&ring).len(), 4);
    }

    #[test]
    fn test_empty_inputs() {
        let report = overlay_polygons(
            &[],
            &ClassifiedMesh::default(),
            &HashMap::new(),
            &PipelineConfig::default(),
            &mut NoProgress,
        )
        .unwrap();
        assert!(report.footprints.is_empty());
        assert_eq!(report.stats, PlacementStats::default());
    }
}
