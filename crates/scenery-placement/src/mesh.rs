//! Classified triangle mesh handed over by the mesh builder.

use std::collections::HashMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use scenery_core::tokens::TERRAIN_WATER;
use scenery_core::{TokenId, NO_VALUE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshTriangle {
    pub corners: [DVec2; 3],
    /// Terrain id chosen by the classifier.
    pub terrain: TokenId,
}

impl MeshTriangle {
    pub fn new(a: DVec2, b: DVec2, c: DVec2, terrain: TokenId) -> Self {
        Self {
            corners: [a, b, c],
            terrain,
        }
    }

    /// Placement type for this triangle, if it gets one. Water never does.
    pub fn placement_type(&self, mapping: &HashMap<TokenId, TokenId>) -> Option<TokenId> {
        if self.terrain == TERRAIN_WATER {
            return None;
        }
        mapping.get(&self.terrain).copied().filter(|&t| t != NO_VALUE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedMesh {
    pub triangles: Vec<MeshTriangle>,
}

impl ClassifiedMesh {
    pub fn new(triangles: Vec<MeshTriangle>) -> Self {
        Self { triangles }
    }

    pub fn bounding_box(&self) -> Option<(DVec2, DVec2)> {
        let mut corners = self.triangles.iter().flat_map(|t| t.corners);
        let first = corners.next()?;
        Some(corners.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Split an axis-aligned box into a `cols × rows` grid of triangles,
    /// two per cell, with terrain chosen per cell.
    pub fn grid<F>(lo: DVec2, hi: DVec2, cols: usize, rows: usize, mut terrain: F) -> Self
    where
        F: FnMut(usize, usize) -> TokenId,
    {
        let step = (hi - lo) / DVec2::new(cols.max(1) as f64, rows.max(1) as f64);
        let mut triangles = Vec::with_capacity(cols * rows * 2);
        for r in 0..rows {
            for c in 0..cols {
                let p0 = lo + step * DVec2::new(c as f64, r as f64);
                let p1 = p0 + DVec2::new(step.x, 0.0);
                let p2 = p0 + step;
                let p3 = p0 + DVec2::new(0.0, step.y);
                let t = terrain(c, r);
                triangles.push(MeshTriangle::new(p0, p1, p2, t));
                triangles.push(MeshTriangle::new(p0, p2, p3, t));
            }
        }
        Self { triangles }
    }
}
