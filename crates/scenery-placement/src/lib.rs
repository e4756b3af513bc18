//! Placement overlay: turns a classified mesh and macro polygons into
//! per-type vegetation footprints.
//!
//! Triangles whose terrain maps to a placement type are bucketed in a
//! [`TriangleHash`]. Each polygon pulls the triangles under its bounding
//! box, unions them per type, clips the union to itself and simplifies
//! the result.

pub mod forests;
pub mod hash;
pub mod mesh;

pub use forests::{
    generate_forests, overlay_polygons, Footprint, GtPolygon, PlacementReport, PlacementStats,
};
pub use hash::TriangleHash;
pub use mesh::{ClassifiedMesh, MeshTriangle};
