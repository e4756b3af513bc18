//! Planar maps: a half-edge subdivision of the plane with per-face and
//! per-half-edge attributes, and the editing operators that cut, overlay
//! and simplify them.
//!
//! Coordinates are longitude/latitude degrees snapped to a fixed lattice
//! so every topological decision is made with exact integer predicates.

mod build;
pub mod crop;
pub mod data;
mod edit;
pub mod kernel;
pub mod measure;
pub mod overlay;
pub mod pmwx;
pub mod swap;
pub mod topology;
mod validate;

pub use crop::{crop_map, crop_map_with_cutout, cut_ring};
pub use data::{FaceData, HalfedgeData, NetworkSegment, PolyObjPlacement};
pub use kernel::{Kernel, LatticeKernel, LatticePoint};
pub use measure::{edge_length_meters, face_area_meters};
pub use overlay::{merge_maps, overlay_map};
pub use pmwx::{FaceId, HalfedgeId, Pmwx, VertexId, UNBOUNDED};
pub use swap::swap_face;
pub use topology::{clean_face, reduce_to_water_bodies, remove_unbounded_water, simplify_map};

#[cfg(test)]
mod tests;
