//! Terrain classification engine.
//!
//! A [`TerrainTable`] holds terrain metadata and an ordered list of rules.
//! Matching scans the rules once and returns the first hit, so table order
//! is priority order. [`classify_grid`] runs the matcher over a stack of
//! aligned raster layers.

pub mod classify;
pub mod info;
pub mod rules;
pub mod table;

pub use classify::{classify_grid, LayerSet};
pub use info::TerrainInfo;
pub use rules::{slope_from_degrees, Range, TerrainQuery, TerrainRule};
pub use table::TerrainTable;

#[cfg(test)]
mod tests;
