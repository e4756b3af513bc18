//! Raster grids and the importers that fill them.
//!
//! A [`Dem`] is a georeferenced rectangle of `f32` samples with a reserved
//! no-data value. Elevation, land use, climate and the other per-layer
//! inputs of the terrain engine all share this one representation.

pub mod dem_file;
pub mod dted;
pub mod geotiff;
pub mod grid;
pub mod hgt;
pub mod ida;
pub mod import;
pub mod raw_img;
pub mod translate;
pub mod usgs;

pub use grid::{Dem, DemHeader};
pub use import::{detect_format, import_dem, import_dem_as, parse_dem, DemFormat};
pub use translate::{remap_enum_dem, ValueTranslator};

#[cfg(test)]
mod tests;
