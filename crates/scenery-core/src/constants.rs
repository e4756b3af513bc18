//! Numeric constants shared across the workspace.

/// Sentinel stored in raster samples that carry no value.
pub const NO_DATA: f32 = -32768.0;

/// Default lattice step (degrees) used to snap map coordinates.
/// Roughly a tenth of a millimetre at the equator.
pub const DEFAULT_MAP_RESOLUTION: f64 = 1e-9;

/// Buckets per axis of the placement spatial hash.
pub const PLACEMENT_HASH_DIMS: usize = 200;

/// Default simplify tolerance for placement footprints (degrees).
pub const PLACEMENT_SIMPLIFY_TOLERANCE: f64 = 1e-5;

/// Meters per degree of latitude (nearly constant across the globe).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Maximum nesting depth for `INCLUDE` directives in table files.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Returns true if a raster sample is the no-data sentinel.
#[inline]
pub fn is_no_data(v: f32) -> bool {
    v == NO_DATA
}
