//! Natural terrain rules and the per-sample query they are matched against.

use serde::{Deserialize, Serialize};

use scenery_core::tokens::TERRAIN_NATURAL;
use scenery_core::{TokenId, NO_VALUE};

/// Inclusive numeric constraint. `min == max` (including the default
/// `0..0`) imposes no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const ANY: Range = Range { min: 0.0, max: 0.0 };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_any(&self) -> bool {
        self.min == self.max
    }

    pub fn matches(&self, x: f64) -> bool {
        self.is_any() || (self.min <= x && x <= self.max)
    }
}

fn enum_matches(rule: TokenId, value: TokenId) -> bool {
    rule == NO_VALUE || rule == value
}

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainRule {
    /// Required input terrain (e.g. `terrain_Natural`), or `NO_VALUE`.
    pub terrain: TokenId,
    pub zoning: TokenId,
    pub landuse: TokenId,
    pub soil: TokenId,
    pub agri: TokenId,
    pub climate: TokenId,
    /// Metres.
    pub elevation: Range,
    /// Stored as `1 - cos(angle)`.
    pub slope: Range,
    /// Degrees C.
    pub temperature: Range,
    pub temperature_range: Range,
    /// Millimetres per year.
    pub rainfall: Range,
    pub near_water: bool,
    pub relative_elevation: Range,
    pub elevation_range: Range,
    pub latitude: Range,
    pub urban_density: Range,
    pub urban_radial: Range,
    pub urban_transport: Range,
    /// 0 matches anything.
    pub urban_square: i32,
    /// Degrees clockwise from north.
    pub slope_heading: Range,
    /// 0 matches any variant.
    pub variant: i32,
    /// Output terrain.
    pub name: TokenId,
}

impl TerrainRule {
    /// A rule that matches everything and yields `name`.
    pub fn any(name: TokenId) -> Self {
        Self {
            terrain: NO_VALUE,
            zoning: NO_VALUE,
            landuse: NO_VALUE,
            soil: NO_VALUE,
            agri: NO_VALUE,
            climate: NO_VALUE,
            elevation: Range::ANY,
            slope: Range::ANY,
            temperature: Range::ANY,
            temperature_range: Range::ANY,
            rainfall: Range::ANY,
            near_water: false,
            relative_elevation: Range::ANY,
            elevation_range: Range::ANY,
            latitude: Range::ANY,
            urban_density: Range::ANY,
            urban_radial: Range::ANY,
            urban_transport: Range::ANY,
            urban_square: 0,
            slope_heading: Range::ANY,
            variant: 0,
            name,
        }
    }

    pub fn matches(&self, q: &TerrainQuery) -> bool {
        self.temperature.matches(q.temperature)
            && self.slope.matches(q.slope_at_triangle)
            && self.rainfall.matches(q.rainfall)
            && self.temperature_range.matches(q.temperature_range)
            && self.slope_heading.matches(q.slope_heading)
            && (self.variant == 0 || self.variant == q.variant_blob || self.variant == q.variant_head)
            && enum_matches(self.landuse, q.landuse)
            && enum_matches(self.soil, q.soil)
            && enum_matches(self.agri, q.agri)
            && enum_matches(self.climate, q.climate)
            && enum_matches(self.terrain, q.terrain)
            && enum_matches(self.zoning, q.zoning)
            && self.elevation.matches(q.elevation)
            && self.relative_elevation.matches(q.relative_elevation)
            && self.elevation_range.matches(q.elevation_range)
            && self.urban_density.matches(q.urban_density)
            && self.urban_transport.matches(q.urban_transport)
            && (self.urban_square == 0 || q.urban_square.map_or(true, |s| s == self.urban_square))
            && self.latitude.matches(q.latitude)
            && (!self.near_water || q.near_water)
            && self.urban_radial.matches(q.urban_radial)
    }
}

/// Everything known about one location when picking its terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainQuery {
    /// Terrain assigned upstream (usually `terrain_Natural`).
    pub terrain: TokenId,
    pub zoning: TokenId,
    pub landuse: TokenId,
    pub soil: TokenId,
    pub agri: TokenId,
    pub climate: TokenId,
    pub elevation: f64,
    /// Sample slope as `1 - cos(angle)`.
    pub slope: f64,
    /// Slope of the mesh triangle, same units; this is what rules test.
    pub slope_at_triangle: f64,
    pub temperature: f64,
    pub temperature_range: f64,
    pub rainfall: f64,
    pub near_water: bool,
    pub slope_heading: f64,
    pub relative_elevation: f64,
    pub elevation_range: f64,
    pub urban_density: f64,
    pub urban_radial: f64,
    pub urban_transport: f64,
    /// `None` when the urban square layer has no data here.
    pub urban_square: Option<i32>,
    pub latitude: f64,
    pub variant_blob: i32,
    pub variant_head: i32,
}

impl Default for TerrainQuery {
    fn default() -> Self {
        Self {
            terrain: TERRAIN_NATURAL,
            zoning: NO_VALUE,
            landuse: NO_VALUE,
            soil: NO_VALUE,
            agri: NO_VALUE,
            climate: NO_VALUE,
            elevation: 0.0,
            slope: 0.0,
            slope_at_triangle: 0.0,
            temperature: 0.0,
            temperature_range: 0.0,
            rainfall: 0.0,
            near_water: false,
            slope_heading: 0.0,
            relative_elevation: 0.0,
            elevation_range: 0.0,
            urban_density: 0.0,
            urban_radial: 0.0,
            urban_transport: 0.0,
            urban_square: None,
            latitude: 0.0,
            variant_blob: 0,
            variant_head: 0,
        }
    }
}

/// Convert a slope angle in degrees to the stored `1 - cos` form.
pub fn slope_from_degrees(deg: f64) -> f64 {
    1.0 - deg.to_radians().cos()
}
