//! Grid classification sweep: one terrain id per elevation sample.

use std::collections::BTreeMap;

use tracing::info;

use scenery_core::constants::{is_no_data, METERS_PER_DEGREE, NO_DATA};
use scenery_core::progress::Ticker;
use scenery_core::tokens::{
    DEM_AGRI_STYLE, DEM_CLIMATE, DEM_ELEVATION, DEM_ELEVATION_RANGE, DEM_LAND_USE,
    DEM_NATURAL_TERRAIN, DEM_RAINFALL, DEM_RELATIVE_ELEVATION, DEM_SLOPE, DEM_SLOPE_HEADING,
    DEM_SOIL, DEM_TEMPERATURE, DEM_TEMPERATURE_RANGE, DEM_URBAN_DENSITY, DEM_URBAN_RADIAL,
    DEM_URBAN_SQUARE, DEM_URBAN_TRANSPORT, DEM_ZONING, TERRAIN_NATURAL, TERRAIN_WATER,
};
use scenery_core::{Progress, Result, SceneryError, TokenId, NO_VALUE};
use scenery_dem::Dem;

use crate::rules::TerrainQuery;
use crate::table::TerrainTable;

/// Borrowed input layers keyed by layer token.
pub struct LayerSet<'a> {
    layers: &'a BTreeMap<TokenId, Dem>,
    elevation: &'a Dem,
}

impl<'a> LayerSet<'a> {
    pub fn new(layers: &'a BTreeMap<TokenId, Dem>) -> Result<Self> {
        let elevation = layers
            .get(&DEM_ELEVATION)
            .ok_or_else(|| SceneryError::format("classify", "missing dem_Elevation layer"))?;
        Ok(Self { layers, elevation })
    }

    fn continuous(&self, layer: TokenId, lon: f64, lat: f64) -> f64 {
        self.layers
            .get(&layer)
            .and_then(|d| d.value_at(lon, lat))
            .map_or(0.0, f64::from)
    }

    fn category(&self, layer: TokenId, lon: f64, lat: f64) -> Option<TokenId> {
        self.layers
            .get(&layer)
            .and_then(|d| d.value_nearest(lon, lat))
            .map(|v| v as TokenId)
    }

    fn enumeration(&self, layer: TokenId, lon: f64, lat: f64) -> TokenId {
        self.category(layer, lon, lat).unwrap_or(NO_VALUE)
    }

    /// Whether any of the eight neighbours of sample `(x, y)` is marked as
    /// water in the natural terrain layer.
    fn near_water(&self, x: usize, y: usize) -> bool {
        if !self.layers.contains_key(&DEM_NATURAL_TERRAIN) {
            return false;
        }
        let header = &self.elevation.header;
        let (w, h) = (header.width as isize, header.height as isize);
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let (nx, ny) = (x as isize + dx, y as isize + dy);
                if (dx == 0 && dy == 0) || nx < 0 || ny < 0 || nx >= w || ny >= h {
                    continue;
                }
                let lon = header.x_to_lon(nx as f64);
                let lat = header.y_to_lat(ny as f64);
                if self.category(DEM_NATURAL_TERRAIN, lon, lat) == Some(TERRAIN_WATER) {
                    return true;
                }
            }
        }
        false
    }

    /// Build the query for elevation sample `(x, y)`. `None` on void elevation.
    pub fn query(&self, x: usize, y: usize) -> Option<TerrainQuery> {
        let dem = self.elevation;
        let elevation = dem.get(x, y);
        if is_no_data(elevation) {
            return None;
        }
        let lon = dem.header.x_to_lon(x as f64);
        let lat = dem.header.y_to_lat(y as f64);

        let (slope, heading) = match self.layers.get(&DEM_SLOPE) {
            Some(s) => (
                s.value_at(lon, lat).map_or(0.0, f64::from),
                self.continuous(DEM_SLOPE_HEADING, lon, lat),
            ),
            None => {
                let (s, h) = gradient_slope(dem, x, y, lat);
                let h = if self.layers.contains_key(&DEM_SLOPE_HEADING) {
                    self.continuous(DEM_SLOPE_HEADING, lon, lat)
                } else {
                    h
                };
                (s, h)
            }
        };

        Some(TerrainQuery {
            terrain: self.category(DEM_NATURAL_TERRAIN, lon, lat).unwrap_or(TERRAIN_NATURAL),
            zoning: self.enumeration(DEM_ZONING, lon, lat),
            landuse: self.enumeration(DEM_LAND_USE, lon, lat),
            soil: self.enumeration(DEM_SOIL, lon, lat),
            agri: self.enumeration(DEM_AGRI_STYLE, lon, lat),
            climate: self.enumeration(DEM_CLIMATE, lon, lat),
            elevation: f64::from(elevation),
            slope,
            slope_at_triangle: slope,
            temperature: self.continuous(DEM_TEMPERATURE, lon, lat),
            temperature_range: self.continuous(DEM_TEMPERATURE_RANGE, lon, lat),
            rainfall: self.continuous(DEM_RAINFALL, lon, lat),
            near_water: self.near_water(x, y),
            slope_heading: heading,
            relative_elevation: self.continuous(DEM_RELATIVE_ELEVATION, lon, lat),
            elevation_range: self.continuous(DEM_ELEVATION_RANGE, lon, lat),
            urban_density: self.continuous(DEM_URBAN_DENSITY, lon, lat),
            urban_radial: self.continuous(DEM_URBAN_RADIAL, lon, lat),
            urban_transport: self.continuous(DEM_URBAN_TRANSPORT, lon, lat),
            urban_square: self.category(DEM_URBAN_SQUARE, lon, lat),
            latitude: lat,
            variant_blob: 0,
            variant_head: 0,
        })
    }
}

/// Slope (`1 - cos`) and downhill heading (degrees clockwise from north)
/// from central differences. Void neighbours count as flat.
fn gradient_slope(dem: &Dem, x: usize, y: usize, lat: f64) -> (f64, f64) {
    let (xi, yi) = (x as isize, y as isize);
    let here = dem.get(x, y) as f64;
    let diff = |a: f32, b: f32| -> f64 {
        match (is_no_data(a), is_no_data(b)) {
            (false, false) => a as f64 - b as f64,
            (false, true) => a as f64 - here,
            (true, false) => here - b as f64,
            (true, true) => 0.0,
        }
    };
    let dx_m = dem.header.x_res() * METERS_PER_DEGREE * lat.to_radians().cos();
    let dy_m = dem.header.y_res() * METERS_PER_DEGREE;
    if dx_m <= 0.0 || dy_m <= 0.0 {
        return (0.0, 0.0);
    }
    // Rows run north to south.
    let east = diff(dem.get_clamped(xi + 1, yi), dem.get_clamped(xi - 1, yi)) / (2.0 * dx_m);
    let north = diff(dem.get_clamped(xi, yi - 1), dem.get_clamped(xi, yi + 1)) / (2.0 * dy_m);
    let g2 = east * east + north * north;
    let slope = 1.0 - 1.0 / (1.0 + g2).sqrt();
    let heading = if g2 == 0.0 {
        0.0
    } else {
        (-east).atan2(-north).to_degrees().rem_euclid(360.0)
    };
    (slope, heading)
}

/// Classify every elevation sample. The result shares the elevation
/// grid's georeferencing and holds terrain ids, or no-data where the
/// elevation is void or no rule matches.
pub fn classify_grid(
    inputs: &BTreeMap<TokenId, Dem>,
    table: &TerrainTable,
    progress: &mut dyn Progress,
) -> Result<Dem> {
    let layers = LayerSet::new(inputs)?;
    let mut out = Dem::new(layers.elevation.header);
    let height = out.height();
    let ticker = Ticker::new(height);
    let mut unmatched = 0usize;

    for y in 0..height {
        ticker.tick(progress, 0, 1, "Classifying terrain", y)?;
        for x in 0..out.width() {
            let terrain = layers
                .query(x, y)
                .and_then(|q| table.find_natural_terrain(&q));
            match terrain {
                Some(t) => out.set(x, y, t as f32),
                None => {
                    unmatched += 1;
                    out.set(x, y, NO_DATA);
                }
            }
        }
    }

    info!(
        samples = out.header.sample_count(),
        unmatched, "Classified terrain grid"
    );
    Ok(out)
}
