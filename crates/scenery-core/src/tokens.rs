//! Token dictionary: interns enumeration names to dense integer ids.
//!
//! Terrain types, land-use classes, raster layer ids and edge parameter
//! keys are all tokens. A fixed built-in vocabulary is registered first in
//! every table so the well-known ids below are stable constants; anything
//! else gets the next free id in load order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Integer id of an interned token.
pub type TokenId = i32;

/// "No value" / "don't care" marker for enumerated fields.
pub const NO_VALUE: TokenId = -1;

pub const TERRAIN_NATURAL: TokenId = 0;
pub const TERRAIN_WATER: TokenId = 1;
pub const TERRAIN_FOREST_PARK: TokenId = 2;
pub const TERRAIN_AIRPORT: TokenId = 3;
pub const HE_IS_RIVER: TokenId = 4;
pub const HE_MUST_BURN: TokenId = 5;
pub const DEM_ELEVATION: TokenId = 6;
pub const DEM_LAND_USE: TokenId = 7;
pub const DEM_CLIMATE: TokenId = 8;
pub const DEM_TEMPERATURE: TokenId = 9;
pub const DEM_TEMPERATURE_RANGE: TokenId = 10;
pub const DEM_RAINFALL: TokenId = 11;
pub const DEM_SLOPE: TokenId = 12;
pub const DEM_SLOPE_HEADING: TokenId = 13;
pub const DEM_RELATIVE_ELEVATION: TokenId = 14;
pub const DEM_ELEVATION_RANGE: TokenId = 15;
pub const DEM_URBAN_DENSITY: TokenId = 16;
pub const DEM_URBAN_RADIAL: TokenId = 17;
pub const DEM_URBAN_TRANSPORT: TokenId = 18;
pub const DEM_URBAN_SQUARE: TokenId = 19;
pub const DEM_NATURAL_TERRAIN: TokenId = 20;
pub const DEM_SOIL: TokenId = 21;
pub const DEM_AGRI_STYLE: TokenId = 22;
pub const DEM_CLIM_STYLE: TokenId = 23;
pub const DEM_ZONING: TokenId = 24;

/// Names of the built-in tokens, indexed by id.
pub const BUILTIN_TOKENS: &[&str] = &[
    "terrain_Natural",
    "terrain_Water",
    "terrain_ForestPark",
    "terrain_Airport",
    "he_IsRiver",
    "he_MustBurn",
    "dem_Elevation",
    "dem_LandUse",
    "dem_Climate",
    "dem_Temperature",
    "dem_TemperatureRange",
    "dem_Rainfall",
    "dem_Slope",
    "dem_SlopeHeading",
    "dem_RelativeElevation",
    "dem_ElevationRange",
    "dem_UrbanDensity",
    "dem_UrbanRadial",
    "dem_UrbanTransport",
    "dem_UrbanSquare",
    "dem_NaturalTerrain",
    "dem_Soil",
    "dem_AgriStyle",
    "dem_ClimStyle",
    "dem_Zoning",
];

/// Raster layers whose samples are token ids rather than measurements.
pub const ENUM_LAYERS: &[TokenId] = &[
    DEM_LAND_USE,
    DEM_CLIMATE,
    DEM_NATURAL_TERRAIN,
    DEM_SOIL,
    DEM_AGRI_STYLE,
    DEM_CLIM_STYLE,
    DEM_ZONING,
];

/// Interning table for enumeration names, with an optional preview color per token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTable {
    names: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, TokenId>,
    colors: HashMap<TokenId, [f32; 3]>,
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenTable {
    /// A table holding only the built-in vocabulary.
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::with_capacity(BUILTIN_TOKENS.len()),
            index: HashMap::new(),
            colors: HashMap::new(),
        };
        for name in BUILTIN_TOKENS {
            table.intern(name);
        }
        table
    }

    /// Rebuild a table from a name list in id order (e.g. read from disk).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self {
            names: Vec::new(),
            index: HashMap::new(),
            colors: HashMap::new(),
        };
        for name in names {
            let name = name.into();
            let id = table.names.len() as TokenId;
            if table.index.insert(name.clone(), id).is_some() {
                warn!("duplicate token {name} in dictionary");
            }
            table.names.push(name);
        }
        table
    }

    /// Id of `name`, registering it if it is new.
    pub fn intern(&mut self, name: &str) -> TokenId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.names.len() as TokenId;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    /// Id of an already registered name.
    pub fn lookup(&self, name: &str) -> Option<TokenId> {
        self.index.get(name).copied()
    }

    /// Name of a token id, if it exists.
    pub fn name(&self, id: TokenId) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Name of a token id, or a placeholder for display.
    pub fn display(&self, id: TokenId) -> String {
        match self.name(id) {
            Some(n) => n.to_string(),
            None if id == NO_VALUE => "NO_VALUE".to_string(),
            None => format!("<token {id}>"),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Assign a preview color. Returns false if the token already had one.
    pub fn set_color(&mut self, id: TokenId, rgb: [f32; 3]) -> bool {
        self.colors.insert(id, rgb).is_none()
    }

    pub fn color(&self, id: TokenId) -> Option<[f32; 3]> {
        self.colors.get(&id).copied()
    }

    /// Map every id of `other` to the id of the same name in `self`,
    /// interning names `self` has never seen.
    pub fn remap_from(&mut self, other: &TokenTable) -> HashMap<TokenId, TokenId> {
        other
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| (i as TokenId, self.intern(name)))
            .collect()
    }

    /// Restore the name index after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as TokenId))
            .collect();
    }
}

/// Apply a remap table to a single id; ids not in the table pass through.
#[inline]
pub fn remap_id(id: TokenId, map: &HashMap<TokenId, TokenId>) -> TokenId {
    map.get(&id).copied().unwrap_or(id)
}
