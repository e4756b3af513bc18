//! Per-terrain metadata declared by `TERRAIN_INFO` lines.

use serde::{Deserialize, Serialize};

use scenery_core::config::ConfigLine;
use scenery_core::{Result, TokenId, TokenTable};

/// Rendering and placement metadata for one terrain type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainInfo {
    pub name: TokenId,
    /// Draw layer; higher layers sit on top when blending borders.
    pub layer: i32,
    /// Cross-over blend distance in metres.
    pub xon_dist: f64,
    pub color: [f32; 3],
    /// Vegetation placement type, or `NO_VALUE` for bare terrain.
    pub forest_type: TokenId,
    pub base_tex: String,
}

impl TerrainInfo {
    /// Parse `TERRAIN_INFO <name> <layer> <xon_dist> <color> <forest_type> <base_tex>`.
    pub fn parse(line: &ConfigLine, tokens: &mut TokenTable) -> Result<Self> {
        line.expect_len(7)?;
        let layer = line.int(2)?;
        let layer = i32::try_from(layer)
            .map_err(|_| line.error(format!("layer {layer} out of range")))?;
        Ok(Self {
            name: line.enumeration(1, tokens)?,
            layer,
            xon_dist: line.float(3)?,
            color: line.color(4)?,
            forest_type: line.enumeration(5, tokens)?,
            base_tex: line.str(6)?.to_string(),
        })
    }
}
