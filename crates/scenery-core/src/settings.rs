//! Pipeline settings loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAP_RESOLUTION, PLACEMENT_HASH_DIMS, PLACEMENT_SIMPLIFY_TOLERANCE};
use crate::error::{read_file, Result, SceneryError};

/// Tunables for a processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lattice step (degrees) that map coordinates are snapped to.
    pub map_resolution: f64,
    /// Buckets per axis in the placement spatial hash.
    pub placement_buckets: usize,
    /// Maximum vertex displacement when simplifying footprints (degrees).
    pub placement_simplify_tolerance: f64,
    /// Fail rule loading when table order and priority order disagree.
    pub strict_priority: bool,
    /// Fill isolated elevation voids after import.
    pub fill_voids: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            map_resolution: DEFAULT_MAP_RESOLUTION,
            placement_buckets: PLACEMENT_HASH_DIMS,
            placement_simplify_tolerance: PLACEMENT_SIMPLIFY_TOLERANCE,
            strict_priority: false,
            fill_voids: false,
        }
    }
}

impl PipelineConfig {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = read_file(path)?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| SceneryError::format(path.display().to_string(), e.to_string()))?;
        config.validate().map_err(|reason| SceneryError::format(path.display().to_string(), reason))?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(self.map_resolution > 0.0) {
            return Err(format!("map_resolution must be positive, got {}", self.map_resolution));
        }
        if self.placement_buckets == 0 {
            return Err("placement_buckets must be at least 1".to_string());
        }
        if self.placement_simplify_tolerance < 0.0 {
            return Err("placement_simplify_tolerance must not be negative".to_string());
        }
        Ok(())
    }
}
