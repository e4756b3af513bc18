//! Raw-code ↔ token translation for categorical rasters.
//!
//! Land-use style rasters arrive with producer-specific integer codes.
//! An `LU_IMPORT <raw> <token>` table maps them onto dictionary tokens;
//! the reverse map turns token grids back into raw codes for export.

use std::collections::HashMap;
use std::path::Path;

use scenery_core::config::{read_config_file, ConfigLine};
use scenery_core::constants::{is_no_data, NO_DATA};
use scenery_core::{Result, SceneryError, TokenId, TokenTable, NO_VALUE};
use tracing::{debug, warn};

use crate::grid::Dem;

/// Forward and reverse code tables plus a preview color table.
#[derive(Debug, Clone, Default)]
pub struct ValueTranslator {
    /// Raw code → token; `NO_VALUE` where unmapped.
    forward: Vec<TokenId>,
    /// Token → raw code. When several codes share a token the highest wins.
    reverse: HashMap<TokenId, i32>,
    /// RGB bytes per raw code, zero where the token has no color.
    clut: Vec<u8>,
}

impl ValueTranslator {
    /// Build from parsed table lines. Lines other than `LU_IMPORT` and
    /// `ENUM_COLOR` are ignored.
    pub fn from_lines(lines: &[ConfigLine], tokens: &mut TokenTable) -> Result<Self> {
        let mut forward: Vec<TokenId> = Vec::new();
        for line in lines {
            match line.key() {
                "LU_IMPORT" => {
                    line.expect_len(3)?;
                    let raw = line.int(1)?;
                    let raw = usize::try_from(raw)
                        .map_err(|_| line.error(format!("raw value {raw} is negative")))?;
                    let token = line.enumeration(2, tokens)?;
                    if raw >= forward.len() {
                        forward.resize(raw + 1, NO_VALUE);
                    }
                    if forward[raw] != NO_VALUE && forward[raw] != token {
                        warn!(raw, file = %line.file.display(), line = line.line, "raw value remapped");
                    }
                    forward[raw] = token;
                }
                "ENUM_COLOR" => {
                    line.expect_len(3)?;
                    let token = line.enumeration(1, tokens)?;
                    let rgb = line.color(2)?;
                    if !tokens.set_color(token, rgb) {
                        debug!(token = %tokens.display(token), "color replaced");
                    }
                }
                _ => {}
            }
        }
        Ok(Self::from_forward(forward, tokens))
    }

    /// Build from an explicit forward table.
    pub fn from_forward(forward: Vec<TokenId>, tokens: &TokenTable) -> Self {
        let mut reverse = HashMap::new();
        for (raw, &token) in forward.iter().enumerate() {
            if token != NO_VALUE {
                reverse.insert(token, raw as i32);
            }
        }
        let mut clut = Vec::with_capacity(forward.len() * 3);
        for &token in &forward {
            let rgb = tokens.color(token).unwrap_or([0.0; 3]);
            clut.extend(rgb.iter().map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8));
        }
        Self { forward, reverse, clut }
    }

    /// Read a table file (with includes).
    pub fn load(path: &Path, tokens: &mut TokenTable) -> Result<Self> {
        let lines = read_config_file(path)?;
        Self::from_lines(&lines, tokens)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Token for a raw code.
    pub fn token_for(&self, raw: i64) -> Option<TokenId> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| self.forward.get(i))
            .copied()
            .filter(|&t| t != NO_VALUE)
    }

    /// Raw code for a token.
    pub fn raw_for(&self, token: TokenId) -> Option<i32> {
        self.reverse.get(&token).copied()
    }

    /// RGB bytes for every raw code, in code order.
    pub fn clut(&self) -> &[u8] {
        &self.clut
    }

    /// Rewrite raw codes as tokens. Every sample is rewritten; samples that
    /// cannot be mapped (including no-data and NaN input) become no-data and are
    /// reported through `SemanticRange`.
    pub fn translate_forward(&self, dem: &mut Dem) -> Result<()> {
        rewrite(dem, |v| self.token_for(v as i64).map(|t| t as f32))
    }

    /// Rewrite tokens as raw codes, with the same failure policy.
    pub fn translate_reverse(&self, dem: &mut Dem) -> Result<()> {
        rewrite(dem, |v| self.raw_for(v as TokenId).map(|r| r as f32))
    }
}

fn rewrite(dem: &mut Dem, map: impl Fn(f32) -> Option<f32>) -> Result<()> {
    let total = dem.samples.len();
    let mut unmapped = 0;
    for v in dem.samples.iter_mut() {
        let out = if is_no_data(*v) || !v.is_finite() { None } else { map(*v) };
        *v = out.unwrap_or_else(|| {
            unmapped += 1;
            NO_DATA
        });
    }
    if unmapped > 0 {
        return Err(SceneryError::SemanticRange { unmapped, total });
    }
    Ok(())
}

/// Rewrite a categorical grid through a token remap table.
/// Negative samples and ids missing from the table are left alone.
pub fn remap_enum_dem(dem: &mut Dem, map: &HashMap<TokenId, TokenId>) {
    for v in dem.samples.iter_mut() {
        if *v >= 0.0 {
            if let Some(&to) = map.get(&(*v as TokenId)) {
                *v = to as f32;
            }
        }
    }
}
