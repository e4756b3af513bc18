//! The ordered terrain table: infos, rules and the matcher.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range as IndexRange;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use scenery_core::config::{read_config_file, ConfigLine};
use scenery_core::tokens::TERRAIN_WATER;
use scenery_core::{Result, SceneryError, TokenId, TokenTable, NO_VALUE};

use crate::info::TerrainInfo;
use crate::rules::{slope_from_degrees, Range, TerrainQuery, TerrainRule};

/// Terrain metadata plus rules in priority order (first match wins).
#[derive(Debug, Clone, Default)]
pub struct TerrainTable {
    pub infos: BTreeMap<TokenId, TerrainInfo>,
    pub rules: Vec<TerrainRule>,
    /// Number of identity rules at the front of `rules`.
    pub direct_rules: usize,
    /// First source line of each table rule, parallel to `rules`.
    pub(crate) origins: Vec<Option<(PathBuf, usize)>>,
}

impl TerrainTable {
    /// Load a table file (with includes).
    pub fn load(path: &Path, tokens: &mut TokenTable, strict_priority: bool) -> Result<Self> {
        let lines = read_config_file(path)?;
        let table = Self::from_lines(&lines, tokens, strict_priority)?;
        info!(
            path = %path.display(),
            infos = table.infos.len(),
            rules = table.rules.len(),
            "Loaded terrain table"
        );
        Ok(table)
    }

    /// Build a table from already-parsed lines. Keys owned by other
    /// consumers are skipped.
    pub fn from_lines(
        lines: &[ConfigLine],
        tokens: &mut TokenTable,
        strict_priority: bool,
    ) -> Result<Self> {
        let mut table = Self::default();
        // Output name -> rules produced by its latest TERRAIN_RULE line.
        let mut latest: HashMap<TokenId, IndexRange<usize>> = HashMap::new();
        let mut pending_names: Vec<(TokenId, &ConfigLine)> = Vec::new();

        for line in lines {
            match line.key() {
                "TERRAIN_INFO" => {
                    let info = TerrainInfo::parse(line, tokens)?;
                    if table.infos.contains_key(&info.name) {
                        return Err(line.error(format!(
                            "duplicate terrain {}",
                            tokens.display(info.name)
                        )));
                    }
                    table.infos.insert(info.name, info);
                }
                "TERRAIN_RULE" => {
                    let parsed = parse_rule(line, tokens)?;
                    let start = table.rules.len();
                    if let Some(first) = parsed.first() {
                        pending_names.push((first.name, line));
                    }
                    for rule in parsed {
                        table.rules.push(rule);
                        table.origins.push(Some((line.file.clone(), line.line)));
                    }
                    if let Some(rule) = table.rules.last() {
                        latest.insert(rule.name, start..table.rules.len());
                    }
                }
                "TERRAIN_RULE_URBAN" => {
                    line.expect_len(12)?;
                    let name = line.enumeration(1, tokens)?;
                    let span = latest.get(&name).cloned().ok_or_else(|| {
                        line.error(format!(
                            "no TERRAIN_RULE yet for {}",
                            tokens.display(name)
                        ))
                    })?;
                    let density = range(line, 2)?;
                    let radial = range(line, 4)?;
                    let transport = range(line, 6)?;
                    let square = int32(line, 8)?;
                    let heading = range(line, 9)?;
                    let variant = int32(line, 11)?;
                    for rule in &mut table.rules[span] {
                        rule.urban_density = density;
                        rule.urban_radial = radial;
                        rule.urban_transport = transport;
                        rule.urban_square = square;
                        rule.slope_heading = heading;
                        rule.variant = variant;
                    }
                }
                "ENUM_COLOR" => {
                    line.expect_len(3)?;
                    let id = line.enumeration(1, tokens)?;
                    let rgb = line.color(2)?;
                    tokens.set_color(id, rgb);
                }
                other => debug!(key = other, "Skipping line not owned by the terrain table"),
            }
        }

        for (name, line) in pending_names {
            if !table.infos.contains_key(&name) {
                return Err(line.error(format!(
                    "rule output {} has no TERRAIN_INFO",
                    tokens.display(name)
                )));
            }
        }

        let conflicts = table.check_priority_consistency();
        for &(earlier, later) in &conflicts {
            let msg = format!(
                "rule for {} precedes {} but has a lower layer",
                tokens.display(earlier),
                tokens.display(later)
            );
            if strict_priority {
                let (file, line) = table.first_line_of(later).unwrap_or_default();
                return Err(SceneryError::Config {
                    file,
                    line,
                    reason: msg,
                });
            }
            warn!("{msg}");
        }

        Ok(table)
    }

    fn first_line_of(&self, name: TokenId) -> Option<(PathBuf, usize)> {
        self.rules
            .iter()
            .zip(&self.origins)
            .find(|(r, _)| r.name == name)
            .and_then(|(_, o)| o.clone())
    }

    pub fn info(&self, terrain: TokenId) -> Option<&TerrainInfo> {
        self.infos.get(&terrain)
    }

    fn layer(&self, terrain: TokenId) -> i32 {
        self.infos.get(&terrain).map_or(0, |i| i.layer)
    }

    /// Pick the terrain for one location. `None` when no rule matches.
    pub fn find_natural_terrain(&self, q: &TerrainQuery) -> Option<TokenId> {
        self.rules.iter().find(|r| r.matches(q)).map(|r| r.name)
    }

    /// True when `a` draws below `b`. Water is lowest; then by layer;
    /// equal layers fall back to token order.
    pub fn lower_priority(&self, a: TokenId, b: TokenId) -> bool {
        if a == b {
            return false;
        }
        if a == TERRAIN_WATER {
            return true;
        }
        if b == TERRAIN_WATER {
            return false;
        }
        let (la, lb) = (self.layer(a), self.layer(b));
        if la != lb {
            return la < lb;
        }
        a < b
    }

    /// Prepend one identity rule per declared terrain, so a location
    /// already carrying a concrete terrain keeps it.
    pub fn make_direct_rules(&mut self) {
        let direct: Vec<TerrainRule> = self
            .infos
            .keys()
            .map(|&name| TerrainRule {
                terrain: name,
                ..TerrainRule::any(name)
            })
            .collect();
        let n = direct.len();
        self.rules.splice(0..0, direct);
        self.origins.splice(0..0, std::iter::repeat(None).take(n));
        self.direct_rules += n;
    }

    /// Pairs `(earlier, later)` of output terrains where the earlier rule
    /// sits on a lower layer than a later one. Identity rules and water
    /// are not checked.
    pub fn check_priority_consistency(&self) -> Vec<(TokenId, TokenId)> {
        let mut order: Vec<TokenId> = Vec::new();
        for rule in &self.rules[self.direct_rules.min(self.rules.len())..] {
            if rule.name != TERRAIN_WATER && !order.contains(&rule.name) {
                order.push(rule.name);
            }
        }
        let mut out = Vec::new();
        for (i, &earlier) in order.iter().enumerate() {
            for &later in &order[i + 1..] {
                if self.layer(earlier) < self.layer(later) {
                    out.push((earlier, later));
                }
            }
        }
        out
    }

    /// Terrain -> vegetation placement type, for terrains that carry one.
    pub fn forest_mapping(&self) -> HashMap<TokenId, TokenId> {
        self.infos
            .values()
            .filter(|i| i.forest_type != NO_VALUE)
            .map(|i| (i.name, i.forest_type))
            .collect()
    }
}

fn int32(line: &ConfigLine, i: usize) -> Result<i32> {
    let v = line.int(i)?;
    i32::try_from(v).map_err(|_| line.error(format!("value {v} out of range")))
}

/// Read `min max` at `i`, rejecting inverted bounds.
fn range(line: &ConfigLine, i: usize) -> Result<Range> {
    let (min, max) = (line.float(i)?, line.float(i + 1)?);
    if min > max {
        return Err(line.error(format!("range {min}..{max} has min above max")));
    }
    Ok(Range::new(min, max))
}

fn parse_rule(line: &ConfigLine, tokens: &mut TokenTable) -> Result<Vec<TerrainRule>> {
    line.expect_len(25)?;
    let terrain = line.enumeration(1, tokens)?;
    let zoning = line.enumeration(2, tokens)?;
    let landuses = line.enum_set(3, tokens)?;
    let soil = line.enumeration(4, tokens)?;
    let agri = line.enumeration(5, tokens)?;
    let climate = line.enumeration(6, tokens)?;
    let elevation = range(line, 7)?;
    let slope_deg = range(line, 9)?;
    let temperature = range(line, 11)?;
    let temperature_range = range(line, 13)?;
    let rainfall = range(line, 15)?;
    let near_water = line.int(17)? != 0;
    let relative_elevation = range(line, 18)?;
    let elevation_range = range(line, 20)?;
    let latitude = range(line, 22)?;
    let name = line.enumeration(24, tokens)?;
    if name == NO_VALUE {
        return Err(line.error("rule has no output terrain"));
    }

    let slope = if slope_deg.is_any() {
        Range::ANY
    } else {
        Range::new(slope_from_degrees(slope_deg.min), slope_from_degrees(slope_deg.max))
    };

    let base = TerrainRule {
        terrain,
        zoning,
        soil,
        agri,
        climate,
        elevation,
        slope,
        temperature,
        temperature_range,
        rainfall,
        near_water,
        relative_elevation,
        elevation_range,
        latitude,
        ..TerrainRule::any(name)
    };

    if landuses.is_empty() {
        return Ok(vec![base]);
    }
    Ok(landuses
        .into_iter()
        .map(|landuse| TerrainRule {
            landuse,
            ..base.clone()
        })
        .collect())
}
