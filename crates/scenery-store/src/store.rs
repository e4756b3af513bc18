//! Whole-tile container: token dictionary, raster layers and the map.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use scenery_core::error::read_file;
use scenery_core::tokens::{remap_id, ENUM_LAYERS};
use scenery_core::{Result, SceneryError, TokenId, TokenTable};
use scenery_dem::dem_file::{decode_dem, encode_dem};
use scenery_dem::{remap_enum_dem, Dem};
use scenery_map::Pmwx;

use crate::atom::{write_atom, AtomReader, DEMS, DIRS, PMWX, TOKN};

/// Everything persisted for one tile. Layer keys and every enumeration
/// inside are ids of the caller's `TokenTable`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneryStore {
    pub layers: BTreeMap<TokenId, Dem>,
    pub map: Pmwx,
}

impl SceneryStore {
    pub fn new(map: Pmwx) -> Self {
        Self {
            layers: BTreeMap::new(),
            map,
        }
    }

    /// Serialize into atoms. `tokens` must be the table the ids belong to.
    pub fn encode<W: Write>(&self, tokens: &TokenTable, writer: &mut W) -> io::Result<()> {
        let names = serde_json::to_vec(tokens.names())?;
        write_atom(writer, TOKN, &names)?;

        let mut dirs = Vec::with_capacity(4 + self.layers.len() * 4);
        dirs.extend_from_slice(&(self.layers.len() as u32).to_le_bytes());
        for &layer in self.layers.keys() {
            dirs.extend_from_slice(&layer.to_le_bytes());
        }
        write_atom(writer, DIRS, &dirs)?;

        for (&layer, dem) in &self.layers {
            let mut payload = Vec::with_capacity(4 + dem.samples.len() * 4 + 64);
            payload.extend_from_slice(&layer.to_le_bytes());
            encode_dem(dem, &mut payload)?;
            write_atom(writer, DEMS, &payload)?;
        }

        let map = serde_json::to_vec(&self.map)?;
        write_atom(writer, PMWX, &map)
    }

    /// Parse a container, remapping every id from the file's dictionary
    /// into `tokens`. Unknown atoms are skipped.
    pub fn decode(data: &[u8], name: &str, tokens: &mut TokenTable) -> Result<Self> {
        let mut file_tokens: Option<TokenTable> = None;
        let mut directory: Option<Vec<TokenId>> = None;
        let mut dems: Vec<(TokenId, Dem)> = Vec::new();
        let mut map: Option<Pmwx> = None;

        for atom in AtomReader::new(data, name) {
            let atom = atom?;
            match atom.tag {
                TOKN => {
                    let names: Vec<String> = serde_json::from_slice(atom.payload)
                        .map_err(|e| SceneryError::format(name, format!("bad TOKN atom: {e}")))?;
                    file_tokens = Some(TokenTable::from_names(names));
                }
                DIRS => directory = Some(parse_directory(atom.payload, name)?),
                DEMS => {
                    if atom.payload.len() < 4 {
                        return Err(SceneryError::format(name, "DEMS atom too short"));
                    }
                    let p = atom.payload;
                    let layer = i32::from_le_bytes([p[0], p[1], p[2], p[3]]);
                    let (dem, _) = decode_dem(&p[4..], name)?;
                    dems.push((layer, dem));
                }
                PMWX => {
                    let m: Pmwx = serde_json::from_slice(atom.payload)
                        .map_err(|e| SceneryError::format(name, format!("bad PMWX atom: {e}")))?;
                    map = Some(m);
                }
                _ => debug!(tag = %atom.tag_str(), "Skipping unknown atom"),
            }
        }

        let file_tokens = file_tokens
            .ok_or_else(|| SceneryError::format(name, "missing TOKN atom"))?;
        let directory = directory.unwrap_or_default();
        if directory.len() != dems.len() || directory.iter().zip(&dems).any(|(d, (l, _))| d != l) {
            return Err(SceneryError::format(
                name,
                format!(
                    "layer directory lists {} layers but {} DEMS atoms follow",
                    directory.len(),
                    dems.len()
                ),
            ));
        }

        let remap = tokens.remap_from(&file_tokens);
        let mut store = SceneryStore::new(map.unwrap_or_default());
        for (layer, mut dem) in dems {
            let layer = remap_id(layer, &remap);
            if ENUM_LAYERS.contains(&layer) {
                remap_enum_dem(&mut dem, &remap);
            }
            if store.layers.insert(layer, dem).is_some() {
                return Err(SceneryError::format(
                    name,
                    format!("layer {} stored twice", tokens.display(layer)),
                ));
            }
        }
        remap_map(&mut store.map, &remap);
        store.map.validate()?;
        Ok(store)
    }

    pub fn write(&self, path: &Path, tokens: &TokenTable) -> Result<()> {
        let mut buf = Vec::new();
        self.encode(tokens, &mut buf)
            .map_err(|e| SceneryError::io(path, e))?;
        std::fs::write(path, &buf).map_err(|e| SceneryError::io(path, e))?;
        info!(
            path = %path.display(),
            layers = self.layers.len(),
            faces = self.map.num_faces(),
            bytes = buf.len(),
            "Wrote store"
        );
        Ok(())
    }

    pub fn read(path: &Path, tokens: &mut TokenTable) -> Result<Self> {
        let data = read_file(path)?;
        let store = Self::decode(&data, &path.to_string_lossy(), tokens)?;
        info!(
            path = %path.display(),
            layers = store.layers.len(),
            faces = store.map.num_faces(),
            "Read store"
        );
        Ok(store)
    }
}

fn parse_directory(p: &[u8], name: &str) -> Result<Vec<TokenId>> {
    if p.len() < 4 {
        return Err(SceneryError::format(name, "DIRS atom too short"));
    }
    let count = u32::from_le_bytes([p[0], p[1], p[2], p[3]]) as usize;
    let body = &p[4..];
    if body.len() != count.saturating_mul(4) {
        return Err(SceneryError::format(
            name,
            format!("DIRS atom lists {count} layers in {} bytes", body.len()),
        ));
    }
    Ok(body
        .chunks_exact(4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn remap_map(map: &mut Pmwx, remap: &HashMap<TokenId, TokenId>) {
    for data in map.face_data_iter_mut() {
        data.remap(remap);
    }
    for data in map.halfedge_data_iter_mut() {
        data.remap(remap);
    }
}
