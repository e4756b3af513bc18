//! Attributes carried by faces and half-edges.

use std::collections::{BTreeMap, HashMap};

use glam::DVec2;
use scenery_core::tokens::{remap_id, TERRAIN_NATURAL, TERRAIN_WATER};
use scenery_core::{TokenId, NO_VALUE};
use serde::{Deserialize, Serialize};

/// Numeric parameters keyed by token.
pub type ParamMap = BTreeMap<TokenId, f64>;

fn remap_params(params: &mut ParamMap, map: &HashMap<TokenId, TokenId>) {
    *params = std::mem::take(params)
        .into_iter()
        .map(|(k, v)| (remap_id(k, map), v))
        .collect();
}

/// The single area feature a face may carry (park, airport apron, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaFeature {
    pub feat_type: TokenId,
    pub params: ParamMap,
}

impl Default for AreaFeature {
    fn default() -> Self {
        Self {
            feat_type: NO_VALUE,
            params: ParamMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    pub feat_type: TokenId,
    pub location: DVec2,
    #[serde(default)]
    pub params: ParamMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFeature {
    pub feat_type: TokenId,
    /// Outer ring first, then holes.
    pub shape: Vec<Vec<DVec2>>,
    #[serde(default)]
    pub params: ParamMap,
}

/// A single placed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjPlacement {
    pub rep_type: TokenId,
    pub location: DVec2,
    pub heading: f64,
    pub derived: bool,
}

/// A polygonal placement such as a forest footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyObjPlacement {
    pub rep_type: TokenId,
    /// Outer ring first, then holes.
    pub shape: Vec<Vec<DVec2>>,
    /// Instance anchor.
    pub location: DVec2,
    #[serde(default)]
    pub params: ParamMap,
    /// Generated by a pipeline step rather than imported.
    pub derived: bool,
}

/// Domain attributes of a face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    pub terrain_type: TokenId,
    #[serde(default)]
    pub area_feature: AreaFeature,
    #[serde(default)]
    pub params: ParamMap,
    #[serde(default)]
    pub point_features: Vec<PointFeature>,
    #[serde(default)]
    pub polygon_features: Vec<PolygonFeature>,
    #[serde(default)]
    pub objs: Vec<ObjPlacement>,
    #[serde(default)]
    pub poly_objs: Vec<PolyObjPlacement>,
}

impl Default for FaceData {
    fn default() -> Self {
        Self {
            terrain_type: TERRAIN_NATURAL,
            area_feature: AreaFeature::default(),
            params: ParamMap::new(),
            point_features: Vec::new(),
            polygon_features: Vec::new(),
            objs: Vec::new(),
            poly_objs: Vec::new(),
        }
    }
}

impl FaceData {
    /// Face data with only a terrain type set.
    pub fn with_terrain(terrain_type: TokenId) -> Self {
        Self {
            terrain_type,
            ..Self::default()
        }
    }

    pub fn is_water(&self) -> bool {
        self.terrain_type == TERRAIN_WATER
    }

    /// No terrain and no area feature: the face has never been typed.
    pub fn is_empty(&self) -> bool {
        self.terrain_type == TERRAIN_NATURAL && self.area_feature.feat_type == NO_VALUE
    }

    /// Take over the features and placements of a face being merged into
    /// this one. Terrain and area feature stay as they are; parameters
    /// only fill keys this face does not set.
    pub fn absorb(&mut self, other: &FaceData) {
        for (&k, &v) in &other.params {
            self.params.entry(k).or_insert(v);
        }
        self.point_features.extend(other.point_features.iter().cloned());
        self.polygon_features.extend(other.polygon_features.iter().cloned());
        self.objs.extend(other.objs.iter().cloned());
        self.poly_objs.extend(other.poly_objs.iter().cloned());
    }

    /// Rewrite every enumeration id through `map`.
    pub fn remap(&mut self, map: &HashMap<TokenId, TokenId>) {
        self.terrain_type = remap_id(self.terrain_type, map);
        self.area_feature.feat_type = remap_id(self.area_feature.feat_type, map);
        remap_params(&mut self.area_feature.params, map);
        remap_params(&mut self.params, map);
        for f in &mut self.point_features {
            f.feat_type = remap_id(f.feat_type, map);
            remap_params(&mut f.params, map);
        }
        for f in &mut self.polygon_features {
            f.feat_type = remap_id(f.feat_type, map);
            remap_params(&mut f.params, map);
        }
        for o in &mut self.objs {
            o.rep_type = remap_id(o.rep_type, map);
        }
        for o in &mut self.poly_objs {
            o.rep_type = remap_id(o.rep_type, map);
            remap_params(&mut o.params, map);
        }
    }
}

/// One transportation link running along a half-edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSegment {
    pub feat_type: TokenId,
    pub rep_type: TokenId,
    pub source_height: f64,
    pub target_height: f64,
}

impl NetworkSegment {
    pub fn new(feat_type: TokenId) -> Self {
        Self {
            feat_type,
            rep_type: NO_VALUE,
            source_height: 0.0,
            target_height: 0.0,
        }
    }
}

/// Attributes of one directed half-edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalfedgeData {
    #[serde(default)]
    pub segments: Vec<NetworkSegment>,
    #[serde(default)]
    pub params: ParamMap,
    /// Border transition type, 0 for none.
    #[serde(default)]
    pub transition: i32,
    #[serde(default)]
    pub inset: f64,
    #[serde(default)]
    pub mark: bool,
}

impl HalfedgeData {
    pub fn has_roads(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn has_param(&self, key: TokenId) -> bool {
        self.params.contains_key(&key)
    }

    /// Fold another half-edge's data into this one. Existing values win;
    /// merging with the default leaves `self` unchanged.
    pub fn merge(&mut self, other: &HalfedgeData) {
        for seg in &other.segments {
            if !self.segments.contains(seg) {
                self.segments.push(seg.clone());
            }
        }
        for (&k, &v) in &other.params {
            self.params.entry(k).or_insert(v);
        }
        if self.transition == 0 {
            self.transition = other.transition;
        }
        if self.inset == 0.0 {
            self.inset = other.inset;
        }
        self.mark |= other.mark;
    }

    pub fn remap(&mut self, map: &HashMap<TokenId, TokenId>) {
        for seg in &mut self.segments {
            seg.feat_type = remap_id(seg.feat_type, map);
            seg.rep_type = remap_id(seg.rep_type, map);
        }
        remap_params(&mut self.params, map);
    }
}
