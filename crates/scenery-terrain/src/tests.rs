use std::collections::BTreeMap;
use std::fs;

use scenery_core::constants::{is_no_data, NO_DATA};
use scenery_core::tokens::{
    DEM_ELEVATION, DEM_LAND_USE, DEM_NATURAL_TERRAIN, DEM_SLOPE, TERRAIN_NATURAL, TERRAIN_WATER,
};
use scenery_core::{NoProgress, SceneryError, TokenId, TokenTable, NO_VALUE};
use scenery_dem::{Dem, DemHeader};

use crate::{classify_grid, slope_from_degrees, Range, TerrainQuery, TerrainRule, TerrainTable};

const TABLE: &str = "\
TERRAIN_INFO lu_Lowland 1 0 00FF00 NO_VALUE low.png
TERRAIN_INFO lu_Forest 1 0 008000 forest_Mixed forest.png
TERRAIN_INFO lu_Alpine 1 0 FFFFFF NO_VALUE alpine.png
TERRAIN_RULE terrain_Natural NO_VALUE lu_Trees NO_VALUE NO_VALUE NO_VALUE 0 500 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 lu_Forest
TERRAIN_RULE terrain_Natural NO_VALUE NO_VALUE NO_VALUE NO_VALUE NO_VALUE 0 500 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 lu_Lowland
TERRAIN_RULE terrain_Natural NO_VALUE NO_VALUE NO_VALUE NO_VALUE NO_VALUE 500 9000 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 lu_Alpine
";

fn load_table(dir: &std::path::Path) -> (TerrainTable, TokenTable) {
    let path = dir.join("terrain.txt");
    fs::write(&path, TABLE).unwrap();
    let mut tokens = TokenTable::new();
    let table = TerrainTable::load(&path, &mut tokens, true).unwrap();
    (table, tokens)
}

fn id(tokens: &TokenTable, name: &str) -> TokenId {
    tokens.lookup(name).unwrap()
}

#[test]
fn test_elevation_only_rule_matches_any_slope() {
    let dir = tempfile::tempdir().unwrap();
    let (table, tokens) = load_table(dir.path());
    let lowland = id(&tokens, "lu_Lowland");

    for deg in [0.0, 15.0, 45.0, 80.0] {
        let q = TerrainQuery {
            elevation: 250.0,
            slope_at_triangle: slope_from_degrees(deg),
            ..TerrainQuery::default()
        };
        assert_eq!(
            table.find_natural_terrain(&q),
            Some(lowland),
            "250m at {deg} degrees should be lowland"
        );
    }

    let high = TerrainQuery {
        elevation: 600.0,
        ..TerrainQuery::default()
    };
    assert_eq!(table.find_natural_terrain(&high), Some(id(&tokens, "lu_Alpine")));
}

#[test]
fn test_first_match_wins() {
    let dir = tempfile::tempdir().unwrap();
    let (table, tokens) = load_table(dir.path());
    let q = TerrainQuery {
        elevation: 100.0,
        landuse: id(&tokens, "lu_Trees"),
        ..TerrainQuery::default()
    };
    assert_eq!(table.find_natural_terrain(&q), Some(id(&tokens, "lu_Forest")));

    // Boundary sample falls to the earlier rule.
    let edge = TerrainQuery {
        elevation: 500.0,
        ..TerrainQuery::default()
    };
    assert_eq!(table.find_natural_terrain(&edge), Some(id(&tokens, "lu_Lowland")));
}

#[test]
fn test_no_match_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let (table, _) = load_table(dir.path());
    let q = TerrainQuery {
        elevation: -50.0,
        ..TerrainQuery::default()
    };
    assert_eq!(table.find_natural_terrain(&q), None);
}

#[test]
fn test_matching_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let (table, _) = load_table(dir.path());
    for e in (0..2000).step_by(37) {
        let q = TerrainQuery {
            elevation: e as f64,
            ..TerrainQuery::default()
        };
        assert_eq!(table.find_natural_terrain(&q), table.find_natural_terrain(&q));
    }
}

#[test]
fn test_swapping_disjoint_rules_keeps_results() {
    let mut a = TerrainRule::any(100);
    a.elevation = Range::new(0.0, 100.0);
    let mut b = TerrainRule::any(200);
    b.elevation = Range::new(200.0, 300.0);

    let forward = TerrainTable {
        rules: vec![a.clone(), b.clone()],
        ..TerrainTable::default()
    };
    let swapped = TerrainTable {
        rules: vec![b, a],
        ..TerrainTable::default()
    };

    for e in (-50..400).step_by(5) {
        for landuse in [NO_VALUE, 7, 9] {
            let q = TerrainQuery {
                elevation: e as f64,
                landuse,
                ..TerrainQuery::default()
            };
            assert_eq!(
                forward.find_natural_terrain(&q),
                swapped.find_natural_terrain(&q),
                "Results differ at elevation {e}"
            );
        }
    }
}

#[test]
fn test_include_and_strict_load() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("infos.txt"), "TERRAIN_INFO lu_A 1 0 000000 NO_VALUE a.png\n").unwrap();
    let main = dir.path().join("main.txt");
    fs::write(
        &main,
        "INCLUDE infos.txt\nTERRAIN_RULE NO_VALUE NO_VALUE NO_VALUE NO_VALUE NO_VALUE NO_VALUE \
         0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 lu_A\n",
    )
    .unwrap();
    let mut tokens = TokenTable::new();
    let table = TerrainTable::load(&main, &mut tokens, true).unwrap();
    assert_eq!(table.rules.len(), 1);
    assert!(table.info(id(&tokens, "lu_A")).is_some());
}

fn flat_grid(v: f32) -> Dem {
    let header = DemHeader::post(0.0, 0.0, 0.01, 0.01, 4, 4);
    Dem::from_samples(header, vec![v; 16]).unwrap()
}

#[test]
fn test_classify_grid() {
    let dir = tempfile::tempdir().unwrap();
    let (table, tokens) = load_table(dir.path());

    let mut elevation = flat_grid(100.0);
    elevation.set(3, 0, 800.0);
    elevation.set(0, 3, NO_DATA);
    let mut landuse = flat_grid(NO_DATA);
    landuse.set(1, 1, id(&tokens, "lu_Trees") as f32);

    let mut inputs = BTreeMap::new();
    inputs.insert(DEM_ELEVATION, elevation);
    inputs.insert(DEM_LAND_USE, landuse);

    let out = classify_grid(&inputs, &table, &mut NoProgress).unwrap();
    assert_eq!(out.header, inputs[&DEM_ELEVATION].header);
    assert_eq!(out.get(0, 0), id(&tokens, "lu_Lowland") as f32);
    assert_eq!(out.get(1, 1), id(&tokens, "lu_Forest") as f32);
    assert_eq!(out.get(3, 0), id(&tokens, "lu_Alpine") as f32);
    assert!(is_no_data(out.get(0, 3)), "Void elevation should stay void");
}

#[test]
fn test_classify_uses_slope_layer() {
    let mut steep = TerrainRule::any(300);
    steep.slope = Range::new(slope_from_degrees(30.0), slope_from_degrees(90.0));
    let flat = TerrainRule::any(301);
    let table = TerrainTable {
        rules: vec![steep, flat],
        ..TerrainTable::default()
    };

    let mut slope = flat_grid(0.0);
    slope.set(2, 2, slope_from_degrees(45.0) as f32);
    let mut inputs = BTreeMap::new();
    inputs.insert(DEM_ELEVATION, flat_grid(10.0));
    inputs.insert(DEM_SLOPE, slope);

    let out = classify_grid(&inputs, &table, &mut NoProgress).unwrap();
    assert_eq!(out.get(2, 2), 300.0);
    assert_eq!(out.get(0, 0), 301.0);
}

#[test]
fn test_classify_computes_slope_from_elevation() {
    let mut steep = TerrainRule::any(300);
    steep.slope = Range::new(slope_from_degrees(10.0), slope_from_degrees(90.0));
    let table = TerrainTable {
        rules: vec![steep, TerrainRule::any(301)],
        ..TerrainTable::default()
    };

    // Columns are ~371m apart; a 1000m rise per column is far over 10 degrees.
    let header = DemHeader::post(0.0, 0.0, 0.01, 0.01, 4, 4);
    let samples = (0..16).map(|i| ((i % 4) * 1000) as f32).collect();
    let mut inputs = BTreeMap::new();
    inputs.insert(DEM_ELEVATION, Dem::from_samples(header, samples).unwrap());
    let out = classify_grid(&inputs, &table, &mut NoProgress).unwrap();
    assert!(out.samples.iter().all(|&v| v == 300.0));

    inputs.insert(DEM_ELEVATION, flat_grid(0.0));
    let out = classify_grid(&inputs, &table, &mut NoProgress).unwrap();
    assert!(out.samples.iter().all(|&v| v == 301.0));
}

#[test]
fn test_classify_near_water_rule() {
    let mut shore = TerrainRule::any(400);
    shore.near_water = true;
    let table = TerrainTable {
        rules: vec![shore, TerrainRule::any(401)],
        ..TerrainTable::default()
    };

    let mut natural = flat_grid(TERRAIN_NATURAL as f32);
    natural.set(0, 0, TERRAIN_WATER as f32);
    let mut inputs = BTreeMap::new();
    inputs.insert(DEM_ELEVATION, flat_grid(10.0));
    inputs.insert(DEM_NATURAL_TERRAIN, natural);

    let out = classify_grid(&inputs, &table, &mut NoProgress).unwrap();
    assert_eq!(out.get(1, 1), 400.0, "Sample next to water should take the shore rule");
    assert_eq!(out.get(1, 0), 400.0);
    assert_eq!(out.get(3, 3), 401.0, "Sample away from water should fall through");
    assert_eq!(out.get(2, 2), 401.0);
    // A sample's own cell does not count as a neighbour.
    assert_eq!(out.get(0, 0), 401.0);

    inputs.remove(&DEM_NATURAL_TERRAIN);
    let out = classify_grid(&inputs, &table, &mut NoProgress).unwrap();
    assert!(out.samples.iter().all(|&v| v == 401.0));
}

#[test]
fn test_classify_requires_elevation() {
    let table = TerrainTable::default();
    let inputs: BTreeMap<TokenId, Dem> = BTreeMap::new();
    assert!(matches!(
        classify_grid(&inputs, &table, &mut NoProgress),
        Err(SceneryError::Format { .. })
    ));
}

#[test]
fn test_classify_cancel() {
    let table = TerrainTable {
        rules: vec![TerrainRule::any(TERRAIN_NATURAL)],
        ..TerrainTable::default()
    };
    let mut inputs = BTreeMap::new();
    inputs.insert(DEM_ELEVATION, flat_grid(1.0));
    let mut cancel = |_: usize, _: usize, _: &str, _: f64| true;
    assert!(matches!(
        classify_grid(&inputs, &table, &mut cancel),
        Err(SceneryError::Cancelled)
    ));
}
