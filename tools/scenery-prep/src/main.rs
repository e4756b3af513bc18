//! scenery-prep: raster import, table checks and terrain classification.
//!
//! Usage:
//!   scenery-prep import N46E010.hgt --output n46e010.dem --fill-voids
//!   scenery-prep import -34+150.dem --format short-oz --output oz.dem
//!   scenery-prep extract-img landuse.img --west 10 --south 46 --output lu.dem
//!   scenery-prep info n46e010.dem
//!   scenery-prep translate landuse.dem --table lu_translate.txt --output lu.dem
//!   scenery-prep check-rules terrain.txt --strict
//!   scenery-prep classify tile.store --rules terrain.txt --output tile.store

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scenery_core::error::read_file;
use scenery_core::progress::LogProgress;
use scenery_core::tokens::DEM_NATURAL_TERRAIN;
use scenery_core::{PipelineConfig, Result, SceneryError, TokenTable};
use scenery_dem::dem_file::{read_dem, write_dem};
use scenery_dem::raw_img::read_raw_img;
use scenery_dem::{import_dem, import_dem_as, Dem, DemFormat, ValueTranslator};
use scenery_store::atom::TOKN;
use scenery_store::SceneryStore;
use scenery_terrain::{classify_grid, TerrainTable};

#[derive(Parser, Debug)]
#[command(name = "scenery-prep", version, about = "Scenery GIS preprocessing tool")]
struct Args {
    /// Pipeline settings (JSON). Missing fields take defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a raster (HGT, USGS, IDA, GeoTIFF, DTED) into .dem.
    Import {
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Force a format (hgt, float-hgt, short-oz, usgs, ida, geotiff, dted, dem).
        #[arg(long)]
        format: Option<DemFormat>,
        /// Fill isolated no-data samples from their neighbours.
        #[arg(long, default_value_t = false)]
        fill_voids: bool,
    },
    /// Cut a whole-degree box out of a raw world image into .dem.
    ExtractImg {
        input: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        west: i32,
        #[arg(long, allow_hyphen_values = true)]
        south: i32,
        /// Defaults to one degree east of --west.
        #[arg(long, allow_hyphen_values = true)]
        east: Option<i32>,
        /// Defaults to one degree north of --south.
        #[arg(long, allow_hyphen_values = true)]
        north: Option<i32>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Describe a .dem, a store, or any importable raster.
    Info { file: PathBuf },
    /// Rewrite a categorical .dem through a translation table.
    Translate {
        file: PathBuf,
        #[arg(long)]
        table: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Map tokens back to raw codes.
        #[arg(long, default_value_t = false)]
        reverse: bool,
    },
    /// Load a terrain table and report priority conflicts.
    CheckRules {
        table: PathBuf,
        /// Treat priority conflicts as errors.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Classify a store's layers into a natural terrain layer.
    Classify {
        store: PathBuf,
        #[arg(long)]
        rules: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => match PipelineConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {e}");
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };

    let result = match args.command {
        Command::Import {
            input,
            output,
            format,
            fill_voids,
        } => cmd_import(&input, &output, format, fill_voids || config.fill_voids),
        Command::ExtractImg {
            input,
            west,
            south,
            east,
            north,
            output,
        } => cmd_extract_img(
            &input,
            (west, south, east.unwrap_or(west + 1), north.unwrap_or(south + 1)),
            &output,
        ),
        Command::Info { file } => cmd_info(&file),
        Command::Translate {
            file,
            table,
            output,
            reverse,
        } => cmd_translate(&file, &table, &output, reverse),
        Command::CheckRules { table, strict } => {
            cmd_check_rules(&table, strict || config.strict_priority)
        }
        Command::Classify {
            store,
            rules,
            output,
        } => cmd_classify(&store, &rules, &output, &config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn describe_dem(dem: &Dem) {
    let h = &dem.header;
    eprintln!(
        "Grid: {}×{} {}, bounds W{} S{} E{} N{}",
        h.width,
        h.height,
        if h.post { "posts" } else { "cells" },
        h.west,
        h.south,
        h.east,
        h.north
    );
    match dem.min_max() {
        Some((lo, hi)) => eprintln!("Value range: {lo}..{hi}"),
        None => eprintln!("Value range: empty"),
    }
    eprintln!("No-data samples: {}", dem.count_no_data());
}

// --- Import command ---

fn cmd_import(input: &Path, output: &Path, format: Option<DemFormat>, fill_voids: bool) -> Result<()> {
    let mut dem = import_dem_as(input, format)?;
    describe_dem(&dem);
    if fill_voids {
        let filled = dem.fill_voids();
        info!(filled, "Filled voids");
    }
    write_dem(&dem, output)?;
    let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    eprintln!("Done! Output: {} ({} bytes)", output.display(), size);
    Ok(())
}

// --- Raw image extraction ---

fn cmd_extract_img(input: &Path, (west, south, east, north): (i32, i32, i32, i32), output: &Path) -> Result<()> {
    let dem = read_raw_img(input, west, south, east, north)?;
    describe_dem(&dem);
    write_dem(&dem, output)?;
    let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    eprintln!("Done! Output: {} ({} bytes)", output.display(), size);
    Ok(())
}

// --- Info command ---

fn cmd_info(file: &Path) -> Result<()> {
    let data = read_file(file)?;
    if data.starts_with(&TOKN) {
        let mut tokens = TokenTable::new();
        let store = SceneryStore::decode(&data, &file.to_string_lossy(), &mut tokens)?;
        eprintln!("Store: {} layer(s), {} token(s)", store.layers.len(), tokens.len());
        for (&layer, dem) in &store.layers {
            eprintln!("Layer {}:", tokens.display(layer));
            describe_dem(dem);
        }
        let map = &store.map;
        eprintln!(
            "Map: {} vertices, {} edges, {} faces",
            map.num_vertices(),
            map.num_edges(),
            map.num_faces()
        );
        return Ok(());
    }

    let dem = match read_dem(file) {
        Ok(dem) => dem,
        Err(_) => import_dem(file)?,
    };
    describe_dem(&dem);
    Ok(())
}

// --- Translate command ---

fn cmd_translate(file: &Path, table: &Path, output: &Path, reverse: bool) -> Result<()> {
    let mut tokens = TokenTable::new();
    let translator = ValueTranslator::load(table, &mut tokens)?;
    let mut dem = read_dem(file)?;
    let outcome = if reverse {
        translator.translate_reverse(&mut dem)
    } else {
        translator.translate_forward(&mut dem)
    };
    match outcome {
        Ok(()) => {}
        // Partial translations are still written; the holes are no-data.
        Err(SceneryError::SemanticRange { unmapped, total }) => {
            warn!(unmapped, total, "Some samples could not be translated");
        }
        Err(e) => return Err(e),
    }
    write_dem(&dem, output)?;
    eprintln!("Done! Output: {}", output.display());
    Ok(())
}

// --- Rule check command ---

fn cmd_check_rules(path: &Path, strict: bool) -> Result<()> {
    let mut tokens = TokenTable::new();
    let table = TerrainTable::load(path, &mut tokens, strict)?;
    eprintln!(
        "{} terrain(s), {} rule(s)",
        table.infos.len(),
        table.rules.len()
    );
    let conflicts = table.check_priority_consistency();
    for (earlier, later) in &conflicts {
        eprintln!(
            "  priority conflict: {} before {}",
            tokens.display(*earlier),
            tokens.display(*later)
        );
    }
    eprintln!("{} priority conflict(s)", conflicts.len());
    Ok(())
}

// --- Classify command ---

fn cmd_classify(store_path: &Path, rules: &Path, output: &Path, config: &PipelineConfig) -> Result<()> {
    let mut tokens = TokenTable::new();
    let mut store = SceneryStore::read(store_path, &mut tokens)?;
    let mut table = TerrainTable::load(rules, &mut tokens, config.strict_priority)?;
    table.make_direct_rules();

    let terrain = classify_grid(&store.layers, &table, &mut LogProgress)?;
    eprintln!(
        "Classified {} sample(s), {} without a match",
        terrain.samples.len(),
        terrain.count_no_data()
    );
    store.layers.insert(DEM_NATURAL_TERRAIN, terrain);
    store.write(output, &tokens)?;
    eprintln!("Done! Output: {}", output.display());
    Ok(())
}
