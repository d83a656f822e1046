/// Offline Scene Export Tool
///
/// Composes one scene from an intent document and writes the engine import
/// document as pretty JSON.
///
/// Usage:
///   cargo run --bin compose_scene -- --intent scenes/village.json \
///                                    --catalog catalogs/custom.yaml \
///                                    --seed 42

use clap::Parser;
use scene_composer::catalog::AssetCatalog;
use scene_composer::composer::SceneComposer;
use scene_composer::config::ServiceConfig;
use scene_composer::data::AssetCategory;
use scene_composer::export::EngineDocument;
use scene_composer::intent::SceneIntent;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Intent document (.json or .yaml)
    #[arg(short = 'i', long)]
    intent: PathBuf,

    /// External asset catalog; the embedded catalog is used when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// server.toml whose [composer] section supplies the tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for foliage scatter, overrides the document's seed
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Output file path (defaults to exports/scene_<seed>.json)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => ServiceConfig::load(path)?.composer,
        None => ServiceConfig::default().composer,
    };

    let catalog = match &args.catalog {
        Some(path) => {
            println!("Loading catalog from: {}", path.display());
            AssetCatalog::load_from_file(path)?
        }
        None => AssetCatalog::embedded(),
    };

    println!("Reading intent from: {}", args.intent.display());
    let intent = SceneIntent::load_from_string(&fs::read_to_string(&args.intent)?)?;

    let seed = args
        .seed
        .or(intent.seed)
        .unwrap_or_else(rand::random);

    let composer = SceneComposer::new(Arc::new(catalog), settings);
    let composition = composer.compose_with_seed(&intent, seed)?;
    let scene = &composition.scene;
    let report = &composition.report;

    println!("  Buildings: {}", report.buildings_placed);
    println!(
        "  Road pieces: {} ({} adapter(s))",
        report.road_pieces, report.adapters_inserted
    );
    for sub in &report.substitutions {
        println!(
            "    step {}: '{}' unknown, used '{}'",
            sub.step, sub.requested, sub.substitute
        );
    }
    println!("  Foliage: {}", scene.count(AssetCategory::Decor));
    println!("  Total actors: {}", scene.actors.len());

    let document = EngineDocument::from_scene(scene);
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("exports/scene_{}.json", seed)));

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    println!("Writing to: {}", output.display());
    fs::write(&output, document.to_json_pretty()?)?;

    println!("✓ Scene composed successfully (seed {})", seed);
    println!("  Output: {}", output.display());

    Ok(())
}
