use clap::Parser;
use scene_composer::{
    catalog::AssetCatalog,
    composer::SceneComposer,
    config::ServiceConfig,
    service::{run_server, AppState},
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to server.toml configuration file
    #[arg(short, long, default_value = "./server.toml")]
    config: String,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the HTTP bind address from the config file
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = ServiceConfig::load_or_default(&args.config);

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(config.logging.level.as_str());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting scene composer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);
    info!(
        "Caps: {} actors, {} buildings, {} floors per building",
        config.composer.max_actors,
        config.composer.max_buildings,
        config.composer.max_floors_per_building
    );

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    // Catalog must load before the service reports ready
    let catalog = match &config.catalog.path {
        Some(path) => AssetCatalog::load_from_file(path)?,
        None => {
            info!("Using embedded asset catalog");
            AssetCatalog::embedded()
        }
    };

    let composer = Arc::new(SceneComposer::new(Arc::new(catalog), config.composer.clone()));
    let state = AppState::new(
        composer,
        config.server.max_retained_jobs,
        config.server.max_body_bytes,
    );
    let health = state.health.clone();

    let server = tokio::spawn(async move {
        if let Err(e) = run_server(&bind, state).await {
            error!("Server error: {}", e);
        }
    });

    health.set_ready(true).await;
    info!("Service marked as ready");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received. Cleaning up...");
        }
        _ = server => {
            error!("Server task exited");
        }
    }

    health.set_healthy(false).await;
    info!("Scene composer stopped");

    Ok(())
}
