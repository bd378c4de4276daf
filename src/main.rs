mod app;
mod blueprint;
mod config;
mod util;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{BlueprintApp, LaunchOptions};
use crate::config::SimulationConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Blueprint JSON file to open at startup.
    #[arg(long)]
    blueprint: Option<PathBuf>,

    /// Only show components whose technology matches exactly.
    #[arg(long)]
    filter: Option<String>,

    /// JSON file with physics overrides.
    #[arg(long)]
    physics: Option<PathBuf>,

    /// Seed for placing new components.
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter directive, e.g. `debug` or `blueprint_graph=trace`.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|error| {
            eprintln!("invalid --log-level {directive:?}: {error}");
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let physics = match &args.physics {
        Some(path) => SimulationConfig::load(path).unwrap_or_else(|error| {
            warn!("{error:#}; falling back to default physics");
            SimulationConfig::default()
        }),
        None => SimulationConfig::default(),
    };

    let launch = LaunchOptions {
        blueprint: args.blueprint,
        filter: args.filter,
        physics,
        seed: args.seed,
    };
    info!(?launch, "starting blueprint viewer");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "blueprint-graph",
        options,
        Box::new(move |cc| Ok(Box::new(BlueprintApp::new(cc, launch)))),
    )
    .map_err(|error| anyhow!("failed to start the viewer: {error}"))
}
