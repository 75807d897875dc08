//! Purchase prediction server
//!
//! `serve` (the default) exposes the prediction service over HTTP. The model is
//! loaded from the artifact directory, or trained from the data CSV on the
//! first request that needs it. `train` fits a fresh bundle, overwrites the
//! stored one and prints the evaluation report.

mod app;
mod config;
mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use purchase::{
    ArtifactStore, CsvTableSource, DirectoryStore, ModelTrainer, PredictionService, TableSource,
};

use crate::app::AppState;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "purchase-server")]
#[command(about = "Smartphone purchase prediction service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve predictions over HTTP
    Serve {
        /// Port to listen on, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Train a new model, replacing the stored one
    Train,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Train => tokio::task::spawn_blocking(move || train(&config)).await?,
    }
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    info!("Data: {:?}, artifacts: {:?}", config.data_path, config.artifact_dir);
    let service = PredictionService::new(
        Arc::new(DirectoryStore::new(&config.artifact_dir)),
        Arc::new(CsvTableSource::new(&config.data_path)),
        config.service_config(),
    );
    let app = app::create_router(AppState { service: Arc::new(service) });

    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.port)));
    let listener =
        tokio::net::TcpListener::bind(addr).await.with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn train(config: &Config) -> anyhow::Result<()> {
    let table = CsvTableSource::new(&config.data_path)
        .load_table()
        .with_context(|| format!("failed to load training data from {:?}", config.data_path))?;

    let (bundle, report) = ModelTrainer::new(config.trainer_config()).train(&table)?;
    DirectoryStore::new(&config.artifact_dir)
        .save(&bundle)
        .with_context(|| format!("failed to save artifacts to {:?}", config.artifact_dir))?;

    println!("{}", report);
    info!("Saved run {} to {:?}", bundle.run_id(), config.artifact_dir);
    Ok(())
}
