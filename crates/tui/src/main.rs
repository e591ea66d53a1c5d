mod app;
mod input;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use gamefinder_core::{
    config::{self, AppConfig},
    GameFinder,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir)?;
    tracing::info!(
        config = %config_path.display(),
        api = %config.api_base_url,
        "GameFinder starting"
    );

    let finder = GameFinder::connect(&config).context("failed to build HTTP client")?;
    let mut app = app::GameFinderApp::new(finder, config);
    app.run().await
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("gamefinder.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
