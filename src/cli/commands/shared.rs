//! Shared components for CLI commands
//!
//! Logging setup, configuration and store loading used by every command.

use crate::cli::args::CommonArgs;
use crate::config::MudataConfig;
use crate::store::MemoryStore;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info};

/// Set up structured logging
pub fn setup_logging(args: &CommonArgs) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mudata={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

/// Load configuration (file, then CLI overrides) and validate it
pub fn load_configuration(args: &CommonArgs) -> Result<MudataConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Using config file: {}", path.display());
            MudataConfig::load(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?
        }
        None => MudataConfig::default(),
    };

    if let Some(store) = &args.store {
        config.store_path = store.clone();
    }
    if !args.show_progress() {
        config.import.show_progress = false;
    }

    config.validate()?;
    Ok(config)
}

pub fn load_store(config: &MudataConfig) -> Result<MemoryStore> {
    let store = MemoryStore::load(&config.store_path).with_context(|| {
        format!("Failed to load store {}", config.store_path.display())
    })?;
    debug!(
        "Loaded store {} ({} data)",
        config.store_path.display(),
        store.counts().data
    );
    Ok(store)
}

pub fn save_store(config: &MudataConfig, store: &MemoryStore) -> Result<()> {
    store.save(&config.store_path).with_context(|| {
        format!("Failed to save store {}", config.store_path.display())
    })?;
    info!("Store saved to {}", config.store_path.display());
    Ok(())
}

/// Spinner advancing once per imported data row
pub fn create_import_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} data rows {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
