pub mod clipboard;
pub mod config;
pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod image_store;
pub mod logging;
pub mod monitor;
pub mod types;
pub mod workflow;
mod win_formats;

use anyhow::Context;
use log::{error, info};

use clipboard::SystemClipboard;
use config::Config;
use dispatcher::Dispatcher;
use image_store::ImageStore;
use monitor::Monitor;

pub use error::{Error, Result};

/// Resolves configuration, sets up logging and runs the monitor until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let settings = config.resolve().context("invalid configuration")?;

    logging::init(&settings.log_file, settings.log_level)?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Watching for images -> {}", settings.input_dir.display());
    info!("Workflow template: {}", settings.workflow.display());

    let store = ImageStore::new(settings.input_dir.clone(), Some(settings.engine_input_root.clone()));
    let dispatcher = Dispatcher::new(
        settings.endpoint.clone(),
        settings.workflow.clone(),
        settings.client_id.clone(),
        settings.timeout,
    )?;

    Monitor::new(SystemClipboard::new(), store, dispatcher, settings.interval)
        .run(shutdown_signal())
        .await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the interrupt signal: {}", e);
        std::future::pending::<()>().await;
    }
}
