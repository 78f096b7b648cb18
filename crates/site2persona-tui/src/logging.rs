use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "site2persona_core=info,site2persona_tui=info,reqwest=warn,hyper=warn";

/// Route tracing output to a log file; stderr is owned by the terminal UI.
///
/// Returns the log file path, or `None` when no data directory is available.
/// `RUST_LOG` overrides the default filter.
pub fn init() -> Result<Option<PathBuf>> {
    let Some(data_dir) = dirs::data_dir() else {
        return Ok(None);
    };

    let log_dir = data_dir.join("site2persona").join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("site2persona.log");

    let file = OpenOptions::new().append(true).create(true).open(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    tracing::info!(path = ?log_path, "Logging initialized");
    Ok(Some(log_path))
}
