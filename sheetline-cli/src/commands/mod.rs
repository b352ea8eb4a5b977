//! CLI command implementations

pub mod detect;
pub mod import;
pub mod logs;
pub mod status;
pub mod stores;

use std::future::Future;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use sheetline_core::services::{EntryPoint, LogEvent, LoggingService};
use sheetline_core::SheetlineContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the sheetline directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SHEETLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".sheetline"))
        .ok_or_else(|| anyhow!("Could not find home directory; set SHEETLINE_DIR"))
}

/// Get or create sheetline context
pub fn get_context() -> Result<SheetlineContext> {
    let data_dir = get_data_dir()?;
    SheetlineContext::new(&data_dir).context("Failed to initialize sheetline context")
}

/// Drive an async core call to completion
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
