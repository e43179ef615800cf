use anyhow::{Context, Result};
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Initialize logging; `RUST_LOG` overrides the chosen level.
pub fn init_logging(verbose: bool) -> Result<LevelFilter> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    SimpleLogger::new()
        .with_level(level)
        .with_module_level("notify", LevelFilter::Warn)
        .without_timestamps()
        .env()
        .init()
        .context("Failed to initialize logger")?;

    Ok(level)
}
