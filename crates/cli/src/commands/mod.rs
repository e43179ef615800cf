pub mod build;
pub mod init;
pub mod serve;
pub mod validate;

use anyhow::{Context, Result};
use quire_core::config::{CONFIG_FILE, SiteConfig, parse_site_toml};
use std::path::Path;

/// Load quire.toml from a site directory
pub fn load_config(path: &Path) -> Result<SiteConfig> {
    if !path.exists() {
        anyhow::bail!("Site directory does not exist: {}", path.display());
    }

    let config_path = path.join(CONFIG_FILE);
    if !config_path.exists() {
        anyhow::bail!(
            "{} not found in {}\nRun 'quire init {}' first",
            CONFIG_FILE,
            path.display(),
            path.display()
        );
    }

    parse_site_toml(&config_path).with_context(|| format!("Failed to parse {}", CONFIG_FILE))
}
