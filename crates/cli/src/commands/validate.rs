use anyhow::Result;
use quire_validator::validate_site;
use std::path::PathBuf;

use super::load_config;

pub async fn run(path: PathBuf) -> Result<()> {
    println!("Validating site at: {}", path.display());

    let config = load_config(&path)?;
    println!("✓ quire.toml valid");
    println!("  Site: {} by {}", config.site.title, config.site.author);

    let report = validate_site(&path, &config)?;

    for line in &report.info {
        println!("  {}", line);
    }
    for warning in &report.warnings {
        println!("⚠ {}", warning);
    }
    for error in &report.errors {
        println!("✗ {}", error);
    }

    if !report.is_ok() {
        anyhow::bail!("Validation failed with {} error(s)", report.errors.len());
    }

    println!("\n✓ Site is ready to build");
    Ok(())
}
