use anyhow::{Context, Result, anyhow, bail};
use log::{debug, error};
use quire_core::config::SiteConfig;
use quire_core::load_site;
use quire_generator::{GeneratedSite, RenderMode, generate_site};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::load_config;

/// Build static site for deployment
pub async fn run(path: PathBuf, output: Option<PathBuf>, drafts: bool) -> Result<()> {
    println!("🔨 Building static site...");
    println!("   Source: {}", path.display());

    let config = load_config(&path)?;
    let output = output.unwrap_or_else(|| path.join(&config.build.output_dir));
    println!("   Output: {}", output.display());
    println!();

    check_output(&path, &config, &output)?;

    let generated = render_site(&path, &config, drafts || config.build.drafts)?;
    println!("✓ Rendered {} page(s)", generated.pages.len());

    clear_output(&output)?;
    let written = write_pages(&generated, &output)?;
    println!("   ✓ Wrote {} HTML files", written);

    let static_src = path.join(&config.build.static_dir);
    let copied = copy_static(&static_src, &output.join("static"))?;
    println!("   ✓ Copied {} static files", copied);

    println!();
    println!("✅ Build complete!");
    println!("   Output: {}", output.display());
    println!();

    Ok(())
}

/// Load and render the whole site in memory.
///
/// Every failing page is logged; if there is any, nothing is returned so
/// that no output gets written.
pub fn render_site(root: &Path, config: &SiteConfig, drafts: bool) -> Result<GeneratedSite> {
    let content_dir = root.join(&config.build.content_dir);
    let loaded = load_site(&content_dir, &config.site.author, drafts)
        .with_context(|| format!("Failed to load pages from {}", content_dir.display()))?;

    if !loaded.is_ok() {
        for failure in &loaded.errors {
            error!("{}: {}", failure.path.display(), failure.error);
        }
        return Err(anyhow!(
            "{} page(s) failed to load; nothing was written",
            loaded.errors.len()
        ));
    }

    println!(
        "✓ Loaded {} page(s) from {}",
        loaded.site.len(),
        content_dir.display()
    );
    if loaded.drafts_skipped > 0 {
        println!("  Skipped {} draft(s)", loaded.drafts_skipped);
    }

    generate_site(&loaded.site, &config.site, RenderMode::Build).map_err(|errors| {
        for failure in &errors {
            error!("{}", failure);
        }
        anyhow!(
            "{} page(s) failed to render; nothing was written",
            errors.len()
        )
    })
}

/// Absolute, lexically normalized form of `path`
fn resolved(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Refuse an output directory that would swallow the site's own sources.
///
/// The output directory is wiped before writing, so it may not be (or
/// contain) the site root, and it may not share a tree with the content or
/// static directory.
fn check_output(root: &Path, config: &SiteConfig, output: &Path) -> Result<()> {
    let output = resolved(output)?;
    let root = resolved(root)?;

    if root.starts_with(&output) {
        bail!(
            "Output directory {} contains the site directory; refusing to build",
            output.display()
        );
    }

    for dir in [&config.build.content_dir, &config.build.static_dir] {
        let source = resolved(&root.join(dir))?;
        if output.starts_with(&source) || source.starts_with(&output) {
            bail!(
                "Output directory {} overlaps {}; refusing to build",
                output.display(),
                source.display()
            );
        }
    }
    Ok(())
}

/// Remove the previous build so pages deleted since then don't linger
fn clear_output(output: &Path) -> Result<()> {
    if output.exists() {
        debug!("removing previous output at {}", output.display());
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clear {}", output.display()))?;
    }
    Ok(())
}

fn write_pages(generated: &GeneratedSite, output: &Path) -> Result<usize> {
    fs::create_dir_all(output).context("Failed to create output directory")?;

    for (relative, html) in &generated.pages {
        let dst = output.join(relative);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&dst, html).with_context(|| format!("Failed to write {}", dst.display()))?;
        debug!("wrote {}", dst.display());
    }

    Ok(generated.pages.len())
}

/// Copy the static directory tree, returning the number of files copied
fn copy_static(src: &Path, dst: &Path) -> Result<usize> {
    if !src.exists() {
        debug!("no static directory at {}", src.display());
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("Static file outside static directory")?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            copied += 1;
        }
    }

    Ok(copied)
}
