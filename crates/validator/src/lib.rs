// Site checks beyond what a build enforces: broken local images, untagged pages

use anyhow::{Context, Result};
use quire_core::config::SiteConfig;
use quire_core::{ContentBlock, Page, load_site};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// URI prefix under which the static directory is published
pub const STATIC_PREFIX: &str = "/static/";

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    /// True when nothing would stop a build
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate the site rooted at `root`.
///
/// Returns `Err` only when the site cannot be inspected at all; problems
/// with individual pages land in the report.
pub fn validate_site(root: &Path, config: &SiteConfig) -> Result<ValidationReport> {
    let content_dir = root.join(&config.build.content_dir);
    let static_dir = root.join(&config.build.static_dir);
    let mut report = ValidationReport::default();

    let loaded = load_site(&content_dir, &config.site.author, config.build.drafts)
        .with_context(|| format!("Failed to read {}", content_dir.display()))?;

    for failure in &loaded.errors {
        let relative = failure
            .path
            .strip_prefix(root)
            .unwrap_or(&failure.path)
            .display();
        report.errors.push(format!("{}: {}", relative, failure.error));
    }

    for page in loaded.site.pages() {
        check_images(page, &static_dir, &mut report);
        if page.categories().is_empty() && !page.is_index() {
            report
                .warnings
                .push(format!("{}: page has no categories", page.slug()));
        }
    }

    report
        .info
        .push(format!("{} page(s) loaded", loaded.site.len()));
    if loaded.drafts_skipped > 0 {
        report
            .info
            .push(format!("{} draft(s) skipped", loaded.drafts_skipped));
    }
    let categories = loaded.site.categories();
    if !categories.is_empty() {
        let names: Vec<&str> = categories.into_iter().collect();
        report.info.push(format!("Categories: {}", names.join(", ")));
    }
    report
        .info
        .push(format!("{} static asset(s)", count_files(&static_dir)));

    Ok(report)
}

/// Local image URIs referenced by a page, hero image first
fn local_images(page: &Page) -> Vec<&str> {
    let body_images = page.body().iter().filter_map(|block| match block {
        ContentBlock::Image { uri, .. } => Some(uri.as_str()),
        _ => None,
    });
    page.hero_image()
        .into_iter()
        .chain(body_images)
        .filter(|uri| uri.starts_with(STATIC_PREFIX))
        .collect()
}

/// Map a `/static/...` URI onto the static directory
fn static_path(static_dir: &Path, uri: &str) -> Option<PathBuf> {
    let relative = uri.strip_prefix(STATIC_PREFIX)?;
    let relative = relative.split(['?', '#']).next().unwrap_or(relative);
    let path = Path::new(relative);
    if path
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return None;
    }
    Some(static_dir.join(path))
}

fn check_images(page: &Page, static_dir: &Path, report: &mut ValidationReport) {
    for uri in local_images(page) {
        let Some(path) = static_path(static_dir, uri) else {
            report
                .warnings
                .push(format!("{}: image '{}' escapes the static directory", page.slug(), uri));
            continue;
        };

        if !path.is_file() {
            report
                .warnings
                .push(format!("{}: image '{}' not found", page.slug(), uri));
            continue;
        }

        // Vector images are served as-is
        if path.extension().and_then(|e| e.to_str()) == Some("svg") {
            continue;
        }

        if let Err(e) = image::image_dimensions(&path) {
            report.warnings.push(format!(
                "{}: image '{}' could not be read: {}",
                page.slug(),
                uri,
                e
            ));
        }
    }
}

fn count_files(dir: &Path) -> usize {
    if !dir.is_dir() {
        return 0;
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count()
}
