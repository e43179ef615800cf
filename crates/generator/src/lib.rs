// Static site generation with Leptos SSR

pub mod components;

use components::{HeadMeta, ListingEntry, article, document, listing, not_found};
use leptos::prelude::*;
use leptos::tachys::view::RenderHtml;
use log::debug;
use quire_core::config::SiteMeta;
use quire_core::{Page, SiteIndex, is_reserved_slug, slugify};
use std::collections::BTreeMap;
use thiserror::Error;

const DOCTYPE: &str = "<!DOCTYPE html>";

/// Whether output is for the preview server or a deployable build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Build,
    /// Adds a preview badge and the live-reload script
    Preview,
}

impl RenderMode {
    fn is_preview(self) -> bool {
        self == RenderMode::Preview
    }
}

/// A page that failed to render
#[derive(Debug, Error)]
#[error("page '{slug}': {error}")]
pub struct RenderError {
    pub slug: String,
    #[source]
    pub error: quire_core::Error,
}

pub struct GeneratedSite {
    pub pages: Vec<(String, String)>, // (path, html)
}

/// URL of a page: `/` for the home page, `/<slug>/` otherwise
pub fn page_url(slug: &str) -> String {
    if slug == quire_core::INDEX_SLUG {
        "/".to_string()
    } else {
        format!("/{}/", slug)
    }
}

/// Output file of a page, relative to the output directory
pub fn page_output_path(slug: &str) -> String {
    if slug == quire_core::INDEX_SLUG {
        "index.html".to_string()
    } else {
        format!("{}/index.html", slug)
    }
}

pub fn category_url(category: &str) -> String {
    format!("/categories/{}/", slugify(category))
}

pub const ARCHIVE_URL: &str = "/posts/";
const ARCHIVE_OUTPUT_PATH: &str = "posts/index.html";

fn head(title: String, path: &str, author: &str, site: &SiteMeta) -> HeadMeta {
    HeadMeta {
        title,
        lang: site.language.clone(),
        canonical: site.absolute_url(path),
        author: author.to_string(),
        description: site.description.clone(),
        site_title: site.title.clone(),
    }
}

fn to_document(view: impl IntoView + 'static) -> String {
    format!("{}{}", DOCTYPE, view.to_html())
}

/// Render one page to a complete HTML document.
///
/// Fails with `MissingRequiredField` when the title or slug is empty and
/// with `InvalidBlock` when a body block cannot be rendered.
pub fn render_page(page: &Page, site: &SiteMeta, mode: RenderMode) -> quire_core::Result<String> {
    page.validate()?;

    let title = if page.is_index() {
        page.title().to_string()
    } else {
        format!("{} | {}", page.title(), site.title)
    };
    let head = head(title, &page_url(page.slug()), page.author(), site);
    Ok(to_document(document(head, mode.is_preview(), article(page))))
}

fn listing_entries(pages: &[&Page]) -> Vec<ListingEntry> {
    pages
        .iter()
        .map(|page| ListingEntry {
            href: page_url(page.slug()),
            title: page.title().to_string(),
            date: page.date().format("%Y-%m-%d").to_string(),
        })
        .collect()
}

/// Archive of every page except the home page, newest first
pub fn render_archive(index: &SiteIndex, site: &SiteMeta, mode: RenderMode) -> String {
    let entries = listing_entries(&index.newest_first());
    let head = head(
        format!("Posts | {}", site.title),
        ARCHIVE_URL,
        &site.author,
        site,
    );
    to_document(document(
        head,
        mode.is_preview(),
        listing("Posts".to_string(), entries),
    ))
}

/// Listing of the pages filed under one category
pub fn render_category(
    category: &str,
    pages: &[&Page],
    site: &SiteMeta,
    mode: RenderMode,
) -> String {
    let head = head(
        format!("{} | {}", category, site.title),
        &category_url(category),
        &site.author,
        site,
    );
    to_document(document(
        head,
        mode.is_preview(),
        listing(category.to_string(), listing_entries(pages)),
    ))
}

pub fn render_not_found(path: &str, site: &SiteMeta, mode: RenderMode) -> String {
    let head = head(
        format!("Not found | {}", site.title),
        path,
        &site.author,
        site,
    );
    to_document(document(
        head,
        mode.is_preview(),
        not_found(path.to_string()),
    ))
}

/// A category page: display name plus the pages filed under it
pub struct CategoryGroup<'a> {
    pub name: &'a str,
    pub pages: Vec<&'a Page>,
}

/// Categories keyed by URL slug.
///
/// Names that slugify alike ("ML", "ml") share one page, shown under the
/// first name in sort order.
pub fn category_groups(index: &SiteIndex) -> BTreeMap<String, CategoryGroup<'_>> {
    let mut groups: BTreeMap<String, CategoryGroup<'_>> = BTreeMap::new();
    for name in index.categories() {
        let group = groups
            .entry(slugify(name))
            .or_insert_with(|| CategoryGroup {
                name,
                pages: Vec::new(),
            });
        for page in index.pages_in_category(name) {
            if !group.pages.iter().any(|p| p.slug() == page.slug()) {
                group.pages.push(page);
            }
        }
    }
    for group in groups.values_mut() {
        group
            .pages
            .sort_by(|a, b| b.date().cmp(&a.date()).then_with(|| a.slug().cmp(b.slug())));
    }
    groups
}

/// Render every page, the archive and the category pages in memory.
///
/// Nothing is returned unless every page renders; all failures are
/// reported together.
pub fn generate_site(
    index: &SiteIndex,
    site: &SiteMeta,
    mode: RenderMode,
) -> Result<GeneratedSite, Vec<RenderError>> {
    let mut pages = Vec::with_capacity(index.len() + 1);
    let mut errors = Vec::new();

    for page in index.pages() {
        if is_reserved_slug(page.slug()) {
            errors.push(RenderError {
                slug: page.slug().to_string(),
                error: quire_core::Error::ReservedSlug(page.slug().to_string()),
            });
            continue;
        }
        match render_page(page, site, mode) {
            Ok(html) => {
                debug!("rendered {}", page.slug());
                pages.push((page_output_path(page.slug()), html));
            }
            Err(error) => errors.push(RenderError {
                slug: page.slug().to_string(),
                error,
            }),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    pages.push((
        ARCHIVE_OUTPUT_PATH.to_string(),
        render_archive(index, site, mode),
    ));

    for (slug, group) in category_groups(index) {
        pages.push((
            format!("categories/{}/index.html", slug),
            render_category(group.name, &group.pages, site, mode),
        ));
    }

    Ok(GeneratedSite { pages })
}
