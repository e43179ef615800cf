//! Loading authored pages from the content directory.
//!
//! A page file is TOML front matter fenced by `+++` lines, followed by a
//! Markdown body:
//!
//! ```text
//! +++
//! title = "About"
//! date = 2024-03-01
//! categories = ["meta"]
//! +++
//!
//! Hello there.
//! ```

use crate::error::{Error, Result};
use crate::markdown::parse_body;
use crate::site::SiteIndex;
use crate::types::{Page, PageMeta, is_reserved_slug, slugify};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const FRONT_MATTER_FENCE: &str = "+++";
const PAGE_EXTENSION: &str = "md";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFrontMatter {
    title: Option<String>,
    slug: Option<String>,
    author: Option<String>,
    date: Option<toml::Value>, // TOML date or "YYYY-MM-DD" string
    #[serde(default)]
    categories: Vec<String>,
    image: Option<String>,
    #[serde(default)]
    draft: bool,
}

/// A page parsed from a source file
#[derive(Debug, Clone)]
pub struct SourcePage {
    pub page: Page,
    pub draft: bool,
}

/// A page file that failed to load
#[derive(Debug)]
pub struct PageError {
    pub path: PathBuf,
    pub error: Error,
}

/// Result of loading a whole content directory
#[derive(Debug, Default)]
pub struct LoadReport {
    pub site: SiteIndex,
    pub errors: Vec<PageError>,
    pub drafts_skipped: usize,
}

impl LoadReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Split a page source into its front matter and body.
fn split_front_matter(src: &str) -> Result<(&str, &str)> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let rest = src
        .trim_start()
        .strip_prefix(FRONT_MATTER_FENCE)
        .and_then(|rest| rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')))
        .ok_or_else(|| {
            Error::FrontMatter(format!(
                "page must start with a '{}' line",
                FRONT_MATTER_FENCE
            ))
        })?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((front, body));
        }
        offset += line.len();
    }

    Err(Error::FrontMatter(format!(
        "front matter is not closed by '{}'",
        FRONT_MATTER_FENCE
    )))
}

fn parse_date(value: &toml::Value) -> Result<NaiveDate> {
    match value {
        toml::Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| Error::FrontMatter(format!("Invalid date '{}': {}", s, e))),
        // A full datetime contributes only its date part
        toml::Value::Datetime(dt) => dt
            .date
            .and_then(|d| NaiveDate::from_ymd_opt(d.year.into(), d.month.into(), d.day.into()))
            .ok_or_else(|| Error::FrontMatter(format!("Invalid date '{}'", dt))),
        other => Err(Error::FrontMatter(format!(
            "date must be a date, found {}",
            other.type_str()
        ))),
    }
}

/// Parse one page source.
///
/// `fallback_slug` is used when the front matter has no `slug`, and
/// `default_author` when it has no `author`.
pub fn parse_page(src: &str, fallback_slug: &str, default_author: &str) -> Result<SourcePage> {
    let (front, body) = split_front_matter(src)?;
    let raw: RawFrontMatter =
        toml::from_str(front).map_err(|e| Error::FrontMatter(e.to_string()))?;

    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(Error::MissingRequiredField("title"))?;

    let slug = slugify(raw.slug.as_deref().unwrap_or(fallback_slug));
    if slug.is_empty() {
        return Err(Error::MissingRequiredField("slug"));
    }
    if is_reserved_slug(&slug) {
        return Err(Error::ReservedSlug(slug));
    }

    let date = parse_date(raw.date.as_ref().ok_or(Error::MissingRequiredField("date"))?)?;

    let author = raw
        .author
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| default_author.to_string());
    if author.trim().is_empty() {
        return Err(Error::MissingRequiredField("author"));
    }

    let categories: BTreeSet<String> = raw
        .categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if let Some(unusable) = categories.iter().find(|c| slugify(c).is_empty()) {
        return Err(Error::FrontMatter(format!(
            "category '{}' has no URL-safe characters",
            unusable
        )));
    }

    let page = Page::new(
        PageMeta {
            slug,
            title: title.trim().to_string(),
            author,
            date,
            categories,
            hero_image: raw.image.filter(|uri| !uri.trim().is_empty()),
        },
        parse_body(body)?,
    );
    page.validate()?;

    Ok(SourcePage {
        page,
        draft: raw.draft,
    })
}

/// Load and parse a single page file.
pub fn load_page(path: &Path, default_author: &str) -> Result<SourcePage> {
    let src = fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    parse_page(&src, stem, default_author)
}

/// Every page file under `content_dir`, sorted by path
pub fn find_page_files(content_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(content_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_file()
            && !hidden
            && path.extension().and_then(|e| e.to_str()) == Some(PAGE_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Load every page under `content_dir` into a site index.
///
/// Failing pages do not stop the load: each one is recorded in
/// [`LoadReport::errors`] so a caller can report them all at once. Drafts
/// are skipped unless `include_drafts` is set.
pub fn load_site(
    content_dir: &Path,
    default_author: &str,
    include_drafts: bool,
) -> Result<LoadReport> {
    if !content_dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("content directory not found: {}", content_dir.display()),
        )));
    }

    let mut report = LoadReport::default();
    for path in find_page_files(content_dir)? {
        let loaded = load_page(&path, default_author).and_then(|source| {
            if source.draft && !include_drafts {
                debug!("skipping draft {}", path.display());
                report.drafts_skipped += 1;
                return Ok(());
            }
            report.site.add_page(source.page)
        });

        if let Err(error) = loaded {
            warn!("{}: {}", path.display(), error);
            report.errors.push(PageError { path, error });
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentBlock;
    use tempfile::TempDir;

    const ABOUT: &str = r#"+++
title = "About"
date = 2024-03-01
categories = ["meta", "meta", " personal "]
+++

I write about private machine learning.
"#;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn post(title: &str, extra: &str) -> String {
        format!(
            "+++\ntitle = \"{}\"\ndate = \"2024-05-01\"\n{}\n+++\n\nBody of {}.\n",
            title, extra, title
        )
    }

    #[test]
    fn test_split_front_matter() {
        let (front, body) = split_front_matter("+++\ntitle = \"x\"\n+++\nbody\n").unwrap();
        assert_eq!(front, "title = \"x\"\n");
        assert_eq!(body, "body\n");
    }

    #[test]
    fn test_split_front_matter_errors() {
        assert!(matches!(
            split_front_matter("no front matter"),
            Err(Error::FrontMatter(_))
        ));
        assert!(matches!(
            split_front_matter("+++\ntitle = \"x\"\n"),
            Err(Error::FrontMatter(_))
        ));
    }

    #[test]
    fn test_parse_page_full() {
        let source = parse_page(ABOUT, "about", "Jane Doe").unwrap();
        let page = source.page;
        assert!(!source.draft);
        assert_eq!(page.slug(), "about");
        assert_eq!(page.title(), "About");
        assert_eq!(page.author(), "Jane Doe");
        assert_eq!(page.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let categories: Vec<&str> = page.categories().iter().map(String::as_str).collect();
        assert_eq!(categories, vec!["meta", "personal"]);
        assert_eq!(
            page.body(),
            &[ContentBlock::Paragraph {
                text: "I write about private machine learning.".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_page_explicit_slug_and_author() {
        let src = post(
            "Encrypted Inference",
            "slug = \"Private Inference\"\nauthor = \"Guest\"\nimage = \"/static/hero.png\"",
        );
        let page = parse_page(&src, "file-stem", "Jane Doe").unwrap().page;
        assert_eq!(page.slug(), "private-inference");
        assert_eq!(page.author(), "Guest");
        assert_eq!(page.hero_image(), Some("/static/hero.png"));
    }

    #[test]
    fn test_parse_page_missing_fields() {
        let no_title = "+++\ndate = 2024-01-01\n+++\nbody";
        assert!(matches!(
            parse_page(no_title, "x", "Jane"),
            Err(Error::MissingRequiredField("title"))
        ));

        let no_date = "+++\ntitle = \"T\"\n+++\nbody";
        assert!(matches!(
            parse_page(no_date, "x", "Jane"),
            Err(Error::MissingRequiredField("date"))
        ));

        let no_slug = "+++\ntitle = \"T\"\ndate = 2024-01-01\n+++\nbody";
        assert!(matches!(
            parse_page(no_slug, "!!!", "Jane"),
            Err(Error::MissingRequiredField("slug"))
        ));

        assert!(matches!(
            parse_page(no_slug, "x", ""),
            Err(Error::MissingRequiredField("author"))
        ));
    }

    #[test]
    fn test_parse_page_rejects_reserved_slug() {
        let src = post("Essay", "slug = \"posts\"");
        assert!(matches!(
            parse_page(&src, "essay", "Jane"),
            Err(Error::ReservedSlug(ref s)) if s == "posts"
        ));

        // The file stem is checked too
        let src = post("Assets", "");
        assert!(matches!(
            parse_page(&src, "static", "Jane"),
            Err(Error::ReservedSlug(_))
        ));
    }

    #[test]
    fn test_parse_page_bad_date() {
        let src = "+++\ntitle = \"T\"\ndate = \"March 1st\"\n+++\n";
        assert!(matches!(
            parse_page(src, "x", "Jane"),
            Err(Error::FrontMatter(_))
        ));

        let src = "+++\ntitle = \"T\"\ndate = \"2024-03-01garbage\"\n+++\n";
        assert!(matches!(
            parse_page(src, "x", "Jane"),
            Err(Error::FrontMatter(_))
        ));

        let src = "+++\ntitle = \"T\"\ndate = 10:30:00\n+++\n";
        assert!(matches!(
            parse_page(src, "x", "Jane"),
            Err(Error::FrontMatter(_))
        ));

        let src = "+++\ntitle = \"T\"\ndate = 20240101\n+++\n";
        assert!(matches!(
            parse_page(src, "x", "Jane"),
            Err(Error::FrontMatter(_))
        ));
    }

    #[test]
    fn test_parse_page_accepts_datetime() {
        let src = "+++\ntitle = \"T\"\ndate = 2024-01-02T10:00:00Z\n+++\n";
        let page = parse_page(src, "x", "Jane").unwrap().page;
        assert_eq!(page.date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_parse_page_rejects_unaddressable_category() {
        let src = "+++\ntitle = \"T\"\ndate = 2024-01-01\ncategories = [\"???\"]\n+++\n";
        assert!(matches!(
            parse_page(src, "x", "Jane"),
            Err(Error::FrontMatter(_))
        ));
    }

    #[test]
    fn test_parse_page_rejects_unknown_field() {
        let src = "+++\ntitle = \"T\"\ndate = 2024-01-01\nlayout = \"post\"\n+++\n";
        assert!(matches!(
            parse_page(src, "x", "Jane"),
            Err(Error::FrontMatter(_))
        ));
    }

    #[test]
    fn test_parse_page_reports_invalid_block() {
        let src = "+++\ntitle = \"T\"\ndate = 2024-01-01\n+++\n\n> a quote\n";
        assert!(matches!(
            parse_page(src, "x", "Jane"),
            Err(Error::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_load_site_collects_pages_in_path_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", &post("Home", ""));
        write(dir.path(), "about.md", ABOUT);
        write(dir.path(), "posts/encrypted-inference.md", &post("Encrypted", ""));
        write(dir.path(), "notes.txt", "ignored");
        write(dir.path(), ".hidden.md", "ignored too");

        let report = load_site(dir.path(), "Jane Doe", false).unwrap();
        assert!(report.is_ok());
        let slugs: Vec<&str> = report.site.pages().iter().map(|p| p.slug()).collect();
        assert_eq!(slugs, vec!["about", "index", "encrypted-inference"]);
    }

    #[test]
    fn test_load_site_reports_every_failure() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", &post("A", "slug = \"home\""));
        write(dir.path(), "b.md", &post("B", "slug = \"home\""));
        write(dir.path(), "c.md", "no front matter");
        write(dir.path(), "d.md", &post("D", ""));

        let report = load_site(dir.path(), "Jane Doe", false).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(report.errors[0].error, Error::DuplicateSlug(ref s) if s == "home"));
        assert!(report.errors[0].path.ends_with("b.md"));
        assert!(matches!(report.errors[1].error, Error::FrontMatter(_)));
        assert_eq!(report.site.len(), 2);
    }

    #[test]
    fn test_load_site_skips_drafts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "wip.md", &post("WIP", "draft = true"));
        write(dir.path(), "done.md", &post("Done", ""));

        let report = load_site(dir.path(), "Jane Doe", false).unwrap();
        assert_eq!(report.site.len(), 1);
        assert_eq!(report.drafts_skipped, 1);

        let report = load_site(dir.path(), "Jane Doe", true).unwrap();
        assert_eq!(report.site.len(), 2);
        assert_eq!(report.drafts_skipped, 0);
    }

    #[test]
    fn test_load_site_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_site(&dir.path().join("missing"), "Jane", false),
            Err(Error::Io(_))
        ));
    }
}
