use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Metadata header of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub categories: BTreeSet<String>,
    /// URI of the hero image shown above the body
    pub hero_image: Option<String>,
}

/// One unit of a page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Paragraph {
        text: String,
    },
    Image {
        uri: String,
        alt: String,
    },
    Link {
        uri: String,
        label: String,
    },
    CodeExample {
        source: String,
        language: Option<String>,
    },
    Heading {
        level: u8,
        text: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
}

impl ContentBlock {
    /// Short name used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Paragraph { .. } => "paragraph",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Link { .. } => "link",
            ContentBlock::CodeExample { .. } => "code example",
            ContentBlock::Heading { .. } => "heading",
            ContentBlock::List { .. } => "list",
        }
    }

    /// Check that the block carries everything needed to render it.
    pub fn validate(&self) -> Result<()> {
        match self {
            ContentBlock::Image { uri, .. } if uri.trim().is_empty() => {
                Err(Error::InvalidBlock("image without a source URI".to_string()))
            }
            ContentBlock::Link { uri, .. } if uri.trim().is_empty() => {
                Err(Error::InvalidBlock("link without a target URI".to_string()))
            }
            ContentBlock::Link { label, .. } if label.trim().is_empty() => {
                Err(Error::InvalidBlock("link without a label".to_string()))
            }
            ContentBlock::Heading { level, .. } if !(1..=6).contains(level) => Err(
                Error::InvalidBlock(format!("heading level {} is outside 1..=6", level)),
            ),
            ContentBlock::List { items, .. } if items.is_empty() => {
                Err(Error::InvalidBlock("list without items".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// An authored page. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    meta: PageMeta,
    body: Vec<ContentBlock>,
}

impl Page {
    pub fn new(meta: PageMeta, body: Vec<ContentBlock>) -> Self {
        Self { meta, body }
    }

    pub fn meta(&self) -> &PageMeta {
        &self.meta
    }

    pub fn slug(&self) -> &str {
        &self.meta.slug
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    pub fn author(&self) -> &str {
        &self.meta.author
    }

    pub fn date(&self) -> NaiveDate {
        self.meta.date
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.meta.categories
    }

    pub fn hero_image(&self) -> Option<&str> {
        self.meta.hero_image.as_deref()
    }

    /// Body blocks in render order
    pub fn body(&self) -> &[ContentBlock] {
        &self.body
    }

    /// Whether this page is the site's home page
    pub fn is_index(&self) -> bool {
        self.meta.slug == INDEX_SLUG
    }

    /// Check required fields and every body block.
    pub fn validate(&self) -> Result<()> {
        if self.meta.slug.trim().is_empty() {
            return Err(Error::MissingRequiredField("slug"));
        }
        if self.meta.title.trim().is_empty() {
            return Err(Error::MissingRequiredField("title"));
        }
        for block in &self.body {
            block.validate()?;
        }
        Ok(())
    }
}

/// Slug of the page rendered at the site root
pub const INDEX_SLUG: &str = "index";

/// Top-level paths owned by the archive, category pages, static assets and
/// the preview server
pub const RESERVED_SLUGS: &[&str] = &["posts", "categories", "static", "_reload"];

pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// Turn arbitrary text into a URL-safe slug.
///
/// Keeps ASCII alphanumerics (lowercased), maps whitespace, `-` and `_` to a
/// single hyphen and drops everything else.
///
/// ```text
/// slugify("Encrypted Inference, Part 1") → "encrypted-inference-part-1"
/// slugify("  About  me ")                → "about-me"
/// ```
pub fn slugify(s: &str) -> String {
    let mapped: String = s
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect();

    mapped
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(slug: &str, title: &str) -> PageMeta {
        PageMeta {
            slug: slug.to_string(),
            title: title.to_string(),
            author: "Jane Doe".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            categories: BTreeSet::new(),
            hero_image: None,
        }
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Encrypted Inference, Part 1"), "encrypted-inference-part-1");
        assert_eq!(slugify("snake_case_name"), "snake-case-name");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  About   me  "), "about-me");
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("--leading-and-trailing--"), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("café menu"), "caf-menu");
        assert_eq!(slugify("トラック"), "");
    }

    #[test]
    fn test_page_validate_requires_title_and_slug() {
        let page = Page::new(meta("about", "  "), vec![]);
        assert!(matches!(
            page.validate(),
            Err(Error::MissingRequiredField("title"))
        ));

        let page = Page::new(meta("", "About"), vec![]);
        assert!(matches!(
            page.validate(),
            Err(Error::MissingRequiredField("slug"))
        ));

        let page = Page::new(meta("about", "About"), vec![]);
        assert!(page.validate().is_ok());
    }

    #[test]
    fn test_block_validate() {
        let image = ContentBlock::Image {
            uri: "".to_string(),
            alt: "nothing".to_string(),
        };
        assert!(matches!(image.validate(), Err(Error::InvalidBlock(_))));

        let link = ContentBlock::Link {
            uri: " ".to_string(),
            label: "home".to_string(),
        };
        assert!(matches!(link.validate(), Err(Error::InvalidBlock(_))));

        let unlabelled = ContentBlock::Link {
            uri: "https://example.org".to_string(),
            label: String::new(),
        };
        assert!(matches!(unlabelled.validate(), Err(Error::InvalidBlock(_))));

        let heading = ContentBlock::Heading {
            level: 7,
            text: "Too deep".to_string(),
        };
        assert!(matches!(heading.validate(), Err(Error::InvalidBlock(_))));

        let list = ContentBlock::List {
            ordered: false,
            items: vec![],
        };
        assert!(matches!(list.validate(), Err(Error::InvalidBlock(_))));

        let code = ContentBlock::CodeExample {
            source: "print(1)".to_string(),
            language: Some("python".to_string()),
        };
        assert!(code.validate().is_ok());
    }

    #[test]
    fn test_page_validate_reports_bad_block() {
        let page = Page::new(
            meta("post", "Post"),
            vec![
                ContentBlock::Paragraph {
                    text: "fine".to_string(),
                },
                ContentBlock::Image {
                    uri: String::new(),
                    alt: String::new(),
                },
            ],
        );
        assert!(matches!(page.validate(), Err(Error::InvalidBlock(_))));
    }

    #[test]
    fn test_reserved_slugs() {
        assert!(is_reserved_slug("posts"));
        assert!(is_reserved_slug("static"));
        assert!(!is_reserved_slug("post"));
        assert!(!is_reserved_slug(INDEX_SLUG));
    }

    #[test]
    fn test_is_index() {
        assert!(Page::new(meta("index", "Home"), vec![]).is_index());
        assert!(!Page::new(meta("about", "About"), vec![]).is_index());
    }
}
