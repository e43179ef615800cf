use crate::error::{Error, Result};
use crate::types::Page;
use std::collections::{BTreeSet, HashMap};

/// Ordered collection of pages addressable by slug
#[derive(Debug, Default, Clone)]
pub struct SiteIndex {
    pages: Vec<Page>,
    by_slug: HashMap<String, usize>,
}

impl SiteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page, rejecting a slug that is already taken.
    pub fn add_page(&mut self, page: Page) -> Result<()> {
        if self.by_slug.contains_key(page.slug()) {
            return Err(Error::DuplicateSlug(page.slug().to_string()));
        }
        self.by_slug.insert(page.slug().to_string(), self.pages.len());
        self.pages.push(page);
        Ok(())
    }

    pub fn lookup(&self, slug: &str) -> Result<&Page> {
        self.by_slug
            .get(slug)
            .map(|&i| &self.pages[i])
            .ok_or_else(|| Error::NotFound(slug.to_string()))
    }

    /// Pages in insertion order
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Every category used by at least one page, sorted
    pub fn categories(&self) -> BTreeSet<&str> {
        self.pages
            .iter()
            .flat_map(|p| p.categories().iter().map(String::as_str))
            .collect()
    }

    /// Pages tagged with `category`, newest first
    pub fn pages_in_category(&self, category: &str) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self
            .pages
            .iter()
            .filter(|p| p.categories().contains(category))
            .collect();
        sort_newest_first(&mut pages);
        pages
    }

    /// All pages except the home page, newest first
    pub fn newest_first(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.iter().filter(|p| !p.is_index()).collect();
        sort_newest_first(&mut pages);
        pages
    }
}

/// Date descending, slug ascending on ties so listings stay deterministic
fn sort_newest_first(pages: &mut [&Page]) {
    pages.sort_by(|a, b| b.date().cmp(&a.date()).then_with(|| a.slug().cmp(b.slug())));
}
