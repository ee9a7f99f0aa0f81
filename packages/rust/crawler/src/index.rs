//! Paginated category index traversal.
//!
//! An index page lists band categories and, except for the last page, links
//! to the following page with a "(next page)" anchor. The walker follows those
//! links in a loop, building every band of a page through the worker pool.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

use bandgraph_shared::{FilterConfig, PageResult, Result};

use crate::band::{BandBuilder, BandEntry};
use crate::fetcher::PageFetcher;
use crate::members::MemberExtractor;
use crate::pool::WorkerPool;

/// Text carried by the pagination link.
pub const NEXT_PAGE_TEXT: &str = "next page";

static ITEM_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".mw-category-group .CategoryTreeItem > a").expect("valid selector")
});
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

// ---------------------------------------------------------------------------
// Index page parsing
// ---------------------------------------------------------------------------

/// Parsed category index page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexPage {
    pub entries: Vec<BandEntry>,
    pub next_url: Option<String>,
}

/// Extract band entries and the next-page link from an index page.
pub fn parse_index_page(html: &str) -> IndexPage {
    let doc = Html::parse_document(html);

    let entries = doc
        .select(&ITEM_SEL)
        .filter_map(BandEntry::from_anchor)
        .collect();

    let next_url = doc
        .select(&LINK_SEL)
        .find(|a| a.text().collect::<String>().contains(NEXT_PAGE_TEXT))
        .and_then(|a| a.value().attr("href"))
        .map(String::from);

    IndexPage { entries, next_url }
}

// ---------------------------------------------------------------------------
// IndexWalker
// ---------------------------------------------------------------------------

/// Walks a paginated category index, producing one [`PageResult`] per page.
#[derive(Debug, Clone)]
pub struct IndexWalker {
    fetcher: Arc<PageFetcher>,
    builder: BandBuilder,
    max_pages: Option<usize>,
}

impl IndexWalker {
    pub fn new(fetcher: Arc<PageFetcher>, filters: FilterConfig) -> Self {
        let builder = BandBuilder::new(MemberExtractor::new(fetcher.clone(), filters));
        Self {
            fetcher,
            builder,
            max_pages: None,
        }
    }

    /// Stop after `max_pages` index pages (unbounded when `None`).
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Begin a stepwise walk at `start_path`.
    pub fn start<'w>(&'w self, start_path: &str, pool: &'w WorkerPool) -> IndexWalk<'w> {
        IndexWalk {
            walker: self,
            pool,
            next: Some(start_path.to_string()),
            visited: HashSet::new(),
            pages: 0,
        }
    }

    /// Walk every index page from `start_path`, in pagination order.
    #[instrument(skip(self, pool))]
    pub async fn walk(&self, start_path: &str, pool: &WorkerPool) -> Result<Vec<PageResult>> {
        let mut walk = self.start(start_path, pool);
        let mut results = Vec::new();
        while let Some(page) = walk.next_page().await? {
            results.push(page);
        }
        Ok(results)
    }
}

/// An in-progress walk; call [`IndexWalk::next_page`] until it returns `None`.
#[derive(Debug)]
pub struct IndexWalk<'w> {
    walker: &'w IndexWalker,
    pool: &'w WorkerPool,
    next: Option<String>,
    visited: HashSet<String>,
    pages: usize,
}

impl IndexWalk<'_> {
    /// Number of index pages walked so far.
    pub fn pages_walked(&self) -> usize {
        self.pages
    }

    /// Walk the next index page. `Ok(None)` once pagination ends.
    pub async fn next_page(&mut self) -> Result<Option<PageResult>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        if self.walker.max_pages.is_some_and(|max| self.pages >= max) {
            info!(pages = self.pages, "index page limit reached");
            return Ok(None);
        }
        if !self.visited.insert(url.clone()) {
            warn!(%url, "next page link already visited, stopping");
            return Ok(None);
        }

        let page = parse_index_page(&self.walker.fetcher.fetch(&url).await?);
        info!(
            %url,
            page = self.pages + 1,
            bands = page.entries.len(),
            next = page.next_url.is_some(),
            "walking index page"
        );

        let builder = self.walker.builder.clone();
        let bands = self
            .pool
            .map_ordered(page.entries, move |entry| {
                let builder = builder.clone();
                async move { builder.build(entry).await }
            })
            .await?;

        self.pages += 1;
        self.next = page.next_url.clone();

        Ok(Some(PageResult {
            bands,
            next_url: page.next_url,
        }))
    }
}
