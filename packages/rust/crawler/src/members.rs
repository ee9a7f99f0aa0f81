//! Member extraction from a band's members category page.
//!
//! A members category is either one flat list of links, or split into lettered
//! groups (`<h3>A</h3><ul>...</ul>`). Each listed member page is then fetched
//! for its heading and its bold lead name.

use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use bandgraph_shared::{BandMember, FilterConfig, MissingElement, Result};

use crate::fetcher::PageFetcher;

static GROUP_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#mw-pages .mw-category-group").expect("valid selector"));
static GROUP_HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid selector"));
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));
static FLAT_ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#mw-pages .mw-content-ltr a").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#firstHeading").expect("valid selector"));
static BOLD_NAME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".mw-parser-output p b").expect("valid selector"));

// ---------------------------------------------------------------------------
// Listing page
// ---------------------------------------------------------------------------

/// A member link kept after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLink {
    pub text: String,
    pub href: String,
}

/// How the listing page was laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLayout {
    /// Lettered groups; headings of groups the policy rejected are kept.
    Grouped { skipped_groups: Vec<String> },
    /// A single list.
    Flat,
}

/// Parsed members category page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberListing {
    pub layout: ListingLayout,
    pub links: Vec<MemberLink>,
}

/// Parse a members category page into filtered member links, in page order.
pub fn parse_member_listing(html: &str, filters: &FilterConfig) -> MemberListing {
    let doc = Html::parse_document(html);
    let groups: Vec<ElementRef<'_>> = doc.select(&GROUP_SEL).collect();

    let (layout, anchors): (ListingLayout, Vec<ElementRef<'_>>) = if groups.is_empty() {
        (ListingLayout::Flat, doc.select(&FLAT_ANCHOR_SEL).collect())
    } else {
        let mut skipped_groups = Vec::new();
        let mut anchors = Vec::new();
        for group in groups {
            let heading = group
                .select(&GROUP_HEADING_SEL)
                .next()
                .map(|h| h.text().collect::<String>())
                .unwrap_or_default();

            if filters.group_headings.accepts(&heading) {
                anchors.extend(group.select(&ANCHOR_SEL));
            } else {
                skipped_groups.push(heading.trim().to_string());
            }
        }
        (ListingLayout::Grouped { skipped_groups }, anchors)
    };

    let links = anchors
        .into_iter()
        .filter_map(|anchor| {
            let text = anchor.text().collect::<String>();
            if filters.excludes(&text) {
                return None;
            }
            match anchor.value().attr("href") {
                Some(href) => Some(MemberLink {
                    text,
                    href: href.to_string(),
                }),
                None => {
                    debug!(%text, "member anchor without href");
                    None
                }
            }
        })
        .collect();

    MemberListing { layout, links }
}

// ---------------------------------------------------------------------------
// Member page
// ---------------------------------------------------------------------------

/// Fields read from a member's own page; `Err` names what was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPage {
    pub title: std::result::Result<String, MissingElement>,
    pub bold_name: std::result::Result<String, MissingElement>,
}

impl MemberPage {
    /// Resolve fallbacks into a [`BandMember`], logging each one.
    ///
    /// A missing title falls back to `url`; a missing bold name falls back to
    /// the title.
    pub fn into_member(self, url: &str) -> BandMember {
        let page_name = self.title.unwrap_or_else(|missing| {
            warn!(%url, %missing, "no title found, using url");
            url.to_string()
        });
        let name = self.bold_name.unwrap_or_else(|missing| {
            warn!(%url, %missing, "no name found, using page title");
            page_name.clone()
        });

        BandMember {
            page_name,
            name,
            url: url.to_string(),
        }
    }
}

/// Parse a member page for its heading and bold lead name.
pub fn parse_member_page(html: &str) -> MemberPage {
    let doc = Html::parse_document(html);

    let first_text = |sel: &Selector, missing: MissingElement| {
        doc.select(sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .ok_or(missing)
    };

    MemberPage {
        title: first_text(&TITLE_SEL, MissingElement::Title),
        bold_name: first_text(&BOLD_NAME_SEL, MissingElement::BoldName),
    }
}

// ---------------------------------------------------------------------------
// MemberExtractor
// ---------------------------------------------------------------------------

/// Resolves the members of a band from its members category page.
#[derive(Debug, Clone)]
pub struct MemberExtractor {
    fetcher: Arc<PageFetcher>,
    filters: Arc<FilterConfig>,
}

impl MemberExtractor {
    pub fn new(fetcher: Arc<PageFetcher>, filters: FilterConfig) -> Self {
        Self {
            fetcher,
            filters: Arc::new(filters),
        }
    }

    /// Fetch the listing at `url`, then each member page in turn.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Result<Vec<BandMember>> {
        let listing = parse_member_listing(&self.fetcher.fetch(url).await?, &self.filters);

        if let ListingLayout::Grouped { skipped_groups } = &listing.layout {
            if !skipped_groups.is_empty() {
                debug!(?skipped_groups, "skipped member groups");
            }
        }

        let mut members = Vec::with_capacity(listing.links.len());
        for link in &listing.links {
            let body = self.fetcher.fetch(&link.href).await?;
            members.push(parse_member_page(&body).into_member(&link.href));
        }

        Ok(members)
    }
}
